//! Polling of asynchronous vendor operations
//!
//! A refresh function reports the current status of an operation together
//! with the body it was read from. [`StateChangeConf::wait_for_state`]
//! calls it at a fixed interval until the status reaches a target, leaves
//! the pending set, or the deadline passes.

use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};
use tfplug::Context;

use super::client::{Client, DEFAULT_POLL_INTERVAL};
use super::error::ApiError;

/// Status reported for an object that no longer exists; refresh functions
/// of delete waits return it on 404
pub const STATUS_DELETED: &str = "DELETED";

#[derive(Debug, Clone)]
pub struct RefreshResult {
    pub body: Value,
    pub status: String,
}

impl RefreshResult {
    pub fn new(body: Value, status: impl Into<String>) -> Self {
        Self {
            body,
            status: status.into(),
        }
    }

    pub fn deleted() -> Self {
        Self::new(Value::Null, STATUS_DELETED)
    }
}

#[derive(Debug, Clone)]
pub struct StateChangeConf {
    pub pending: Vec<String>,
    pub target: Vec<String>,
    pub timeout: Duration,
    /// Wait before the first refresh
    pub delay: Duration,
    pub poll_interval: Duration,
}

impl StateChangeConf {
    pub fn new(pending: &[&str], target: &[&str], timeout: Duration) -> Self {
        Self {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
            timeout,
            delay: Duration::ZERO,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Polls until the refreshed status is one of `target` and returns the
    /// body of that refresh. Errors returned by `refresh` end the wait
    /// immediately.
    pub async fn wait_for_state<F, Fut>(&self, ctx: &Context, mut refresh: F) -> Result<Value, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<RefreshResult, ApiError>>,
    {
        let own_deadline = Instant::now() + self.timeout;
        let deadline = match ctx.deadline() {
            Some(ctx_deadline) if ctx_deadline < own_deadline => ctx_deadline,
            _ => own_deadline,
        };

        if !self.delay.is_zero() {
            sleep_or_cancel(ctx, self.delay.min(deadline.saturating_duration_since(Instant::now())))
                .await?;
        }

        let mut attempt = 0u32;
        loop {
            if ctx.is_cancelled() {
                return Err(ApiError::Cancelled);
            }

            let result = refresh().await?;
            attempt += 1;
            tracing::debug!(
                "Polled operation state '{}' (attempt {}, target {:?})",
                result.status,
                attempt,
                self.target
            );

            if self.target.iter().any(|t| t == &result.status) {
                return Ok(result.body);
            }
            if !self.pending.iter().any(|p| p == &result.status) {
                return Err(ApiError::UnexpectedState {
                    state: result.status,
                    target: self.target.clone(),
                });
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ApiError::PollTimeout {
                    target: self.target.clone(),
                    last_state: result.status,
                    timeout: self.timeout,
                });
            }

            sleep_or_cancel(ctx, self.poll_interval.min(remaining)).await?;
        }
    }
}

async fn sleep_or_cancel(ctx: &Context, duration: Duration) -> Result<(), ApiError> {
    let mut done = ctx.done();
    if *done.borrow() {
        return Err(ApiError::Cancelled);
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => Ok(()),
        changed = done.changed() => match changed {
            Ok(()) if *done.borrow() => Err(ApiError::Cancelled),
            // sender gone or flipped back: finish the sleep
            _ => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
        },
    }
}

impl Client {
    /// A state change configuration using this client's poll interval
    pub fn state_change(&self, pending: &[&str], target: &[&str], timeout: Duration) -> StateChangeConf {
        StateChangeConf::new(pending, target, timeout).with_poll_interval(self.poll_interval())
    }
}
