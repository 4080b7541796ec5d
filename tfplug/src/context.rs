//! Request-scoped deadline and cancellation
//!
//! Every async trait method receives a [`Context`]. Long-running work such as
//! operation polling checks it between iterations.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Context carries the deadline and cancellation signal of one request
/// CRITICAL: Pass this as first parameter to ALL async trait methods
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        Self::with_deadline(None)
    }

    /// A context that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Some(Instant::now() + timeout))
    }

    fn with_deadline(deadline: Option<Instant>) -> Self {
        let (done_tx, done) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner {
                deadline,
                done,
                done_tx,
            }),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left before the deadline, if one is set
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.inner
            .deadline
            .map(|d| Instant::now() >= d)
            .unwrap_or(false)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    /// Returns a channel that flips to true when work done on behalf of
    /// this context should stop
    pub fn done(&self) -> watch::Receiver<bool> {
        self.inner.done.clone()
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn context_timeout_expires() {
        let ctx = Context::with_timeout(Duration::from_millis(50));

        assert!(!ctx.is_expired());
        assert!(ctx.remaining().unwrap() <= Duration::from_millis(50));

        sleep(Duration::from_millis(80)).await;

        assert!(ctx.is_expired());
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test]
    async fn context_manual_cancel_is_visible_to_clones() {
        let ctx = Context::new();
        let observer = ctx.clone();
        let mut done = observer.done();

        assert!(!observer.is_cancelled());

        ctx.cancel();
        done.changed().await.unwrap();

        assert!(observer.is_cancelled());
        assert!(*done.borrow());
    }

    #[test]
    fn context_without_deadline_never_expires() {
        let ctx = Context::new();
        assert!(ctx.deadline().is_none());
        assert!(ctx.remaining().is_none());
        assert!(!ctx.is_expired());
    }
}
