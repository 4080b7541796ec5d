use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): [{error_code}] {message}")]
    ApiError {
        status: u16,
        error_code: String,
        message: String,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    #[error("Invalid endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("{0}")]
    MissingField(String),

    #[error("operation ended in status {status}: {message}")]
    OperationFailed { status: String, message: String },

    #[error("unexpected state '{state}', wanted target {target:?}")]
    UnexpectedState { state: String, target: Vec<String> },

    #[error("timeout while waiting for state to become {target:?} (last state: '{last_state}', timeout: {timeout:?})")]
    PollTimeout {
        target: Vec<String>,
        last_state: String,
        timeout: Duration,
    },

    #[error("operation cancelled")]
    Cancelled,
}

impl ApiError {
    /// HTTP 404, or a 400 whose message reports the object as missing.
    /// Several control planes answer lookups of deleted objects with 400.
    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::ApiError {
                status: 404, ..
            } => true,
            ApiError::ApiError {
                status: 400,
                message,
                ..
            } => {
                let message = message.to_lowercase();
                message.contains("not exist") || message.contains("not found")
            }
            _ => false,
        }
    }
}
