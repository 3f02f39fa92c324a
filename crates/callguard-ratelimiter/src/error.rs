use callguard_core::CallError;
use std::time::Duration;
use thiserror::Error;

/// Rejection returned when no permit became available within the limiter's
/// timeout.
#[derive(Debug, Clone, Copy, Error)]
#[error("rate limit exceeded; no permit within {timeout:?}")]
pub struct RateLimitExceededError {
    /// The acquisition timeout that elapsed.
    pub timeout: Duration,
    /// Time until the next permit accrues, when known.
    pub retry_after: Option<Duration>,
}

impl<E> From<RateLimitExceededError> for CallError<E> {
    fn from(err: RateLimitExceededError) -> Self {
        CallError::RateLimited {
            retry_after: err.retry_after,
        }
    }
}
