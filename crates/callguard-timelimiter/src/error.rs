use callguard_core::CallError;
use std::time::Duration;
use thiserror::Error;

/// The deadline elapsed before the work completed.
///
/// The abandoned work may still be running in the background; see the
/// cancellation caveat on [`TimeLimiterConfig`].
///
/// [`TimeLimiterConfig`]: crate::TimeLimiterConfig
#[derive(Debug, Clone, Copy, Error)]
#[error("call timed out after {timeout:?}")]
pub struct TimeoutError {
    /// The configured deadline.
    pub timeout: Duration,
}

impl<E> From<TimeoutError> for CallError<E> {
    fn from(err: TimeoutError) -> Self {
        CallError::Timeout {
            timeout: err.timeout,
        }
    }
}
