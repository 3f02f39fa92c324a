//! Error types for the bulkhead pattern.

use callguard_core::CallError;
use thiserror::Error;

/// Rejection returned when the bulkhead is at capacity and no permit became
/// free within the configured wait.
#[derive(Debug, Clone, Copy, Error)]
#[error("bulkhead is full: {max_concurrent_calls} concurrent calls reached")]
pub struct BulkheadFullError {
    /// The concurrency limit that was reached.
    pub max_concurrent_calls: usize,
}

impl<E> From<BulkheadFullError> for CallError<E> {
    fn from(err: BulkheadFullError) -> Self {
        CallError::BulkheadFull {
            max_concurrent: err.max_concurrent_calls,
        }
    }
}
