use callguard_core::CallError;
use thiserror::Error;

/// Rejection returned when the circuit is open and a call is not permitted.
///
/// Not retriable by default: retry policies treat it as a rejection kind.
#[derive(Debug, Clone, Error)]
#[error("circuit breaker '{name}' is open; call not permitted")]
pub struct CircuitOpenError {
    /// Name of the rejecting breaker.
    pub name: String,
}

impl<E> From<CircuitOpenError> for CallError<E> {
    fn from(err: CircuitOpenError) -> Self {
        CallError::CircuitOpen {
            name: Some(err.name),
        }
    }
}
