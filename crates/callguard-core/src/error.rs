//! The unified error type for decorated calls.
//!
//! Every policy layer either passes an inner failure through unchanged or
//! substitutes a rejection of its own kind. [`CallError<E>`] is the single
//! type all of those share, so composing layers requires no error
//! conversion code: rejection kinds (`CircuitOpen`, `BulkheadFull`,
//! `RateLimited`) are produced only at their own boundary, `Timeout` only by
//! the time limiter, and the work's own failure rides along untouched in
//! `Work`.
//!
//! ```
//! use callguard_core::{CallError, ErrorKind};
//!
//! let err: CallError<std::io::Error> = CallError::BulkheadFull { max_concurrent: 8 };
//! assert_eq!(err.kind(), ErrorKind::BulkheadFull);
//! assert!(err.is_rejection());
//! ```

use std::fmt;
use std::time::Duration;

/// Classification of a completed call, as observed by outer layers and
/// event listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// The call returned a value.
    Success,
    /// The work itself failed (or retries around it were exhausted).
    Failure,
    /// A policy boundary refused the call before or instead of running it.
    Rejected,
    /// The deadline elapsed before the work completed.
    TimedOut,
}

/// Non-generic view of a [`CallError`] variant.
///
/// Predicates and classifiers operate on this so pattern instances stay
/// type-erased and can be shared across chains with different work types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected by an open circuit breaker.
    CircuitOpen,
    /// Rejected by a bulkhead at capacity.
    BulkheadFull,
    /// Rejected by a rate limiter.
    RateLimited,
    /// The time limiter's deadline elapsed.
    Timeout,
    /// A retry policy ran out of attempts.
    RetryExhausted,
    /// The unit of work failed on its own.
    Work,
}

impl ErrorKind {
    /// Returns `true` for kinds generated by a policy refusing the call
    /// (circuit open, bulkhead full, rate limited).
    ///
    /// Rejections are not retried by default.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ErrorKind::CircuitOpen | ErrorKind::BulkheadFull | ErrorKind::RateLimited
        )
    }
}

/// A failure escaping a decorated call.
///
/// # Type Parameters
///
/// - `E`: the failure type of the underlying unit of work
#[derive(Debug, Clone)]
pub enum CallError<E> {
    /// The circuit breaker is open; the work was never invoked.
    CircuitOpen {
        /// Name of the breaker instance, if it has one.
        name: Option<String>,
    },

    /// The bulkhead is at capacity; the work was never invoked.
    BulkheadFull {
        /// The concurrency limit that was reached.
        max_concurrent: usize,
    },

    /// The rate limiter refused a permit within its timeout.
    RateLimited {
        /// Time until the next permit accrues, when known.
        retry_after: Option<Duration>,
    },

    /// The time limiter's deadline elapsed before the work completed.
    Timeout {
        /// The configured deadline.
        timeout: Duration,
    },

    /// A retry policy exhausted its attempts; wraps the final failure.
    RetryExhausted {
        /// Total attempts made, including the first.
        attempts: usize,
        /// The failure of the last attempt.
        cause: Box<CallError<E>>,
    },

    /// The unit of work failed; passed through unchanged.
    Work(E),
}

impl<E> CallError<E> {
    /// The non-generic kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CallError::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            CallError::BulkheadFull { .. } => ErrorKind::BulkheadFull,
            CallError::RateLimited { .. } => ErrorKind::RateLimited,
            CallError::Timeout { .. } => ErrorKind::Timeout,
            CallError::RetryExhausted { .. } => ErrorKind::RetryExhausted,
            CallError::Work(_) => ErrorKind::Work,
        }
    }

    /// The outcome classification a layer above should record for this
    /// failure.
    pub fn outcome(&self) -> CallOutcome {
        match self.kind() {
            ErrorKind::CircuitOpen | ErrorKind::BulkheadFull | ErrorKind::RateLimited => {
                CallOutcome::Rejected
            }
            ErrorKind::Timeout => CallOutcome::TimedOut,
            ErrorKind::RetryExhausted | ErrorKind::Work => CallOutcome::Failure,
        }
    }

    /// Returns `true` if this is a policy rejection.
    pub fn is_rejection(&self) -> bool {
        self.kind().is_rejection()
    }

    /// Returns `true` if this is a deadline timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CallError::Timeout { .. })
    }

    /// Returns `true` if this is a circuit breaker rejection.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CallError::CircuitOpen { .. })
    }

    /// Returns `true` if this is a bulkhead rejection.
    pub fn is_bulkhead_full(&self) -> bool {
        matches!(self, CallError::BulkheadFull { .. })
    }

    /// Returns `true` if this is a rate limiter rejection.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, CallError::RateLimited { .. })
    }

    /// Extracts the work's own failure, if this is a `Work` variant.
    pub fn work_error(self) -> Option<E> {
        match self {
            CallError::Work(e) => Some(e),
            _ => None,
        }
    }

    /// Unwraps `RetryExhausted` down to the failure of the final attempt.
    ///
    /// Any other variant is returned unchanged.
    pub fn into_final_cause(self) -> CallError<E> {
        match self {
            CallError::RetryExhausted { cause, .. } => cause.into_final_cause(),
            other => other,
        }
    }

    /// Maps the work's failure type with a function.
    pub fn map_work<F, T>(self, f: F) -> CallError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            CallError::CircuitOpen { name } => CallError::CircuitOpen { name },
            CallError::BulkheadFull { max_concurrent } => {
                CallError::BulkheadFull { max_concurrent }
            }
            CallError::RateLimited { retry_after } => CallError::RateLimited { retry_after },
            CallError::Timeout { timeout } => CallError::Timeout { timeout },
            CallError::RetryExhausted { attempts, cause } => CallError::RetryExhausted {
                attempts,
                cause: Box::new(cause.map_work(f)),
            },
            CallError::Work(e) => CallError::Work(f(e)),
        }
    }
}

impl<E> fmt::Display for CallError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::CircuitOpen { name } => match name {
                Some(n) => write!(f, "circuit breaker '{}' is open; call not permitted", n),
                None => write!(f, "circuit breaker is open; call not permitted"),
            },
            CallError::BulkheadFull { max_concurrent } => {
                write!(f, "bulkhead is full: {} concurrent calls reached", max_concurrent)
            }
            CallError::RateLimited { retry_after } => match retry_after {
                Some(d) => write!(f, "rate limit exceeded, retry after {:?}", d),
                None => write!(f, "rate limit exceeded"),
            },
            CallError::Timeout { timeout } => {
                write!(f, "call timed out after {:?}", timeout)
            }
            CallError::RetryExhausted { attempts, cause } => {
                write!(f, "retries exhausted after {} attempts: {}", attempts, cause)
            }
            CallError::Work(e) => write!(f, "{}", e),
        }
    }
}

impl<E> std::error::Error for CallError<E> where E: fmt::Debug + fmt::Display {}

/// Classifies a finished call result for recording.
pub fn outcome_of<T, E>(result: &Result<T, CallError<E>>) -> CallOutcome {
    match result {
        Ok(_) => CallOutcome::Success,
        Err(e) => e.outcome(),
    }
}
