//! Circuit breaker for async units of work.
//!
//! A circuit breaker watches the outcomes of recent calls in a sliding
//! window and stops invoking the work once the failure rate crosses a
//! threshold, failing fast instead of piling load onto a failing
//! dependency.
//!
//! ## States
//! - **Closed**: calls run normally, outcomes are tracked
//! - **Open**: calls are rejected immediately with [`CircuitOpenError`]
//! - **Half-open**: after a wait, a limited number of trial calls probe
//!   whether the dependency recovered
//!
//! ## Usage
//!
//! ```rust
//! use callguard_circuitbreaker::CircuitBreakerConfig;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let breaker = CircuitBreakerConfig::builder()
//!     .name("backend")
//!     .failure_rate_threshold(0.5)
//!     .sliding_window_size(10)
//!     .minimum_number_of_calls(5)
//!     .wait_duration_in_open_state(Duration::from_secs(5))
//!     .build();
//!
//! let result = breaker.call(|| async { Ok::<_, std::io::Error>("ok") }).await;
//! # let _ = result;
//! # }
//! ```
//!
//! ## Observing state
//!
//! ```rust
//! use callguard_circuitbreaker::{CircuitBreakerConfig, CircuitState};
//!
//! let breaker = CircuitBreakerConfig::builder()
//!     .on_state_transition(|from, to| {
//!         eprintln!("circuit: {:?} -> {:?}", from, to);
//!     })
//!     .build();
//!
//! // Lock-free read; safe from any thread.
//! assert_eq!(breaker.state(), CircuitState::Closed);
//! ```
//!
//! State is shared: clone the breaker (cheap, `Arc` inside) or wrap it into
//! several chains and every caller sees the same window and the same
//! transitions.
//!
//! ## Feature flags
//! - `metrics`: counters and gauges via the `metrics` crate
//! - `tracing`: state transitions logged via the `tracing` crate
//! - `serde`: `Serialize` for [`CircuitState`] and [`CircuitMetrics`]

use callguard_core::{outcome_of, CallError, CallOutcome, Policy, PolicyKind, SharedWork};
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

pub use circuit::{CircuitMetrics, CircuitState};
pub use config::{
    CircuitBreakerConfig, CircuitBreakerConfigBuilder, SharedOutcomeClassifier, SlidingWindowType,
};
pub use error::CircuitOpenError;
pub use events::CircuitBreakerEvent;

mod circuit;
mod config;
mod error;
mod events;
mod window;

use circuit::Circuit;

/// A shared circuit breaker instance.
///
/// Cloning is cheap and clones share all state. The internal lock is held
/// only for permit decisions and outcome recording, never across the work
/// itself.
#[derive(Clone)]
pub struct CircuitBreaker {
    inner: Arc<Inner>,
}

struct Inner {
    circuit: Mutex<Circuit>,
    state_atomic: Arc<AtomicU8>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    pub(crate) fn from_config(config: CircuitBreakerConfig) -> Self {
        let state_atomic = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        let circuit = Mutex::new(Circuit::new(&config, Arc::clone(&state_atomic)));
        Self {
            inner: Arc::new(Inner {
                circuit,
                state_atomic,
                config,
            }),
        }
    }

    /// The breaker's configured name.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// The current state, read without locking.
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.inner.state_atomic.load(Ordering::Acquire))
    }

    /// Returns `true` if the circuit is open.
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// A snapshot of the tracked statistics.
    pub fn metrics(&self) -> CircuitMetrics {
        self.lock_circuit().metrics(&self.inner.config)
    }

    /// Asks the breaker for a permit, applying the open → half-open
    /// transition when the wait duration has elapsed.
    ///
    /// A caller that takes a permit must report back with [`record`].
    ///
    /// [`record`]: CircuitBreaker::record
    pub fn try_acquire(&self) -> bool {
        self.lock_circuit().try_acquire(&self.inner.config)
    }

    /// Records the outcome of a permitted call.
    pub fn record(&self, outcome: CallOutcome) {
        let is_failure = (self.inner.config.failure_classifier)(outcome);
        self.lock_circuit().record(is_failure, &self.inner.config);
    }

    /// Trips the circuit open regardless of the tracked failure rate.
    pub fn force_open(&self) {
        self.lock_circuit().force_open(&self.inner.config);
    }

    /// Closes the circuit regardless of the tracked failure rate.
    pub fn force_closed(&self) {
        self.lock_circuit().force_closed(&self.inner.config);
    }

    /// Closes the circuit and clears the window.
    pub fn reset(&self) {
        self.lock_circuit().reset(&self.inner.config);
    }

    /// Runs a unit of work under this breaker.
    ///
    /// When the circuit is open the work is never invoked and the call
    /// fails with [`CallError::CircuitOpen`]. Otherwise the work runs and
    /// its outcome is recorded in the sliding window.
    pub async fn call<T, E, F, Fut>(&self, work: F) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.try_acquire() {
            return Err(CircuitOpenError {
                name: self.inner.config.name.clone(),
            }
            .into());
        }

        let result = work().await.map_err(CallError::Work);
        self.record(outcome_of(&result));
        result
    }

    fn lock_circuit(&self) -> std::sync::MutexGuard<'_, Circuit> {
        // The lock is never held across an await, so a poisoned mutex can
        // only mean a panic inside the state machine itself.
        self.inner
            .circuit
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T, E> Policy<T, E> for CircuitBreaker
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn kind(&self) -> PolicyKind {
        PolicyKind::CircuitBreaker
    }

    fn wrap(&self, inner: SharedWork<T, E>) -> SharedWork<T, E> {
        let breaker = self.clone();
        Arc::new(move || {
            let breaker = breaker.clone();
            let inner = Arc::clone(&inner);
            Box::pin(async move {
                if !breaker.try_acquire() {
                    return Err(CircuitOpenError {
                        name: breaker.name().to_string(),
                    }
                    .into());
                }
                let result = inner().await;
                breaker.record(outcome_of(&result));
                result
            })
        })
    }
}
