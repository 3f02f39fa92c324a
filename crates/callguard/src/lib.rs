//! Composable resilience policies for async units of work.
//!
//! `callguard` wraps an arbitrary async operation in any combination of
//! five policies (retry, circuit breaker, bulkhead, rate limiter, and
//! time limiter) plus an optional fallback, behind a single entry point:
//!
//! ```rust
//! use callguard::{decorate, CallError, Registry};
//! use callguard_circuitbreaker::CircuitBreaker;
//! use callguard_retry::Retry;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let registry = Registry::new();
//! let breaker = registry.circuit_breaker("backend", || {
//!     CircuitBreaker::builder()
//!         .name("backend")
//!         .failure_rate_threshold(0.5)
//!         .sliding_window_size(20)
//!         .build()
//! });
//! let retry = Retry::builder()
//!     .max_attempts(3)
//!     .exponential_backoff(Duration::from_millis(100))
//!     .build();
//!
//! let call = decorate(
//!     || async { Ok::<_, std::io::Error>("live data".to_string()) },
//!     vec![Arc::new(retry), Arc::new(breaker)],
//!     Some(Arc::new(|_failure: &CallError<std::io::Error>| "cached data".to_string())),
//! );
//!
//! // Safe to invoke concurrently; policy state is shared across callers.
//! let value = call.invoke().await.unwrap();
//! # let _ = value;
//! # }
//! ```
//!
//! Policies nest in a fixed order regardless of how they are supplied:
//! retry outermost, then circuit breaker, bulkhead, rate limiter, and time
//! limiter around the raw work. See [`chain`] for the consequences.
//!
//! Each pattern also works standalone through its own crate
//! (`callguard-circuitbreaker`, `callguard-bulkhead`, …) and its `call`
//! method; this crate adds the composition layer and the named-instance
//! [`Registry`].
//!
//! ## Feature flags
//! - `metrics`: Prometheus-style metrics in every pattern
//! - `tracing`: structured logging in every pattern

pub mod chain;
pub mod registry;

pub use chain::{decorate, DecoratedCall, DecoratedCallBuilder, FallbackFn};
pub use registry::Registry;

pub use callguard_core::{
    outcome_of, work_fn, CallError, CallOutcome, Clock, ErrorKind, Policy, PolicyKind,
    SharedClock, SharedPolicy, SharedWork, SystemClock,
};

pub use callguard_bulkhead::{Bulkhead, BulkheadConfig, BulkheadFullError};
pub use callguard_circuitbreaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitOpenError, CircuitState,
};
pub use callguard_ratelimiter::{RateLimitExceededError, RateLimiter, RateLimiterConfig};
pub use callguard_retry::{Retry, RetryConfig};
pub use callguard_timelimiter::{TimeLimiter, TimeLimiterConfig, TimeoutError};
