//! Retry policy for async units of work.
//!
//! Re-invokes a failing unit of work up to `max_attempts` times, sleeping a
//! configurable backoff between attempts. Only qualifying failures are
//! retried: by default that is every kind except the rejections produced by
//! other policies (circuit open, bulkhead full, rate limited), which fail
//! for reasons another attempt will not fix. When the budget is spent the
//! final failure is wrapped in [`CallError::RetryExhausted`] together with
//! the attempt count.
//!
//! ```rust
//! use callguard_retry::RetryConfig;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let retry = RetryConfig::builder()
//!     .name("backend")
//!     .max_attempts(3)
//!     .exponential_backoff(Duration::from_millis(100))
//!     .build();
//!
//! let result = retry.call(|| async { Ok::<_, std::io::Error>("ok") }).await;
//! # let _ = result;
//! # }
//! ```
//!
//! Retrying a rejection kind is an explicit opt-in:
//!
//! ```rust
//! use callguard_core::ErrorKind;
//! use callguard_retry::RetryConfig;
//!
//! let retry = RetryConfig::builder()
//!     .retry_on(|kind| kind == ErrorKind::CircuitOpen || !kind.is_rejection())
//!     .build();
//! ```

use callguard_core::{CallError, Policy, PolicyKind, SharedWork, WorkFuture};
#[cfg(feature = "metrics")]
use metrics::counter;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub use backoff::{
    ExponentialBackoff, ExponentialRandomBackoff, FixedInterval, FnInterval, IntervalFunction,
};
pub use config::{RetryConfig, RetryConfigBuilder, RetryPredicate};
pub use events::RetryEvent;

mod backoff;
mod config;
mod events;

/// Per-invocation retry bookkeeping.
///
/// One context lives for exactly one pass through a decorated call and is
/// discarded when that pass terminates, so concurrent invocations never
/// share attempt counters.
#[derive(Debug, Clone, Copy)]
pub struct RetryContext {
    /// The attempt currently running, starting at 1.
    pub attempt: usize,
    /// Backoff delay accumulated so far.
    pub total_delay: Duration,
}

impl RetryContext {
    fn new() -> Self {
        Self {
            attempt: 1,
            total_delay: Duration::ZERO,
        }
    }

    fn advance(&mut self, delay: Duration) {
        self.attempt += 1;
        self.total_delay += delay;
    }
}

/// A shared retry policy instance.
#[derive(Clone)]
pub struct Retry {
    config: Arc<RetryConfig>,
}

impl Retry {
    /// Creates a new configuration builder.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    pub(crate) fn from_config(config: RetryConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// The policy's configured name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The configured attempt budget.
    pub fn max_attempts(&self) -> usize {
        self.config.max_attempts
    }

    /// Runs a re-invocable unit of work under this policy.
    pub async fn call<T, E, F, Fut>(&self, work: F) -> Result<T, CallError<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run(|| {
            let fut = work();
            async move { fut.await.map_err(CallError::Work) }
        })
        .await
    }

    /// The attempt loop shared by [`call`] and the policy wrapper.
    ///
    /// [`call`]: Retry::call
    async fn run<T, E, F, Fut>(&self, work: F) -> Result<T, CallError<E>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, CallError<E>>>,
    {
        let config = &self.config;
        let mut ctx = RetryContext::new();

        loop {
            match work().await {
                Ok(value) => {
                    config.event_listeners.emit(&RetryEvent::Success {
                        pattern_name: config.name.clone(),
                        timestamp: config.clock.now(),
                        attempts: ctx.attempt,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("retry_calls_total", "retry" => config.name.clone(), "result" => "success")
                        .increment(1);

                    return Ok(value);
                }
                Err(error) => {
                    if !(config.retry_predicate)(error.kind()) {
                        config.event_listeners.emit(&RetryEvent::IgnoredFailure {
                            pattern_name: config.name.clone(),
                            timestamp: config.clock.now(),
                        });
                        return Err(error);
                    }

                    if ctx.attempt >= config.max_attempts {
                        config.event_listeners.emit(&RetryEvent::Exhausted {
                            pattern_name: config.name.clone(),
                            timestamp: config.clock.now(),
                            attempts: ctx.attempt,
                        });

                        #[cfg(feature = "tracing")]
                        tracing::warn!(
                            retry = %config.name,
                            attempts = ctx.attempt,
                            "attempt budget exhausted"
                        );

                        #[cfg(feature = "metrics")]
                        counter!("retry_calls_total", "retry" => config.name.clone(), "result" => "exhausted")
                            .increment(1);

                        return Err(CallError::RetryExhausted {
                            attempts: ctx.attempt,
                            cause: Box::new(error),
                        });
                    }

                    let delay = config.interval_fn.interval(ctx.attempt);
                    config.event_listeners.emit(&RetryEvent::RetryScheduled {
                        pattern_name: config.name.clone(),
                        timestamp: config.clock.now(),
                        attempt: ctx.attempt,
                        delay,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("retry_attempts_total", "retry" => config.name.clone()).increment(1);

                    config.clock.sleep(delay).await;
                    ctx.advance(delay);
                }
            }
        }
    }
}

impl<T, E> Policy<T, E> for Retry
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn kind(&self) -> PolicyKind {
        PolicyKind::Retry
    }

    fn wrap(&self, inner: SharedWork<T, E>) -> SharedWork<T, E> {
        let retry = self.clone();
        Arc::new(move || {
            let retry = retry.clone();
            let inner = Arc::clone(&inner);
            Box::pin(async move {
                retry
                    .run(|| -> WorkFuture<T, E> { inner() })
                    .await
            })
        })
    }
}
