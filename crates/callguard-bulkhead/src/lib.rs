//! Bulkhead: bounds the number of concurrently running units of work.
//!
//! A bulkhead holds a counting semaphore sized to `max_concurrent_calls`.
//! Each call takes one permit before the work starts and gives it back when
//! the work completes (on success, failure, or cancellation), so the number
//! of in-flight invocations can never exceed the configured limit. Callers
//! finding the bulkhead full are rejected immediately, or after a bounded
//! wait when `max_wait_duration` is set.
//!
//! ```rust
//! use callguard_bulkhead::BulkheadConfig;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let bulkhead = BulkheadConfig::builder()
//!     .name("downstream")
//!     .max_concurrent_calls(8)
//!     .max_wait_duration(Duration::from_millis(250))
//!     .build();
//!
//! let result = bulkhead.call(|| async { Ok::<_, std::io::Error>(()) }).await;
//! # let _ = result;
//! # }
//! ```

use callguard_core::{CallError, Policy, PolicyKind, SharedWork};
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

pub use config::{BulkheadConfig, BulkheadConfigBuilder};
pub use error::BulkheadFullError;
pub use events::BulkheadEvent;

mod config;
mod error;
mod events;

/// A unit of bulkhead capacity.
///
/// Dropping the permit releases the slot; this happens on every exit path,
/// including cancellation of the future holding it.
pub struct BulkheadPermit {
    _permit: OwnedSemaphorePermit,
}

/// A shared bulkhead instance.
///
/// Cloning is cheap and clones share the permit pool.
#[derive(Clone)]
pub struct Bulkhead {
    inner: Arc<Inner>,
}

struct Inner {
    semaphore: Arc<Semaphore>,
    config: BulkheadConfig,
}

impl Bulkhead {
    /// Creates a new configuration builder.
    pub fn builder() -> BulkheadConfigBuilder {
        BulkheadConfigBuilder::new()
    }

    pub(crate) fn from_config(config: BulkheadConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_calls));
        Self {
            inner: Arc::new(Inner { semaphore, config }),
        }
    }

    /// The bulkhead's configured name.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// The configured concurrency limit.
    pub fn max_concurrent_calls(&self) -> usize {
        self.inner.config.max_concurrent_calls
    }

    /// Permits currently free.
    pub fn available_permits(&self) -> usize {
        self.inner.semaphore.available_permits()
    }

    /// Acquires one permit, waiting up to the configured `max_wait_duration`
    /// when the bulkhead is full.
    pub async fn acquire(&self) -> Result<BulkheadPermit, BulkheadFullError> {
        let config = &self.inner.config;

        let permit = match Arc::clone(&self.inner.semaphore).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(TryAcquireError::NoPermits) => match config.max_wait_duration {
                Some(wait) if wait > Duration::ZERO => {
                    let deadline = config.clock.sleep(wait);
                    tokio::select! {
                        acquired = Arc::clone(&self.inner.semaphore).acquire_owned() => {
                            acquired.ok()
                        }
                        _ = deadline => None,
                    }
                }
                _ => None,
            },
            Err(TryAcquireError::Closed) => None,
        };

        match permit {
            Some(permit) => {
                let concurrent_calls =
                    config.max_concurrent_calls - self.inner.semaphore.available_permits();
                config.event_listeners.emit(&BulkheadEvent::CallPermitted {
                    pattern_name: config.name.clone(),
                    timestamp: config.clock.now(),
                    concurrent_calls,
                });

                #[cfg(feature = "metrics")]
                {
                    counter!("bulkhead_calls_permitted_total", "bulkhead" => config.name.clone())
                        .increment(1);
                    gauge!("bulkhead_concurrent_calls", "bulkhead" => config.name.clone())
                        .set(concurrent_calls as f64);
                }

                Ok(BulkheadPermit { _permit: permit })
            }
            None => {
                config.event_listeners.emit(&BulkheadEvent::CallRejected {
                    pattern_name: config.name.clone(),
                    timestamp: config.clock.now(),
                    max_concurrent_calls: config.max_concurrent_calls,
                });

                #[cfg(feature = "tracing")]
                tracing::debug!(bulkhead = %config.name, "call rejected at capacity");

                #[cfg(feature = "metrics")]
                counter!("bulkhead_calls_rejected_total", "bulkhead" => config.name.clone())
                    .increment(1);

                Err(BulkheadFullError {
                    max_concurrent_calls: config.max_concurrent_calls,
                })
            }
        }
    }

    /// Runs a unit of work inside the bulkhead.
    pub async fn call<T, E, F, Fut>(&self, work: F) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.acquire().await?;
        let config = &self.inner.config;
        let start = config.clock.now();

        let result = work().await.map_err(CallError::Work);
        drop(permit);

        self.emit_completion(result.is_ok(), config.clock.now() - start);
        result
    }

    fn emit_completion(&self, succeeded: bool, duration: Duration) {
        let config = &self.inner.config;
        let event = if succeeded {
            BulkheadEvent::CallFinished {
                pattern_name: config.name.clone(),
                timestamp: config.clock.now(),
                duration,
            }
        } else {
            BulkheadEvent::CallFailed {
                pattern_name: config.name.clone(),
                timestamp: config.clock.now(),
                duration,
            }
        };
        config.event_listeners.emit(&event);

        #[cfg(feature = "metrics")]
        gauge!("bulkhead_concurrent_calls", "bulkhead" => config.name.clone()).set(
            (config.max_concurrent_calls - self.inner.semaphore.available_permits()) as f64,
        );
    }
}

impl<T, E> Policy<T, E> for Bulkhead
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn kind(&self) -> PolicyKind {
        PolicyKind::Bulkhead
    }

    fn wrap(&self, inner: SharedWork<T, E>) -> SharedWork<T, E> {
        let bulkhead = self.clone();
        Arc::new(move || {
            let bulkhead = bulkhead.clone();
            let inner = Arc::clone(&inner);
            Box::pin(async move {
                let permit = bulkhead.acquire().await?;
                let start = bulkhead.inner.config.clock.now();

                let result = inner().await;
                drop(permit);

                bulkhead
                    .emit_completion(result.is_ok(), bulkhead.inner.config.clock.now() - start);
                result
            })
        })
    }
}
