//! Token-bucket rate limiter for async units of work.
//!
//! Permits accrue continuously at `limit_for_period` per
//! `limit_refresh_period` into a bucket capped at `limit_for_period`
//! tokens; the bucket is refilled lazily from elapsed time on every
//! acquisition attempt. A call finding a token runs immediately; otherwise
//! it waits for a token to accrue, up to `timeout_duration`, and is then
//! rejected with [`RateLimitExceededError`].
//!
//! ```rust
//! use callguard_ratelimiter::RateLimiterConfig;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let limiter = RateLimiterConfig::builder()
//!     .name("backend")
//!     .limit_for_period(10)
//!     .limit_refresh_period(Duration::from_secs(1))
//!     .timeout_duration(Duration::from_millis(100))
//!     .build();
//!
//! let result = limiter.call(|| async { Ok::<_, std::io::Error>(()) }).await;
//! # let _ = result;
//! # }
//! ```

use callguard_core::{CallError, Policy, PolicyKind, SharedWork};
#[cfg(feature = "metrics")]
use metrics::counter;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use config::{RateLimiterConfig, RateLimiterConfigBuilder};
pub use error::RateLimitExceededError;
pub use events::RateLimiterEvent;

mod bucket;
mod config;
mod error;
mod events;

use bucket::TokenBucket;

/// A shared rate limiter instance.
///
/// Cloning is cheap and clones share the token bucket.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

struct Inner {
    bucket: Mutex<TokenBucket>,
    config: RateLimiterConfig,
}

impl RateLimiter {
    /// Creates a new configuration builder.
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::new()
    }

    pub(crate) fn from_config(config: RateLimiterConfig) -> Self {
        let bucket = Mutex::new(TokenBucket::new(
            config.limit_for_period,
            config.limit_refresh_period,
            config.clock.now(),
        ));
        Self {
            inner: Arc::new(Inner { bucket, config }),
        }
    }

    /// The limiter's configured name.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Tokens currently available (fractional).
    pub fn available_permits(&self) -> f64 {
        self.lock_bucket().available(self.inner.config.clock.now())
    }

    /// Acquires one permit, waiting up to `timeout_duration` for a token to
    /// accrue. Returns how long the caller waited.
    ///
    /// The bucket lock is held only for the refill arithmetic; waiting
    /// happens outside it, and a woken caller re-attempts acquisition so a
    /// token claimed by a faster competitor is never double-spent.
    pub async fn acquire(&self) -> Result<Duration, RateLimitExceededError> {
        let config = &self.inner.config;
        let start = config.clock.now();

        loop {
            let now = config.clock.now();
            let attempt = self.lock_bucket().try_acquire(now);

            match attempt {
                Ok(()) => {
                    let waited = now.saturating_duration_since(start);
                    config
                        .event_listeners
                        .emit(&RateLimiterEvent::CallPermitted {
                            pattern_name: config.name.clone(),
                            timestamp: now,
                            waited,
                        });

                    #[cfg(feature = "metrics")]
                    counter!("ratelimiter_calls_permitted_total", "ratelimiter" => config.name.clone())
                        .increment(1);

                    return Ok(waited);
                }
                Err(until_next_token) => {
                    let elapsed = now.saturating_duration_since(start);
                    if elapsed + until_next_token > config.timeout_duration {
                        config
                            .event_listeners
                            .emit(&RateLimiterEvent::CallRejected {
                                pattern_name: config.name.clone(),
                                timestamp: now,
                            });

                        #[cfg(feature = "tracing")]
                        tracing::debug!(
                            ratelimiter = %config.name,
                            wait = ?until_next_token,
                            "call rejected; next permit beyond timeout"
                        );

                        #[cfg(feature = "metrics")]
                        counter!("ratelimiter_calls_rejected_total", "ratelimiter" => config.name.clone())
                            .increment(1);

                        return Err(RateLimitExceededError {
                            timeout: config.timeout_duration,
                            retry_after: Some(until_next_token),
                        });
                    }
                    config.clock.sleep(until_next_token).await;
                }
            }
        }
    }

    /// Runs a unit of work under this limiter.
    pub async fn call<T, E, F, Fut>(&self, work: F) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.acquire().await?;
        work().await.map_err(CallError::Work)
    }

    fn lock_bucket(&self) -> std::sync::MutexGuard<'_, TokenBucket> {
        // Held only for refill arithmetic; a poisoned lock can only come
        // from a panic inside the bucket itself.
        self.inner
            .bucket
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T, E> Policy<T, E> for RateLimiter
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn kind(&self) -> PolicyKind {
        PolicyKind::RateLimiter
    }

    fn wrap(&self, inner: SharedWork<T, E>) -> SharedWork<T, E> {
        let limiter = self.clone();
        Arc::new(move || {
            let limiter = limiter.clone();
            let inner = Arc::clone(&inner);
            Box::pin(async move {
                limiter.acquire().await?;
                inner().await
            })
        })
    }
}
