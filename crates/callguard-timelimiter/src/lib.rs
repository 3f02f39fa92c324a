//! Time limiter: races a unit of work against a deadline.
//!
//! The work is spawned on its own task so it can be abandoned independently
//! of the caller, then raced against the deadline. Whichever finishes first
//! wins: the work's own result passes through, or the call fails with
//! [`TimeoutError`] and the in-flight task is either aborted
//! (`cancel_running_work(true)`) or left to finish detached with its result
//! discarded.
//!
//! Cancellation is best-effort. An abort lands at the task's next await
//! point; purely synchronous work cannot be preempted. This is part of the
//! contract, not an implementation detail.
//!
//! ```rust
//! use callguard_timelimiter::TimeLimiterConfig;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let limiter = TimeLimiterConfig::builder()
//!     .timeout_duration(Duration::from_millis(600))
//!     .cancel_running_work(true)
//!     .build();
//!
//! let result = limiter.call(|| async { Ok::<_, std::io::Error>("done") }).await;
//! # let _ = result;
//! # }
//! ```

use callguard_core::{CallError, Policy, PolicyKind, SharedWork};
#[cfg(feature = "metrics")]
use metrics::{counter, histogram};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub use config::{TimeLimiterConfig, TimeLimiterConfigBuilder};
pub use error::TimeoutError;
pub use events::TimeLimiterEvent;

mod config;
mod error;
mod events;

/// A shared time limiter instance.
#[derive(Clone)]
pub struct TimeLimiter {
    config: Arc<TimeLimiterConfig>,
}

impl TimeLimiter {
    /// Creates a new configuration builder.
    pub fn builder() -> TimeLimiterConfigBuilder {
        TimeLimiterConfigBuilder::new()
    }

    pub(crate) fn from_config(config: TimeLimiterConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// The limiter's configured name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The configured deadline.
    pub fn timeout_duration(&self) -> Duration {
        self.config.timeout_duration
    }

    /// Runs a unit of work under the deadline.
    ///
    /// The future must be `Send + 'static`: it is moved onto its own task so
    /// the caller can abandon it when the deadline fires.
    pub async fn call<T, E, F, Fut>(&self, work: F) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let fut = work();
        self.race(Box::pin(async move { fut.await.map_err(CallError::Work) }))
            .await
    }

    /// Races an already-lifted work future against the deadline.
    async fn race<T, E>(
        &self,
        fut: futures::future::BoxFuture<'static, Result<T, CallError<E>>>,
    ) -> Result<T, CallError<E>>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let config = &self.config;
        let start = config.clock.now();
        let mut handle = tokio::spawn(fut);
        let deadline = config.clock.sleep(config.timeout_duration);

        tokio::select! {
            joined = &mut handle => {
                let duration = config.clock.now().saturating_duration_since(start);
                match joined {
                    Ok(result) => {
                        self.emit_completed(result.is_ok(), duration);
                        result
                    }
                    Err(join_err) if join_err.is_panic() => {
                        std::panic::resume_unwind(join_err.into_panic())
                    }
                    // The task can only be cancelled by us, which means the
                    // deadline branch won the race.
                    Err(_) => Err(self.timed_out().into()),
                }
            }
            _ = deadline => {
                if config.cancel_running_work {
                    handle.abort();
                }
                Err(self.timed_out().into())
            }
        }
    }

    fn emit_completed(&self, succeeded: bool, duration: Duration) {
        let config = &self.config;
        let event = if succeeded {
            TimeLimiterEvent::Success {
                pattern_name: config.name.clone(),
                timestamp: config.clock.now(),
                duration,
            }
        } else {
            TimeLimiterEvent::Error {
                pattern_name: config.name.clone(),
                timestamp: config.clock.now(),
                duration,
            }
        };
        config.event_listeners.emit(&event);

        #[cfg(feature = "metrics")]
        {
            counter!(
                "timelimiter_calls_total",
                "timelimiter" => config.name.clone(),
                "result" => if succeeded { "success" } else { "error" }
            )
            .increment(1);
            histogram!("timelimiter_call_duration_seconds", "timelimiter" => config.name.clone())
                .record(duration.as_secs_f64());
        }
    }

    fn timed_out(&self) -> TimeoutError {
        let config = &self.config;
        config.event_listeners.emit(&TimeLimiterEvent::Timeout {
            pattern_name: config.name.clone(),
            timestamp: config.clock.now(),
            timeout_duration: config.timeout_duration,
        });

        #[cfg(feature = "tracing")]
        tracing::warn!(
            timelimiter = %config.name,
            timeout_ms = config.timeout_duration.as_millis(),
            "call timed out"
        );

        #[cfg(feature = "metrics")]
        counter!(
            "timelimiter_calls_total",
            "timelimiter" => config.name.clone(),
            "result" => "timeout"
        )
        .increment(1);

        TimeoutError {
            timeout: config.timeout_duration,
        }
    }
}

impl<T, E> Policy<T, E> for TimeLimiter
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn kind(&self) -> PolicyKind {
        PolicyKind::TimeLimiter
    }

    fn wrap(&self, inner: SharedWork<T, E>) -> SharedWork<T, E> {
        let limiter = self.clone();
        Arc::new(move || {
            let limiter = limiter.clone();
            let fut = inner();
            Box::pin(async move { limiter.race(fut).await })
        })
    }
}
