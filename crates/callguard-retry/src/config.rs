use crate::backoff::{ExponentialBackoff, FixedInterval, IntervalFunction};
use crate::events::RetryEvent;
use callguard_core::{system_clock, ErrorKind, EventListeners, FnListener, SharedClock};
use std::sync::Arc;
use std::time::Duration;

/// Decides whether a failure kind qualifies for another attempt.
pub type RetryPredicate = Arc<dyn Fn(ErrorKind) -> bool + Send + Sync>;

/// Configuration for a retry policy instance.
pub struct RetryConfig {
    pub(crate) max_attempts: usize,
    pub(crate) interval_fn: Arc<dyn IntervalFunction>,
    pub(crate) retry_predicate: RetryPredicate,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) name: String,
    pub(crate) clock: SharedClock,
}

impl RetryConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder {
    max_attempts: usize,
    interval_fn: Option<Arc<dyn IntervalFunction>>,
    retry_predicate: Option<RetryPredicate>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
    clock: SharedClock,
}

impl RetryConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - max_attempts: 3 (counting the initial attempt)
    /// - backoff: exponential from 100 ms
    /// - predicate: retry every failure kind that is not a rejection
    /// - name: `<unnamed>`
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            interval_fn: None,
            retry_predicate: None,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
            clock: system_clock(),
        }
    }

    /// Sets the attempt budget, including the initial attempt.
    ///
    /// `max_attempts(3)` means one initial attempt plus two retries. A
    /// value of 0 is treated as 1.
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Uses a fixed delay between attempts.
    pub fn fixed_backoff(mut self, duration: Duration) -> Self {
        self.interval_fn = Some(Arc::new(FixedInterval::new(duration)));
        self
    }

    /// Uses doubling exponential backoff from the given initial delay.
    pub fn exponential_backoff(mut self, initial_interval: Duration) -> Self {
        self.interval_fn = Some(Arc::new(ExponentialBackoff::new(initial_interval)));
        self
    }

    /// Uses a custom delay strategy.
    pub fn backoff<I>(mut self, interval_fn: I) -> Self
    where
        I: IntervalFunction + 'static,
    {
        self.interval_fn = Some(Arc::new(interval_fn));
        self
    }

    /// Sets which failure kinds are retried.
    ///
    /// The default retries everything except rejections
    /// (`CircuitOpen`, `BulkheadFull`, `RateLimited`); passing a predicate
    /// that returns `true` for those kinds opts in to retrying them.
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(ErrorKind) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    /// Names the policy for events and metrics labels.
    ///
    /// Default: `<unnamed>`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the time source, mainly for tests.
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Registers a callback before each retry, with the failed attempt
    /// number and the upcoming delay.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::RetryScheduled { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback on success, with the total attempts made.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback when the attempt budget is spent.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Exhausted { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback when a failure is not retried because the
    /// predicate excluded it.
    pub fn on_ignored_failure<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, RetryEvent::IgnoredFailure { .. }) {
                f();
            }
        }));
        self
    }

    /// Builds the retry policy.
    pub fn build(self) -> crate::Retry {
        let interval_fn = self
            .interval_fn
            .unwrap_or_else(|| Arc::new(ExponentialBackoff::new(Duration::from_millis(100))));
        let retry_predicate = self
            .retry_predicate
            .unwrap_or_else(|| Arc::new(|kind: ErrorKind| !kind.is_rejection()));

        let config = RetryConfig {
            max_attempts: self.max_attempts,
            interval_fn,
            retry_predicate,
            event_listeners: self.event_listeners,
            name: self.name,
            clock: self.clock,
        };
        crate::Retry::from_config(config)
    }
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
