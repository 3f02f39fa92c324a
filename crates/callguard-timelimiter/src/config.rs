//! Configuration for the time limiter pattern.

use crate::events::TimeLimiterEvent;
use callguard_core::{system_clock, EventListeners, FnListener, SharedClock};
use std::time::Duration;

/// Configuration for a time limiter instance.
///
/// Cancellation caveat: when the deadline fires, abandonment of the
/// in-flight work is best-effort, not guaranteed preemption. With
/// `cancel_running_work(true)` the spawned task is aborted, which takes
/// effect at its next await point; with `false` the task runs to completion
/// detached and its result is discarded. Work that must stop promptly has
/// to check a cancellation signal cooperatively.
pub struct TimeLimiterConfig {
    pub(crate) timeout_duration: Duration,
    pub(crate) cancel_running_work: bool,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<TimeLimiterEvent>,
    pub(crate) clock: SharedClock,
}

impl TimeLimiterConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> TimeLimiterConfigBuilder {
        TimeLimiterConfigBuilder::new()
    }
}

/// Builder for [`TimeLimiterConfig`].
pub struct TimeLimiterConfigBuilder {
    timeout_duration: Duration,
    cancel_running_work: bool,
    name: String,
    event_listeners: EventListeners<TimeLimiterEvent>,
    clock: SharedClock,
}

impl TimeLimiterConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            timeout_duration: Duration::from_secs(5),
            cancel_running_work: false,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
            clock: system_clock(),
        }
    }

    /// Sets the deadline.
    ///
    /// Default: 5 seconds
    pub fn timeout_duration(mut self, duration: Duration) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Sets whether the spawned work is aborted when the deadline fires.
    ///
    /// When `false`, the work keeps running detached and its result is
    /// discarded. Default: false
    pub fn cancel_running_work(mut self, cancel: bool) -> Self {
        self.cancel_running_work = cancel;
        self
    }

    /// Names the limiter for events, errors, and metrics labels.
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

    /// Registers a callback when a call succeeds within the deadline.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TimeLimiterEvent::Success { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Registers a callback when a call fails within the deadline.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TimeLimiterEvent::Error { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Registers a callback when the deadline fires first.
    pub fn on_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, TimeLimiterEvent::Timeout { .. }) {
                f();
            }
        }));
        self
    }

    /// Builds the time limiter.
    pub fn build(self) -> crate::TimeLimiter {
        let config = TimeLimiterConfig {
            timeout_duration: self.timeout_duration,
            cancel_running_work: self.cancel_running_work,
            name: self.name,
            event_listeners: self.event_listeners,
            clock: self.clock,
        };
        crate::TimeLimiter::from_config(config)
    }
}

impl Default for TimeLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
