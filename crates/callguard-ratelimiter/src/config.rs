//! Configuration for the rate limiter pattern.

use crate::events::RateLimiterEvent;
use callguard_core::{system_clock, EventListeners, FnListener, SharedClock};
use std::time::Duration;

/// Configuration for a rate limiter instance.
pub struct RateLimiterConfig {
    pub(crate) limit_for_period: usize,
    pub(crate) limit_refresh_period: Duration,
    pub(crate) timeout_duration: Duration,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<RateLimiterEvent>,
    pub(crate) clock: SharedClock,
}

impl RateLimiterConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::new()
    }
}

/// Builder for [`RateLimiterConfig`].
pub struct RateLimiterConfigBuilder {
    limit_for_period: usize,
    limit_refresh_period: Duration,
    timeout_duration: Duration,
    name: String,
    event_listeners: EventListeners<RateLimiterEvent>,
    clock: SharedClock,
}

impl RateLimiterConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            limit_for_period: 50,
            limit_refresh_period: Duration::from_millis(500),
            timeout_duration: Duration::from_secs(5),
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
            clock: system_clock(),
        }
    }

    /// Sets how many permits accrue per refresh period.
    ///
    /// Default: 50
    pub fn limit_for_period(mut self, limit: usize) -> Self {
        self.limit_for_period = limit.max(1);
        self
    }

    /// Sets the refresh period.
    ///
    /// Default: 500 ms
    pub fn limit_refresh_period(mut self, period: Duration) -> Self {
        self.limit_refresh_period = period;
        self
    }

    /// Sets how long a caller may wait for a permit.
    ///
    /// Zero means a call finding no token is rejected immediately.
    /// Default: 5 seconds
    pub fn timeout_duration(mut self, timeout: Duration) -> Self {
        self.timeout_duration = timeout;
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

    /// Registers a callback for each permitted call, with the time the
    /// caller waited for its token.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateLimiterEvent::CallPermitted { waited, .. } = event {
                f(*waited);
            }
        }));
        self
    }

    /// Registers a callback for each rejected call.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, RateLimiterEvent::CallRejected { .. }) {
                f();
            }
        }));
        self
    }

    /// Builds the rate limiter.
    pub fn build(self) -> crate::RateLimiter {
        let config = RateLimiterConfig {
            limit_for_period: self.limit_for_period,
            limit_refresh_period: self.limit_refresh_period,
            timeout_duration: self.timeout_duration,
            name: self.name,
            event_listeners: self.event_listeners,
            clock: self.clock,
        };
        crate::RateLimiter::from_config(config)
    }
}

impl Default for RateLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
