use crate::circuit::CircuitState;
use crate::events::CircuitBreakerEvent;
use crate::window::SlidingWindow;
use callguard_core::{system_clock, CallOutcome, EventListeners, FnListener, SharedClock};
use std::sync::Arc;
use std::time::Duration;

/// How the breaker tracks recent calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlidingWindowType {
    /// Track the last N calls in a ring buffer.
    CountBased,
    /// Track calls made within a time window.
    TimeBased,
}

/// Decides whether a recorded outcome counts as a failure.
pub type SharedOutcomeClassifier = Arc<dyn Fn(CallOutcome) -> bool + Send + Sync>;

/// Configuration for a circuit breaker instance.
pub struct CircuitBreakerConfig {
    pub(crate) failure_rate_threshold: f64,
    pub(crate) sliding_window_type: SlidingWindowType,
    pub(crate) sliding_window_size: usize,
    pub(crate) sliding_window_duration: Option<Duration>,
    pub(crate) wait_duration_in_open: Duration,
    pub(crate) permitted_calls_in_half_open: usize,
    pub(crate) minimum_number_of_calls: usize,
    pub(crate) failure_classifier: SharedOutcomeClassifier,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) name: String,
    pub(crate) clock: SharedClock,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    pub(crate) fn new_window(&self) -> SlidingWindow {
        match self.sliding_window_type {
            SlidingWindowType::CountBased => SlidingWindow::count_based(self.sliding_window_size),
            SlidingWindowType::TimeBased => {
                // Validated in build().
                SlidingWindow::time_based(
                    self.sliding_window_duration
                        .unwrap_or(Duration::from_secs(60)),
                )
            }
        }
    }
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder {
    failure_rate_threshold: f64,
    sliding_window_type: SlidingWindowType,
    sliding_window_size: usize,
    sliding_window_duration: Option<Duration>,
    wait_duration_in_open: Duration,
    permitted_calls_in_half_open: usize,
    minimum_number_of_calls: Option<usize>,
    failure_classifier: SharedOutcomeClassifier,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    name: String,
    clock: SharedClock,
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            sliding_window_type: SlidingWindowType::CountBased,
            sliding_window_size: 100,
            sliding_window_duration: None,
            wait_duration_in_open: Duration::from_secs(30),
            permitted_calls_in_half_open: 1,
            minimum_number_of_calls: None,
            failure_classifier: Arc::new(|outcome| outcome != CallOutcome::Success),
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
            clock: system_clock(),
        }
    }

    /// Sets the failure rate (0.0 to 1.0) at which the circuit opens.
    ///
    /// Default: 0.5
    pub fn failure_rate_threshold(mut self, rate: f64) -> Self {
        self.failure_rate_threshold = rate;
        self
    }

    /// Sets the window type.
    ///
    /// Default: `CountBased`
    pub fn sliding_window_type(mut self, window_type: SlidingWindowType) -> Self {
        self.sliding_window_type = window_type;
        self
    }

    /// Sets how many calls a count-based window tracks.
    ///
    /// Default: 100
    pub fn sliding_window_size(mut self, size: usize) -> Self {
        self.sliding_window_size = size;
        self
    }

    /// Sets the age limit of a time-based window.
    ///
    /// Required when the window type is `TimeBased`.
    pub fn sliding_window_duration(mut self, duration: Duration) -> Self {
        self.sliding_window_duration = Some(duration);
        self
    }

    /// Sets how long the circuit stays open before probing for recovery.
    ///
    /// Default: 30 seconds
    pub fn wait_duration_in_open_state(mut self, duration: Duration) -> Self {
        self.wait_duration_in_open = duration;
        self
    }

    /// Sets how many trial calls are permitted while half-open.
    ///
    /// Default: 1
    pub fn permitted_calls_in_half_open_state(mut self, n: usize) -> Self {
        self.permitted_calls_in_half_open = n.max(1);
        self
    }

    /// Sets the sample count below which the failure rate is not evaluated.
    ///
    /// Default: same as `sliding_window_size`
    pub fn minimum_number_of_calls(mut self, n: usize) -> Self {
        self.minimum_number_of_calls = Some(n);
        self
    }

    /// Sets which recorded outcomes count as failures.
    ///
    /// Default: everything except `Success`
    pub fn failure_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(CallOutcome) -> bool + Send + Sync + 'static,
    {
        self.failure_classifier = Arc::new(classifier);
        self
    }

    /// Gives the breaker a name for events, errors, and metrics labels.
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

    /// Registers a callback for state transitions.
    ///
    /// Called with the state the circuit is leaving and the state it is
    /// entering.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(*from_state, *to_state);
                }
            }));
        self
    }

    /// Registers a callback for each permitted call, with the state that
    /// permitted it.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::CallPermitted { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback for each rejected call.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if matches!(event, CircuitBreakerEvent::CallRejected { .. }) {
                    f();
                }
            }));
        self
    }

    /// Registers a callback for each recorded success.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::SuccessRecorded { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback for each recorded failure.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::FailureRecorded { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Builds the breaker.
    ///
    /// # Panics
    ///
    /// Panics if the window type is `TimeBased` and no
    /// `sliding_window_duration` was set.
    pub fn build(self) -> crate::CircuitBreaker {
        if self.sliding_window_type == SlidingWindowType::TimeBased
            && self.sliding_window_duration.is_none()
        {
            panic!("sliding_window_duration must be set when using a TimeBased sliding window");
        }

        let config = CircuitBreakerConfig {
            failure_rate_threshold: self.failure_rate_threshold,
            sliding_window_type: self.sliding_window_type,
            sliding_window_size: self.sliding_window_size,
            sliding_window_duration: self.sliding_window_duration,
            wait_duration_in_open: self.wait_duration_in_open,
            permitted_calls_in_half_open: self.permitted_calls_in_half_open,
            minimum_number_of_calls: self
                .minimum_number_of_calls
                .unwrap_or(self.sliding_window_size),
            failure_classifier: self.failure_classifier,
            event_listeners: self.event_listeners,
            name: self.name,
            clock: self.clock,
        };

        crate::CircuitBreaker::from_config(config)
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
