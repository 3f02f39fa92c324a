use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
use crate::window::SlidingWindow;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// The state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum CircuitState {
    /// Calls are allowed and outcomes are tracked.
    Closed = 0,
    /// Calls are rejected without being invoked.
    Open = 1,
    /// A limited number of trial calls probe for recovery.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    #[cfg(feature = "metrics")]
    fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        }
    }
}

/// Point-in-time snapshot of a breaker's tracked statistics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CircuitMetrics {
    /// Current state.
    pub state: CircuitState,
    /// Calls currently tracked in the sliding window.
    pub total_calls: usize,
    /// Failures among the tracked calls.
    pub failure_count: usize,
    /// Failure rate over the tracked calls, 0.0 to 1.0.
    pub failure_rate: f64,
    /// Time since the breaker last changed state.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub time_since_state_change: std::time::Duration,
}

/// The state machine. Lives behind the breaker's mutex; every method here
/// runs with that lock held and none of them await.
pub(crate) struct Circuit {
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    last_state_change: Instant,
    window: SlidingWindow,
    // Trial accounting while half-open. Permits are counted when issued,
    // not when the trial completes, so concurrent callers cannot exceed
    // the trial budget.
    half_open_issued: usize,
    half_open_successes: usize,
}

impl Circuit {
    pub fn new(
        config: &CircuitBreakerConfig,
        state_atomic: Arc<AtomicU8>,
    ) -> Self {
        Self {
            state: CircuitState::Closed,
            state_atomic,
            last_state_change: config.clock.now(),
            window: config.new_window(),
            half_open_issued: 0,
            half_open_successes: 0,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn metrics(&mut self, config: &CircuitBreakerConfig) -> CircuitMetrics {
        let now = config.clock.now();
        let stats = self.window.stats(now);
        CircuitMetrics {
            state: self.state,
            total_calls: stats.total,
            failure_count: stats.failures,
            failure_rate: stats.failure_rate(),
            time_since_state_change: now.duration_since(self.last_state_change),
        }
    }

    /// Decides whether a call may proceed, transitioning Open → HalfOpen
    /// once the wait duration has elapsed.
    pub fn try_acquire(&mut self, config: &CircuitBreakerConfig) -> bool {
        let now = config.clock.now();
        match self.state {
            CircuitState::Closed => {
                self.emit_permitted(config, now);
                true
            }
            CircuitState::Open => {
                if now.duration_since(self.last_state_change) >= config.wait_duration_in_open {
                    self.transition_to(CircuitState::HalfOpen, config);
                    self.half_open_issued = 1;
                    self.emit_permitted(config, now);
                    true
                } else {
                    self.emit_rejected(config, now);
                    false
                }
            }
            CircuitState::HalfOpen => {
                if self.half_open_issued < config.permitted_calls_in_half_open {
                    self.half_open_issued += 1;
                    self.emit_permitted(config, now);
                    true
                } else {
                    self.emit_rejected(config, now);
                    false
                }
            }
        }
    }

    /// Records the outcome of a permitted call and applies transitions.
    pub fn record(&mut self, is_failure: bool, config: &CircuitBreakerConfig) {
        let now = config.clock.now();
        self.window.record(is_failure, now);

        let event = if is_failure {
            CircuitBreakerEvent::FailureRecorded {
                pattern_name: config.name.clone(),
                timestamp: now,
                state: self.state,
            }
        } else {
            CircuitBreakerEvent::SuccessRecorded {
                pattern_name: config.name.clone(),
                timestamp: now,
                state: self.state,
            }
        };
        config.event_listeners.emit(&event);

        #[cfg(feature = "metrics")]
        counter!(
            "circuitbreaker_calls_total",
            "circuitbreaker" => config.name.clone(),
            "outcome" => if is_failure { "failure" } else { "success" }
        )
        .increment(1);

        match self.state {
            CircuitState::HalfOpen => {
                if is_failure {
                    // A failed trial reopens immediately and restarts the wait.
                    self.transition_to(CircuitState::Open, config);
                } else {
                    self.half_open_successes += 1;
                    if self.half_open_successes >= config.permitted_calls_in_half_open {
                        self.transition_to(CircuitState::Closed, config);
                    }
                }
            }
            CircuitState::Closed => self.evaluate_window(config),
            CircuitState::Open => {}
        }
    }

    pub fn force_open(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Open, config);
    }

    pub fn force_closed(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
    }

    pub fn reset(&mut self, config: &CircuitBreakerConfig) {
        self.transition_to(CircuitState::Closed, config);
    }

    fn evaluate_window(&mut self, config: &CircuitBreakerConfig) {
        let stats = self.window.stats(config.clock.now());
        if stats.total < config.minimum_number_of_calls {
            return;
        }
        if stats.failure_rate() >= config.failure_rate_threshold {
            self.transition_to(CircuitState::Open, config);
        }
    }

    fn transition_to(&mut self, state: CircuitState, config: &CircuitBreakerConfig) {
        if self.state == state {
            return;
        }

        let from_state = self.state;
        config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                pattern_name: config.name.clone(),
                timestamp: config.clock.now(),
                from_state,
                to_state: state,
            });

        #[cfg(feature = "tracing")]
        tracing::info!(
            circuitbreaker = %config.name,
            from = ?from_state,
            to = ?state,
            "circuit state transition"
        );

        #[cfg(feature = "metrics")]
        {
            counter!(
                "circuitbreaker_transitions_total",
                "circuitbreaker" => config.name.clone(),
                "from" => from_state.as_str(),
                "to" => state.as_str()
            )
            .increment(1);
            gauge!(
                "circuitbreaker_state",
                "circuitbreaker" => config.name.clone(),
                "state" => state.as_str()
            )
            .set(1.0);
        }

        self.state = state;
        self.state_atomic.store(state as u8, Ordering::Release);
        self.last_state_change = config.clock.now();
        self.half_open_issued = 0;
        self.half_open_successes = 0;
        self.window.clear();
    }

    fn emit_permitted(&self, config: &CircuitBreakerConfig, now: Instant) {
        config
            .event_listeners
            .emit(&CircuitBreakerEvent::CallPermitted {
                pattern_name: config.name.clone(),
                timestamp: now,
                state: self.state,
            });
    }

    fn emit_rejected(&self, config: &CircuitBreakerConfig, now: Instant) {
        config
            .event_listeners
            .emit(&CircuitBreakerEvent::CallRejected {
                pattern_name: config.name.clone(),
                timestamp: now,
            });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_rejected_total", "circuitbreaker" => config.name.clone())
            .increment(1);
    }
}
