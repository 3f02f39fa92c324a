use callguard_core::PolicyEvent;
use std::time::{Duration, Instant};

/// Events emitted by a time limiter.
#[derive(Debug, Clone)]
pub enum TimeLimiterEvent {
    /// The work completed within the deadline.
    Success {
        pattern_name: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// The work failed within the deadline.
    Error {
        pattern_name: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// The deadline elapsed first.
    Timeout {
        pattern_name: String,
        timestamp: Instant,
        timeout_duration: Duration,
    },
}

impl PolicyEvent for TimeLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TimeLimiterEvent::Success { .. } => "Success",
            TimeLimiterEvent::Error { .. } => "Error",
            TimeLimiterEvent::Timeout { .. } => "Timeout",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            TimeLimiterEvent::Success { timestamp, .. }
            | TimeLimiterEvent::Error { timestamp, .. }
            | TimeLimiterEvent::Timeout { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            TimeLimiterEvent::Success { pattern_name, .. }
            | TimeLimiterEvent::Error { pattern_name, .. }
            | TimeLimiterEvent::Timeout { pattern_name, .. } => pattern_name,
        }
    }
}
