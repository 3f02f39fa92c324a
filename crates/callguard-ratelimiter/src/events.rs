use callguard_core::PolicyEvent;
use std::time::{Duration, Instant};

/// Events emitted by a rate limiter.
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    /// A call consumed a token, possibly after waiting.
    CallPermitted {
        pattern_name: String,
        timestamp: Instant,
        /// How long the caller waited for the token.
        waited: Duration,
    },
    /// No token became available within the timeout.
    CallRejected {
        pattern_name: String,
        timestamp: Instant,
    },
}

impl PolicyEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RateLimiterEvent::CallPermitted { .. } => "CallPermitted",
            RateLimiterEvent::CallRejected { .. } => "CallRejected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateLimiterEvent::CallPermitted { timestamp, .. }
            | RateLimiterEvent::CallRejected { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RateLimiterEvent::CallPermitted { pattern_name, .. }
            | RateLimiterEvent::CallRejected { pattern_name, .. } => pattern_name,
        }
    }
}
