use callguard_core::PolicyEvent;
use std::time::{Duration, Instant};

/// Events emitted by a retry policy.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// A retry is about to be made after the given delay.
    RetryScheduled {
        pattern_name: String,
        timestamp: Instant,
        /// The attempt that just failed (1-indexed).
        attempt: usize,
        delay: Duration,
    },
    /// The call succeeded, on the first attempt or a later one.
    Success {
        pattern_name: String,
        timestamp: Instant,
        /// Total attempts made, including the first.
        attempts: usize,
    },
    /// All attempts failed.
    Exhausted {
        pattern_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// A failure was not retried because the predicate excluded it.
    IgnoredFailure {
        pattern_name: String,
        timestamp: Instant,
    },
}

impl PolicyEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::RetryScheduled { .. } => "RetryScheduled",
            RetryEvent::Success { .. } => "Success",
            RetryEvent::Exhausted { .. } => "Exhausted",
            RetryEvent::IgnoredFailure { .. } => "IgnoredFailure",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::RetryScheduled { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Exhausted { timestamp, .. }
            | RetryEvent::IgnoredFailure { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RetryEvent::RetryScheduled { pattern_name, .. }
            | RetryEvent::Success { pattern_name, .. }
            | RetryEvent::Exhausted { pattern_name, .. }
            | RetryEvent::IgnoredFailure { pattern_name, .. } => pattern_name,
        }
    }
}
