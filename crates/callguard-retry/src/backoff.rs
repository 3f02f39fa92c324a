//! Inter-attempt delay strategies.

use rand::Rng;
use std::time::Duration;

/// Computes the delay before a retry.
///
/// `attempt` is 1 for the delay after the first failed attempt, 2 after the
/// second, and so on.
pub trait IntervalFunction: Send + Sync {
    /// The delay to apply before retry number `attempt`.
    fn interval(&self, attempt: usize) -> Duration;
}

/// The same delay between every attempt.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval {
    interval: Duration,
}

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl IntervalFunction for FixedInterval {
    fn interval(&self, _attempt: usize) -> Duration {
        self.interval
    }
}

/// Delay growing by a multiplier each attempt, optionally capped.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Option<Duration>,
}

impl ExponentialBackoff {
    /// Doubling backoff from the given initial interval.
    pub fn new(initial_interval: Duration) -> Self {
        Self {
            initial_interval,
            multiplier: 2.0,
            max_interval: None,
        }
    }

    /// Sets the growth factor per attempt.
    ///
    /// Default: 2.0
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Caps the computed delay.
    pub fn max_interval(mut self, max: Duration) -> Self {
        self.max_interval = Some(max);
        self
    }

    fn raw_interval(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let scaled = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(scaled)
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn interval(&self, attempt: usize) -> Duration {
        let interval = self.raw_interval(attempt);
        match self.max_interval {
            Some(max) => interval.min(max),
            None => interval,
        }
    }
}

/// Exponential backoff with randomized jitter.
///
/// Each delay is scaled by a uniform factor in
/// `[1 - randomization_factor, 1 + randomization_factor]`, which spreads
/// simultaneous retries from many callers apart.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialRandomBackoff {
    base: ExponentialBackoff,
    randomization_factor: f64,
}

impl ExponentialRandomBackoff {
    /// Doubling backoff with a default randomization factor of 0.5.
    pub fn new(initial_interval: Duration) -> Self {
        Self {
            base: ExponentialBackoff::new(initial_interval),
            randomization_factor: 0.5,
        }
    }

    /// Sets the jitter spread, clamped to `[0.0, 1.0]`.
    pub fn randomization_factor(mut self, factor: f64) -> Self {
        self.randomization_factor = factor.clamp(0.0, 1.0);
        self
    }

    /// Sets the growth factor per attempt.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.base = self.base.multiplier(multiplier);
        self
    }

    /// Caps the delay before jitter is applied.
    pub fn max_interval(mut self, max: Duration) -> Self {
        self.base = self.base.max_interval(max);
        self
    }
}

impl IntervalFunction for ExponentialRandomBackoff {
    fn interval(&self, attempt: usize) -> Duration {
        let interval = self.base.interval(attempt);
        let spread = rand::rng().random_range(-self.randomization_factor..=self.randomization_factor);
        Duration::from_secs_f64((interval.as_secs_f64() * (1.0 + spread)).max(0.0))
    }
}

/// A custom closure-based delay strategy.
pub struct FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    f: F,
}

impl<F> FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> IntervalFunction for FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn interval(&self, attempt: usize) -> Duration {
        (self.f)(attempt)
    }
}
