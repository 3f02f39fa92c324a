use std::time::{Duration, Instant};

/// Token bucket with continuous lazy refill.
///
/// Tokens accrue at `limit_for_period / limit_refresh_period` and are
/// topped up from elapsed time on every acquisition attempt. The count is
/// fractional so short periods refill smoothly; it never drops below zero
/// and never exceeds the bucket capacity.
#[derive(Debug)]
pub(crate) struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a full bucket.
    pub fn new(limit_for_period: usize, refresh_period: Duration, now: Instant) -> Self {
        let capacity = limit_for_period as f64;
        let period_secs = refresh_period.as_secs_f64().max(f64::MIN_POSITIVE);
        Self {
            capacity,
            refill_per_sec: capacity / period_secs,
            tokens: capacity,
            last_refill: now,
        }
    }

    /// Consumes one token if available; otherwise returns how long until
    /// one accrues.
    pub fn try_acquire(&mut self, now: Instant) -> Result<(), Duration> {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - self.tokens;
            Err(Duration::from_secs_f64(deficit / self.refill_per_sec))
        }
    }

    pub fn available(&mut self, now: Instant) -> f64 {
        self.refill(now);
        self.tokens
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.refill_per_sec)
            .min(self.capacity);
        self.last_refill = now;
    }
}
