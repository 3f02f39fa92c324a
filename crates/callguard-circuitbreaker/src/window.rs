//! Sliding window of recent call outcomes.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// One recorded call in a time-based window.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TimedRecord {
    at: Instant,
    is_failure: bool,
}

/// Aggregate view of a window's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WindowStats {
    pub total: usize,
    pub failures: usize,
}

impl WindowStats {
    pub fn failure_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.failures as f64 / self.total as f64
        }
    }
}

/// Tracks the most recent call outcomes, either by count or by age.
///
/// The count-based variant is a true ring buffer: inserting into a full
/// window evicts the oldest record, so the failure rate is always computed
/// over the newest `capacity` calls. The time-based variant evicts records
/// older than the window duration on every access.
#[derive(Debug)]
pub(crate) enum SlidingWindow {
    Count {
        records: VecDeque<bool>,
        capacity: usize,
    },
    Time {
        records: VecDeque<TimedRecord>,
        duration: Duration,
    },
}

impl SlidingWindow {
    pub fn count_based(capacity: usize) -> Self {
        SlidingWindow::Count {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn time_based(duration: Duration) -> Self {
        SlidingWindow::Time {
            records: VecDeque::new(),
            duration,
        }
    }

    /// Records one outcome, evicting the oldest entry if the window is full.
    pub fn record(&mut self, is_failure: bool, now: Instant) {
        match self {
            SlidingWindow::Count { records, capacity } => {
                if records.len() == *capacity {
                    records.pop_front();
                }
                records.push_back(is_failure);
            }
            SlidingWindow::Time { records, duration } => {
                Self::evict_expired(records, *duration, now);
                records.push_back(TimedRecord {
                    at: now,
                    is_failure,
                });
            }
        }
    }

    pub fn stats(&mut self, now: Instant) -> WindowStats {
        match self {
            SlidingWindow::Count { records, .. } => WindowStats {
                total: records.len(),
                failures: records.iter().filter(|f| **f).count(),
            },
            SlidingWindow::Time { records, duration } => {
                Self::evict_expired(records, *duration, now);
                WindowStats {
                    total: records.len(),
                    failures: records.iter().filter(|r| r.is_failure).count(),
                }
            }
        }
    }

    pub fn clear(&mut self) {
        match self {
            SlidingWindow::Count { records, .. } => records.clear(),
            SlidingWindow::Time { records, .. } => records.clear(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SlidingWindow::Count { records, .. } => records.len(),
            SlidingWindow::Time { records, .. } => records.len(),
        }
    }

    fn evict_expired(records: &mut VecDeque<TimedRecord>, duration: Duration, now: Instant) {
        while let Some(record) = records.front() {
            if now.duration_since(record.at) > duration {
                records.pop_front();
            } else {
                break;
            }
        }
    }
}
