//! Injectable time source.
//!
//! Every pattern reads the current instant and schedules delays through a
//! [`Clock`] taken from its config, so open-state waits, token refills,
//! backoff sleeps, and deadlines can be driven by a test clock. The default
//! [`SystemClock`] delegates to `tokio::time`, which means tests running
//! under `tokio::time::pause` control it as well.

use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A source of time and delay scheduling.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;

    /// A future resolving after `duration`.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// The default clock: `Instant::now` and `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// A shareable clock handle.
pub type SharedClock = Arc<dyn Clock>;

/// Returns a shared [`SystemClock`].
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}
