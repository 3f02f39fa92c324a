//! Core infrastructure shared by every callguard pattern crate.
//!
//! This crate carries no resilience logic of its own. It provides the four
//! seams the pattern crates are built on:
//!
//! - [`error`]: the unified [`CallError`] taxonomy flowing through a
//!   decorated call, plus the [`CallOutcome`] and [`ErrorKind`]
//!   classifications used by predicates and classifiers.
//! - [`events`]: typed event listeners for observability.
//! - [`clock`]: an injectable time source so deadlines, refills, and
//!   backoff delays are testable.
//! - [`work`]: the type-erased unit of work and the [`Policy`] transform
//!   that pattern crates implement to participate in a decorator chain.

pub mod clock;
pub mod error;
pub mod events;
pub mod work;

pub use clock::{system_clock, Clock, SharedClock, SystemClock};
pub use error::{outcome_of, CallError, CallOutcome, ErrorKind};
pub use events::{EventListener, EventListeners, FnListener, PolicyEvent};
pub use work::{work_fn, Policy, PolicyKind, SharedPolicy, SharedWork, WorkFuture};
