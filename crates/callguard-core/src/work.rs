//! The unit of work and the policy transform.
//!
//! A unit of work is a zero-argument async operation, type-erased into a
//! [`SharedWork`] so it can be invoked any number of times (a retry policy
//! re-invokes it, and a chain is invoked by many concurrent callers).
//! A resilience pattern participates in a chain by implementing [`Policy`]:
//! a transform from one `SharedWork` to another that adds its behavior
//! around the inner work.

use crate::error::CallError;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// The future produced by one invocation of a unit of work.
pub type WorkFuture<T, E> = BoxFuture<'static, Result<T, CallError<E>>>;

/// A re-invocable, type-erased unit of work.
pub type SharedWork<T, E> = Arc<dyn Fn() -> WorkFuture<T, E> + Send + Sync>;

/// Erases an async closure over `Result<T, E>` into a [`SharedWork`].
///
/// The closure's own failure type is lifted into [`CallError::Work`];
/// policy layers wrap the result from there.
///
/// ```
/// use callguard_core::work_fn;
///
/// let work = work_fn(|| async { Ok::<_, std::io::Error>(42u32) });
/// ```
pub fn work_fn<T, E, F, Fut>(f: F) -> SharedWork<T, E>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: 'static,
    E: 'static,
{
    Arc::new(move || {
        let fut = f();
        Box::pin(async move { fut.await.map_err(CallError::Work) })
    })
}

/// The pattern a policy value represents, in canonical nesting order.
///
/// A chain always nests `Retry` outermost, then `CircuitBreaker`,
/// `Bulkhead`, `RateLimiter`, and `TimeLimiter` innermost, regardless of
/// the order policies were supplied in. Outer layers therefore observe the
/// outcomes of everything nested inside them; in particular a retry sees
/// the rejections of the layers below it, and by default refuses to retry
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PolicyKind {
    /// Re-invokes the work on qualifying failures.
    Retry,
    /// Rejects fast while the tracked failure rate is too high.
    CircuitBreaker,
    /// Bounds concurrent in-flight work.
    Bulkhead,
    /// Bounds call rate with a token bucket.
    RateLimiter,
    /// Races the work against a deadline.
    TimeLimiter,
}

impl PolicyKind {
    /// Position in the canonical nesting, `0` being outermost.
    pub fn nesting_rank(&self) -> u8 {
        match self {
            PolicyKind::Retry => 0,
            PolicyKind::CircuitBreaker => 1,
            PolicyKind::Bulkhead => 2,
            PolicyKind::RateLimiter => 3,
            PolicyKind::TimeLimiter => 4,
        }
    }
}

/// A resilience pattern applied as a work-to-work transform.
///
/// Implementations hold their shared state (window, permits, tokens)
/// internally behind an `Arc`. One instance wrapped into several chains,
/// or one chain invoked concurrently, shares that state.
pub trait Policy<T, E>: Send + Sync {
    /// Which pattern this policy is, for canonical ordering.
    fn kind(&self) -> PolicyKind;

    /// Wraps the inner work with this policy's behavior.
    fn wrap(&self, inner: SharedWork<T, E>) -> SharedWork<T, E>;
}

/// A shareable policy handle.
pub type SharedPolicy<T, E> = Arc<dyn Policy<T, E>>;
