//! Composing policies into a decorated call.
//!
//! A [`DecoratedCall`] is built once from a unit of work, a set of
//! policies, and an optional fallback, then invoked any number of times
//! from any number of tasks. Policies are applied by explicit iteration at
//! build time: the chain is a flat fold over the policy list, not a stack
//! of closures rebuilt per invocation.
//!
//! The nesting order is canonical and independent of the order policies
//! are supplied in: retry outermost, then circuit breaker, bulkhead, rate
//! limiter, and time limiter around the raw work. Two consequences worth
//! knowing:
//!
//! - the retry observes rejections from every layer below it, and by
//!   default refuses to retry them;
//! - each retry attempt re-enters the inner layers, consuming a fresh
//!   bulkhead permit and rate-limiter token.

use callguard_core::{CallError, SharedPolicy, SharedWork};
use std::future::Future;
use std::sync::Arc;

/// Produces a replacement value from the terminal failure of a chain.
///
/// A fallback cannot itself fail; if it panics, the panic propagates to
/// the caller.
pub type FallbackFn<T, E> = Arc<dyn Fn(&CallError<E>) -> T + Send + Sync>;

/// An immutable, concurrently invocable chain of policies around a unit of
/// work.
///
/// Each invocation gets its own retry bookkeeping; circuit state, bulkhead
/// permits, and rate-limiter tokens are shared across all invocations of
/// all chains holding the same policy instances.
pub struct DecoratedCall<T, E> {
    work: SharedWork<T, E>,
    fallback: Option<FallbackFn<T, E>>,
}

impl<T, E> DecoratedCall<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Starts a builder around a unit of work.
    pub fn builder<F, Fut>(work: F) -> DecoratedCallBuilder<T, E>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        DecoratedCallBuilder {
            work: callguard_core::work_fn(work),
            policies: Vec::new(),
            fallback: None,
        }
    }

    /// Runs the chain once.
    pub async fn invoke(&self) -> Result<T, CallError<E>> {
        match (self.work)().await {
            Ok(value) => Ok(value),
            Err(error) => match &self.fallback {
                Some(fallback) => Ok(fallback(&error)),
                None => Err(error),
            },
        }
    }
}

impl<T, E> Clone for DecoratedCall<T, E> {
    fn clone(&self) -> Self {
        Self {
            work: Arc::clone(&self.work),
            fallback: self.fallback.clone(),
        }
    }
}

/// Builder for [`DecoratedCall`].
pub struct DecoratedCallBuilder<T, E> {
    work: SharedWork<T, E>,
    policies: Vec<SharedPolicy<T, E>>,
    fallback: Option<FallbackFn<T, E>>,
}

impl<T, E> DecoratedCallBuilder<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Adds one policy to the chain.
    pub fn policy(mut self, policy: SharedPolicy<T, E>) -> Self {
        self.policies.push(policy);
        self
    }

    /// Adds several policies to the chain.
    pub fn policies<I>(mut self, policies: I) -> Self
    where
        I: IntoIterator<Item = SharedPolicy<T, E>>,
    {
        self.policies.extend(policies);
        self
    }

    /// Recovers any terminal failure with a replacement value.
    pub fn fallback<F>(mut self, f: F) -> Self
    where
        F: Fn(&CallError<E>) -> T + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(f));
        self
    }

    /// Composes the chain.
    ///
    /// Policies are stably sorted into canonical nesting order and folded
    /// around the work innermost-first. Duplicates of a kind nest
    /// adjacently, the later-supplied one outermost.
    pub fn build(self) -> DecoratedCall<T, E> {
        let mut policies = self.policies;
        policies.sort_by_key(|p| std::cmp::Reverse(p.kind().nesting_rank()));

        let mut work = self.work;
        for policy in &policies {
            work = policy.wrap(work);
        }

        DecoratedCall {
            work,
            fallback: self.fallback,
        }
    }
}

/// Builds a decorated call in one expression.
///
/// This is the toolkit's single entry point for external callers: supply
/// the unit of work, the policies to apply (in any order), and optionally a
/// fallback.
///
/// ```rust
/// use callguard::decorate;
/// use callguard_core::CallError;
/// use callguard_retry::Retry;
/// use std::sync::Arc;
///
/// # async fn example() {
/// let retry = Retry::builder().max_attempts(3).build();
///
/// let call = decorate(
///     || async { Ok::<_, std::io::Error>("hello".to_string()) },
///     vec![Arc::new(retry)],
///     Some(Arc::new(|_failure: &CallError<std::io::Error>| "fallback".to_string())),
/// );
/// # let _ = call;
/// # }
/// ```
pub fn decorate<T, E, F, Fut>(
    work: F,
    policies: Vec<SharedPolicy<T, E>>,
    fallback: Option<FallbackFn<T, E>>,
) -> DecoratedCall<T, E>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let mut builder = DecoratedCall::builder(work).policies(policies);
    if let Some(fallback) = fallback {
        builder.fallback = Some(fallback);
    }
    builder.build()
}
