//! Explicit registry of named pattern instances.
//!
//! Circuit state, bulkhead permits, and rate-limiter tokens are shared
//! per named instance. The registry is the owner of that sharing: one map
//! per pattern kind, keyed by name, with get-or-create access. There is no
//! ambient global: callers construct a [`Registry`] themselves and pass
//! references to whoever needs the same instances.
//!
//! ```rust
//! use callguard::Registry;
//! use callguard_circuitbreaker::CircuitBreaker;
//!
//! let registry = Registry::new();
//! let breaker = registry.circuit_breaker("backend", || {
//!     CircuitBreaker::builder().name("backend").build()
//! });
//!
//! // Same name, same shared instance.
//! let again = registry.circuit_breaker("backend", || unreachable!());
//! assert_eq!(breaker.state(), again.state());
//! ```

use callguard_bulkhead::Bulkhead;
use callguard_circuitbreaker::CircuitBreaker;
use callguard_ratelimiter::RateLimiter;
use callguard_retry::Retry;
use callguard_timelimiter::TimeLimiter;
use std::collections::HashMap;
use std::sync::RwLock;

/// Holds one shared instance per (pattern, name).
#[derive(Default)]
pub struct Registry {
    circuit_breakers: RwLock<HashMap<String, CircuitBreaker>>,
    bulkheads: RwLock<HashMap<String, Bulkhead>>,
    rate_limiters: RwLock<HashMap<String, RateLimiter>>,
    time_limiters: RwLock<HashMap<String, TimeLimiter>>,
    retries: RwLock<HashMap<String, Retry>>,
}

macro_rules! accessors {
    ($get_or_create:ident, $get:ident, $names:ident, $field:ident, $ty:ty) => {
        /// Returns the named instance, building it with `create` on first
        /// access. The factory runs at most once per name.
        pub fn $get_or_create(&self, name: &str, create: impl FnOnce() -> $ty) -> $ty {
            if let Some(found) = self.read(&self.$field).get(name) {
                return found.clone();
            }
            let mut map = self.write(&self.$field);
            // A racing creator may have won between the read and the write
            // lock; keep whichever landed first.
            map.entry(name.to_string()).or_insert_with(create).clone()
        }

        /// Returns the named instance, if it exists.
        pub fn $get(&self, name: &str) -> Option<$ty> {
            self.read(&self.$field).get(name).cloned()
        }

        /// The names registered for this pattern.
        pub fn $names(&self) -> Vec<String> {
            let mut names: Vec<_> = self.read(&self.$field).keys().cloned().collect();
            names.sort();
            names
        }
    };
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    accessors!(
        circuit_breaker,
        get_circuit_breaker,
        circuit_breaker_names,
        circuit_breakers,
        CircuitBreaker
    );
    accessors!(bulkhead, get_bulkhead, bulkhead_names, bulkheads, Bulkhead);
    accessors!(
        rate_limiter,
        get_rate_limiter,
        rate_limiter_names,
        rate_limiters,
        RateLimiter
    );
    accessors!(
        time_limiter,
        get_time_limiter,
        time_limiter_names,
        time_limiters,
        TimeLimiter
    );
    accessors!(retry, get_retry, retry_names, retries, Retry);

    fn read<'a, T>(&self, lock: &'a RwLock<T>) -> std::sync::RwLockReadGuard<'a, T> {
        lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write<'a, T>(&self, lock: &'a RwLock<T>) -> std::sync::RwLockWriteGuard<'a, T> {
        lock.write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
