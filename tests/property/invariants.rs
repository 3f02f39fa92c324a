use callguard_circuitbreaker::{CircuitBreaker, CircuitState};
use callguard_core::CallOutcome;
use callguard_ratelimiter::RateLimiter;
use callguard_retry::Retry;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime")
}

proptest! {
    /// The sliding window never tracks more calls than its capacity, for
    /// any sequence of outcomes.
    #[test]
    fn window_never_exceeds_capacity(
        outcomes in prop::collection::vec(any::<bool>(), 0..200),
        capacity in 1usize..20,
    ) {
        let breaker = CircuitBreaker::builder()
            .failure_rate_threshold(1.1) // never trips; isolates the window
            .sliding_window_size(capacity)
            .minimum_number_of_calls(usize::MAX)
            .build();

        for is_failure in outcomes {
            prop_assume!(breaker.try_acquire());
            breaker.record(if is_failure {
                CallOutcome::Failure
            } else {
                CallOutcome::Success
            });
            prop_assert!(breaker.metrics().total_calls <= capacity);
        }
    }

    /// Available tokens stay within [0, capacity] under any acquire
    /// pattern.
    #[test]
    fn token_count_stays_in_bounds(
        attempts in 1usize..60,
        limit in 1usize..10,
    ) {
        let limiter = RateLimiter::builder()
            .limit_for_period(limit)
            .limit_refresh_period(Duration::from_millis(50))
            .timeout_duration(Duration::ZERO)
            .build();

        runtime().block_on(async {
            for _ in 0..attempts {
                let _ = limiter.acquire().await;
                let available = limiter.available_permits();
                assert!(available >= 0.0, "negative tokens: {}", available);
                assert!(
                    available <= limit as f64,
                    "over capacity: {} > {}",
                    available,
                    limit
                );
            }
        });
    }

    /// Invocations equal min(failures + 1, max_attempts) for work that
    /// fails a fixed number of times.
    #[test]
    fn retry_invocation_count_is_exact(
        failures in 0usize..6,
        max_attempts in 1usize..6,
    ) {
        let retry = Retry::builder()
            .max_attempts(max_attempts)
            .fixed_backoff(Duration::ZERO)
            .build();

        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);

        let result = runtime().block_on(retry.call(move || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < failures {
                    Err("transient")
                } else {
                    Ok(())
                }
            }
        }));

        let expected = (failures + 1).min(max_attempts);
        prop_assert_eq!(calls.load(Ordering::SeqCst), expected);
        prop_assert_eq!(result.is_ok(), failures + 1 <= max_attempts);
    }

    /// However the breaker is driven, its state is always one of the three
    /// legal states and metrics stay self-consistent.
    #[test]
    fn breaker_metrics_are_consistent(
        outcomes in prop::collection::vec(any::<bool>(), 1..100),
    ) {
        let breaker = CircuitBreaker::builder()
            .failure_rate_threshold(0.5)
            .sliding_window_size(10)
            .minimum_number_of_calls(5)
            .wait_duration_in_open_state(Duration::from_secs(60))
            .build();

        for is_failure in outcomes {
            if breaker.try_acquire() {
                breaker.record(if is_failure {
                    CallOutcome::Failure
                } else {
                    CallOutcome::Success
                });
            }

            let metrics = breaker.metrics();
            prop_assert!(metrics.failure_count <= metrics.total_calls);
            prop_assert!((0.0..=1.0).contains(&metrics.failure_rate));
            prop_assert!(matches!(
                metrics.state,
                CircuitState::Closed | CircuitState::Open | CircuitState::HalfOpen
            ));
        }
    }
}
