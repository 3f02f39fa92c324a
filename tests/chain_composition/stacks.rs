use callguard::{decorate, DecoratedCall};
use callguard_bulkhead::Bulkhead;
use callguard_circuitbreaker::{CircuitBreaker, CircuitState};
use callguard_core::{CallError, SharedPolicy};
use callguard_ratelimiter::RateLimiter;
use callguard_retry::Retry;
use callguard_timelimiter::TimeLimiter;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// The full five-policy stack passes a healthy call straight through.
#[tokio::test]
async fn full_stack_happy_path() {
    let policies: Vec<SharedPolicy<&str, &str>> = vec![
        Arc::new(
            Retry::builder()
                .max_attempts(3)
                .fixed_backoff(Duration::from_millis(5))
                .build(),
        ),
        Arc::new(CircuitBreaker::builder().name("stack").build()),
        Arc::new(Bulkhead::builder().max_concurrent_calls(4).build()),
        Arc::new(
            RateLimiter::builder()
                .limit_for_period(100)
                .limit_refresh_period(Duration::from_secs(1))
                .build(),
        ),
        Arc::new(
            TimeLimiter::builder()
                .timeout_duration(Duration::from_millis(500))
                .build(),
        ),
    ];

    let call = decorate(|| async { Ok::<_, &str>("healthy") }, policies, None);
    assert_eq!(call.invoke().await.unwrap(), "healthy");
}

/// An outer retry re-attempts after an inner timeout, and each attempt
/// consumes a fresh rate-limiter token.
#[tokio::test]
async fn retry_reattempts_inner_timeouts() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let i = Arc::clone(&invocations);

    let tokens_spent = Arc::new(AtomicUsize::new(0));
    let t = Arc::clone(&tokens_spent);

    let limiter = RateLimiter::builder()
        .limit_for_period(10)
        .limit_refresh_period(Duration::from_secs(1))
        .timeout_duration(Duration::ZERO)
        .on_call_permitted(move |_| {
            t.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    let policies: Vec<SharedPolicy<(), &str>> = vec![
        Arc::new(
            Retry::builder()
                .max_attempts(3)
                .fixed_backoff(Duration::from_millis(5))
                .build(),
        ),
        Arc::new(limiter),
        Arc::new(
            TimeLimiter::builder()
                .timeout_duration(Duration::from_millis(20))
                .cancel_running_work(true)
                .build(),
        ),
    ];

    let call = decorate(
        move || {
            let i = Arc::clone(&i);
            async move {
                i.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_millis(200)).await;
                Ok::<_, &str>(())
            }
        },
        policies,
        None,
    );

    let result = call.invoke().await;
    match result {
        Err(CallError::RetryExhausted { attempts, cause }) => {
            assert_eq!(attempts, 3);
            assert!(cause.is_timeout());
        }
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(invocations.load(Ordering::SeqCst), 3);
    assert_eq!(tokens_spent.load(Ordering::SeqCst), 3);
}

/// Retry does not burn attempts on circuit-open rejections.
#[tokio::test]
async fn retry_gives_up_on_open_circuit() {
    let breaker = CircuitBreaker::builder()
        .failure_rate_threshold(0.5)
        .sliding_window_size(2)
        .minimum_number_of_calls(2)
        .wait_duration_in_open_state(Duration::from_secs(60))
        .name("tripped")
        .build();
    breaker.force_open();
    assert_eq!(breaker.state(), CircuitState::Open);

    let invocations = Arc::new(AtomicUsize::new(0));
    let i = Arc::clone(&invocations);

    let policies: Vec<SharedPolicy<(), &str>> = vec![
        Arc::new(
            Retry::builder()
                .max_attempts(5)
                .fixed_backoff(Duration::from_millis(5))
                .build(),
        ),
        Arc::new(breaker),
    ];

    let call = decorate(
        move || {
            let i = Arc::clone(&i);
            async move {
                i.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &str>(())
            }
        },
        policies,
        None,
    );

    let result = call.invoke().await;
    assert!(matches!(result, Err(CallError::CircuitOpen { .. })));
    assert_eq!(invocations.load(Ordering::SeqCst), 0);
}

/// The circuit breaker observes and records inner timeouts, eventually
/// tripping on them.
#[tokio::test]
async fn breaker_trips_on_repeated_timeouts() {
    let breaker = CircuitBreaker::builder()
        .failure_rate_threshold(0.5)
        .sliding_window_size(2)
        .minimum_number_of_calls(2)
        .wait_duration_in_open_state(Duration::from_secs(60))
        .name("timeout-watcher")
        .build();

    let policies: Vec<SharedPolicy<(), &str>> = vec![
        Arc::new(breaker.clone()),
        Arc::new(
            TimeLimiter::builder()
                .timeout_duration(Duration::from_millis(10))
                .cancel_running_work(true)
                .build(),
        ),
    ];

    let call = decorate(
        || async {
            sleep(Duration::from_millis(100)).await;
            Ok::<_, &str>(())
        },
        policies,
        None,
    );

    let _ = call.invoke().await;
    let _ = call.invoke().await;

    assert_eq!(breaker.state(), CircuitState::Open);
}

/// A chain invoked concurrently shares the bulkhead: total in-flight work
/// stays bounded even across invocations.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_invocations_share_bulkhead() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let observed_max = Arc::new(AtomicUsize::new(0));

    let policies: Vec<SharedPolicy<(), &str>> = vec![Arc::new(
        Bulkhead::builder()
            .max_concurrent_calls(2)
            .max_wait_duration(Duration::from_secs(5))
            .build(),
    )];

    let flight = Arc::clone(&in_flight);
    let max = Arc::clone(&observed_max);
    let call = Arc::new(decorate(
        move || {
            let flight = Arc::clone(&flight);
            let max = Arc::clone(&max);
            async move {
                let current = flight.fetch_add(1, Ordering::SeqCst) + 1;
                max.fetch_max(current, Ordering::SeqCst);
                sleep(Duration::from_millis(20)).await;
                flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, &str>(())
            }
        },
        policies,
        None,
    ));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let call: Arc<DecoratedCall<(), &str>> = Arc::clone(&call);
        handles.push(tokio::spawn(async move { call.invoke().await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(observed_max.load(Ordering::SeqCst) <= 2);
}
