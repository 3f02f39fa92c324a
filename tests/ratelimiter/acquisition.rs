use callguard_core::CallError;
use callguard_ratelimiter::RateLimiter;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One permit per second with no wait allowance: two back-to-back calls
/// yield one success and one rejection.
#[tokio::test]
async fn second_back_to_back_call_is_rejected() {
    let limiter = RateLimiter::builder()
        .limit_for_period(1)
        .limit_refresh_period(Duration::from_secs(1))
        .timeout_duration(Duration::ZERO)
        .name("strict")
        .build();

    let first = limiter.call(|| async { Ok::<_, ()>("ran") }).await;
    let second = limiter.call(|| async { Ok::<_, ()>("ran") }).await;

    assert_eq!(first.unwrap(), "ran");
    assert!(matches!(second, Err(CallError::RateLimited { .. })));
}

/// A burst against a small bucket admits exactly the bucket's capacity.
#[tokio::test]
async fn burst_admits_exactly_the_limit() {
    let limiter = RateLimiter::builder()
        .limit_for_period(3)
        .limit_refresh_period(Duration::from_secs(60))
        .timeout_duration(Duration::ZERO)
        .name("burst")
        .build();

    let admitted = Arc::new(AtomicUsize::new(0));
    for _ in 0..10 {
        let admitted = Arc::clone(&admitted);
        let _ = limiter
            .call(move || async move {
                admitted.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ()>(())
            })
            .await;
    }

    assert_eq!(admitted.load(Ordering::SeqCst), 3);
}

/// A caller with a generous timeout waits for the refill instead of
/// failing.
#[tokio::test]
async fn waits_for_refill_within_timeout() {
    let limiter = RateLimiter::builder()
        .limit_for_period(1)
        .limit_refresh_period(Duration::from_millis(80))
        .timeout_duration(Duration::from_millis(500))
        .name("patient")
        .build();

    limiter.acquire().await.unwrap();

    let start = Instant::now();
    limiter.acquire().await.unwrap();
    let waited = start.elapsed();

    assert!(waited >= Duration::from_millis(40));
    assert!(waited < Duration::from_millis(400));
}

/// When the next token lies beyond the timeout, the caller is rejected
/// immediately rather than sleeping pointlessly.
#[tokio::test]
async fn rejects_immediately_when_wait_exceeds_timeout() {
    let limiter = RateLimiter::builder()
        .limit_for_period(1)
        .limit_refresh_period(Duration::from_secs(60))
        .timeout_duration(Duration::from_millis(50))
        .name("hopeless")
        .build();

    limiter.acquire().await.unwrap();

    let start = Instant::now();
    let result = limiter.acquire().await;
    assert!(result.is_err());
    assert!(start.elapsed() < Duration::from_millis(100));
}

/// Tokens accrue continuously: after half a period, half the permits are
/// back.
#[tokio::test]
async fn refill_is_proportional() {
    let limiter = RateLimiter::builder()
        .limit_for_period(10)
        .limit_refresh_period(Duration::from_millis(200))
        .timeout_duration(Duration::ZERO)
        .name("proportional")
        .build();

    for _ in 0..10 {
        limiter.acquire().await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut regained = 0;
    while limiter.acquire().await.is_ok() {
        regained += 1;
    }
    assert!((3..=7).contains(&regained), "regained {}", regained);
}
