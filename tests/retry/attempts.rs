use callguard_core::CallError;
use callguard_retry::{ExponentialBackoff, FixedInterval, IntervalFunction, Retry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn counting_work(
    calls: &Arc<AtomicUsize>,
    fail_first: usize,
) -> impl Fn() -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<&'static str, &'static str>> + Send>>
{
    let calls = Arc::clone(calls);
    move || {
        let calls = Arc::clone(&calls);
        Box::pin(async move {
            if calls.fetch_add(1, Ordering::SeqCst) < fail_first {
                Err("transient")
            } else {
                Ok("done")
            }
        })
    }
}

/// Fails twice then succeeds: three invocations total and the success
/// comes back.
#[tokio::test]
async fn two_failures_then_success() {
    let calls = Arc::new(AtomicUsize::new(0));
    let retry = Retry::builder()
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(5))
        .name("recovering")
        .build();

    let result = retry.call(counting_work(&calls, 2)).await;

    assert_eq!(result.unwrap(), "done");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

/// Always fails: exactly three invocations, then `RetryExhausted` wrapping
/// the last cause.
#[tokio::test]
async fn exhaustion_after_exactly_max_attempts() {
    let calls = Arc::new(AtomicUsize::new(0));
    let retry = Retry::builder()
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(5))
        .name("exhausting")
        .build();

    let result = retry.call(counting_work(&calls, usize::MAX)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    match result {
        Err(CallError::RetryExhausted { attempts, cause }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(*cause, CallError::Work("transient")));
        }
        other => panic!("unexpected: {:?}", other),
    }
}

/// Success on the first attempt never sleeps or re-invokes.
#[tokio::test]
async fn immediate_success_is_single_shot() {
    let calls = Arc::new(AtomicUsize::new(0));
    let retry = Retry::builder()
        .max_attempts(5)
        .fixed_backoff(Duration::from_secs(10))
        .build();

    let start = Instant::now();
    let result = retry.call(counting_work(&calls, 0)).await;

    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(start.elapsed() < Duration::from_secs(1));
}

/// The configured backoff actually spaces the attempts apart.
#[tokio::test]
async fn fixed_backoff_spaces_attempts() {
    let calls = Arc::new(AtomicUsize::new(0));
    let retry = Retry::builder()
        .max_attempts(3)
        .fixed_backoff(Duration::from_millis(40))
        .build();

    let start = Instant::now();
    let _ = retry.call(counting_work(&calls, usize::MAX)).await;

    // Two inter-attempt delays of 40 ms each.
    assert!(start.elapsed() >= Duration::from_millis(80));
}

/// Exponential backoff grows per attempt and respects its cap.
#[test]
fn exponential_schedule() {
    let backoff = ExponentialBackoff::new(Duration::from_millis(100));
    assert_eq!(backoff.interval(1), Duration::from_millis(100));
    assert_eq!(backoff.interval(2), Duration::from_millis(200));
    assert_eq!(backoff.interval(3), Duration::from_millis(400));

    let capped = ExponentialBackoff::new(Duration::from_millis(100))
        .max_interval(Duration::from_millis(250));
    assert_eq!(capped.interval(3), Duration::from_millis(250));

    let fixed = FixedInterval::new(Duration::from_millis(500));
    assert_eq!(fixed.interval(9), Duration::from_millis(500));
}
