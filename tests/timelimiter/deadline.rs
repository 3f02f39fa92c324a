use callguard_core::CallError;
use callguard_timelimiter::TimeLimiter;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Work sleeping well past the deadline fails near the deadline, not after
/// the work's full duration.
#[tokio::test]
async fn timeout_fires_near_the_deadline() {
    let limiter = TimeLimiter::builder()
        .timeout_duration(Duration::from_millis(100))
        .name("deadline")
        .build();

    let start = Instant::now();
    let result = limiter
        .call(|| async {
            sleep(Duration::from_millis(1000)).await;
            Ok::<_, ()>(())
        })
        .await;
    let elapsed = start.elapsed();

    match result {
        Err(CallError::Timeout { timeout }) => {
            assert_eq!(timeout, Duration::from_millis(100));
        }
        other => panic!("unexpected: {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(600), "waited {:?}", elapsed);
}

/// Fast work is unaffected by the limiter.
#[tokio::test]
async fn fast_work_passes_through() {
    let limiter = TimeLimiter::builder()
        .timeout_duration(Duration::from_millis(200))
        .build();

    let result = limiter
        .call(|| async {
            sleep(Duration::from_millis(10)).await;
            Ok::<_, ()>("quick")
        })
        .await;

    assert_eq!(result.unwrap(), "quick");
}

/// The caller is released at the deadline while the abandoned work runs
/// its course in the background.
#[tokio::test]
async fn caller_released_while_work_continues() {
    let completions = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&completions);

    let limiter = TimeLimiter::builder()
        .timeout_duration(Duration::from_millis(30))
        .cancel_running_work(false)
        .name("detached")
        .build();

    let result = limiter
        .call(move || {
            let c = Arc::clone(&c);
            async move {
                sleep(Duration::from_millis(80)).await;
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ()>(())
            }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(completions.load(Ordering::SeqCst), 0);

    // The abandoned task finishes later; its result is discarded.
    sleep(Duration::from_millis(120)).await;
    assert_eq!(completions.load(Ordering::SeqCst), 1);
}

/// With cancellation enabled the abandoned task is aborted at its next
/// await point.
#[tokio::test]
async fn cancel_running_work_aborts_the_task() {
    let completions = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&completions);

    let limiter = TimeLimiter::builder()
        .timeout_duration(Duration::from_millis(30))
        .cancel_running_work(true)
        .name("aborting")
        .build();

    let result = limiter
        .call(move || {
            let c = Arc::clone(&c);
            async move {
                sleep(Duration::from_millis(80)).await;
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ()>(())
            }
        })
        .await;

    assert!(result.is_err());
    sleep(Duration::from_millis(120)).await;
    assert_eq!(completions.load(Ordering::SeqCst), 0);
}
