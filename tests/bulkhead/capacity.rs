use callguard_bulkhead::Bulkhead;
use callguard_core::CallError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;
use tokio::time::sleep;

/// N+1 concurrent calls against capacity N with no wait: exactly one
/// rejection and N successes, for a range of N.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_rejection_at_n_plus_one_callers() {
    for n in [1usize, 2, 5] {
        let bulkhead = Bulkhead::builder()
            .max_concurrent_calls(n)
            .name("capacity")
            .build();

        // Admitted calls hold their permit until everyone has tried.
        let release = Arc::new(Barrier::new(n + 1));
        let successes = Arc::new(AtomicUsize::new(0));
        let rejections = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..n + 1 {
            let bulkhead = bulkhead.clone();
            let release = Arc::clone(&release);
            let successes = Arc::clone(&successes);
            let rejections = Arc::clone(&rejections);
            handles.push(tokio::spawn(async move {
                match bulkhead.acquire().await {
                    Ok(permit) => {
                        successes.fetch_add(1, Ordering::SeqCst);
                        release.wait().await;
                        drop(permit);
                    }
                    Err(_) => {
                        rejections.fetch_add(1, Ordering::SeqCst);
                        release.wait().await;
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(successes.load(Ordering::SeqCst), n, "capacity {}", n);
        assert_eq!(rejections.load(Ordering::SeqCst), 1, "capacity {}", n);
    }
}

/// In-flight work never exceeds the configured limit.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_flight_never_exceeds_limit() {
    let limit = 3;
    let bulkhead = Bulkhead::builder()
        .max_concurrent_calls(limit)
        .max_wait_duration(Duration::from_secs(5))
        .name("in-flight")
        .build();

    let in_flight = Arc::new(AtomicUsize::new(0));
    let observed_max = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..12 {
        let bulkhead = bulkhead.clone();
        let in_flight = Arc::clone(&in_flight);
        let observed_max = Arc::clone(&observed_max);
        handles.push(tokio::spawn(async move {
            bulkhead
                .call(move || async move {
                    let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    observed_max.fetch_max(current, Ordering::SeqCst);
                    sleep(Duration::from_millis(20)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, ()>(())
                })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(observed_max.load(Ordering::SeqCst) <= limit);
}

/// The rejection carries the configured capacity.
#[tokio::test]
async fn rejection_reports_capacity() {
    let bulkhead = Bulkhead::builder().max_concurrent_calls(2).build();

    let _a = bulkhead.acquire().await.unwrap();
    let _b = bulkhead.acquire().await.unwrap();

    let result = bulkhead.call(|| async { Ok::<_, ()>(()) }).await;
    match result {
        Err(CallError::BulkheadFull { max_concurrent }) => assert_eq!(max_concurrent, 2),
        other => panic!("unexpected: {:?}", other),
    }
}
