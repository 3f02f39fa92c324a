use callguard::{decorate, Registry};
use callguard_circuitbreaker::{CircuitBreaker, CircuitState};
use callguard_core::SharedPolicy;
use std::sync::Arc;
use std::time::Duration;

fn tight_breaker(name: &str) -> CircuitBreaker {
    CircuitBreaker::builder()
        .name(name)
        .failure_rate_threshold(0.5)
        .sliding_window_size(2)
        .minimum_number_of_calls(2)
        .wait_duration_in_open_state(Duration::from_secs(60))
        .build()
}

/// Two chains built from the same registry name share one circuit: what
/// one chain's failures trip, the other chain observes.
#[tokio::test]
async fn chains_share_named_breaker_state() {
    let registry = Registry::new();

    let breaker_a = registry.circuit_breaker("backend", || tight_breaker("backend"));
    let breaker_b = registry.circuit_breaker("backend", || unreachable!());

    let failing_policies: Vec<SharedPolicy<(), &str>> = vec![Arc::new(breaker_a)];
    let failing = decorate(
        || async { Err::<(), _>("down") },
        failing_policies,
        None,
    );

    let healthy_policies: Vec<SharedPolicy<(), &str>> = vec![Arc::new(breaker_b)];
    let healthy = decorate(|| async { Ok::<_, &str>(()) }, healthy_policies, None);

    let _ = failing.invoke().await;
    let _ = failing.invoke().await;

    // The healthy chain is rejected by the circuit the failing chain
    // tripped.
    assert!(healthy.invoke().await.is_err());
    assert_eq!(
        registry.get_circuit_breaker("backend").unwrap().state(),
        CircuitState::Open
    );
}

/// Different names are fully independent instances.
#[tokio::test]
async fn distinct_names_are_isolated() {
    let registry = Registry::new();

    let a = registry.circuit_breaker("service-a", || tight_breaker("service-a"));
    let b = registry.circuit_breaker("service-b", || tight_breaker("service-b"));

    a.force_open();
    assert_eq!(a.state(), CircuitState::Open);
    assert_eq!(b.state(), CircuitState::Closed);
}
