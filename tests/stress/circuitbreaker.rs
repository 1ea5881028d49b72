//! Circuit breaker stress tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use storeguard::circuitbreaker::{CircuitBreaker, CircuitBreakerEvent, CircuitState};

/// Test: 1 million admit/record cycles on a closed breaker
#[tokio::test]
#[ignore]
async fn stress_one_million_decisions() {
    let breaker = CircuitBreaker::builder().name("stress").build();

    let start = Instant::now();
    for _ in 0..1_000_000 {
        assert!(breaker.should_allow());
        breaker.record_success();
    }
    let elapsed = start.elapsed();

    println!("1M decisions completed in {:?}", elapsed);
    println!(
        "Throughput: {:.0} decisions/sec",
        1_000_000.0 / elapsed.as_secs_f64()
    );
    assert_eq!(breaker.state(), CircuitState::Closed);
}

/// Test: many tasks racing for the half-open trial slot
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn stress_half_open_admits_one_trial() {
    for round in 0..50 {
        let breaker = CircuitBreaker::builder()
            .failure_threshold(1)
            .cooldown(Duration::from_millis(5))
            .build();
        breaker.record_failure();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let admitted = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::with_capacity(500);
        for _ in 0..500 {
            let breaker = breaker.clone();
            let admitted = Arc::clone(&admitted);
            handles.push(tokio::spawn(async move {
                if breaker.should_allow() {
                    admitted.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 1, "round {round}");
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }
}

/// Test: concurrent failures from many tasks open the circuit exactly once
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn stress_concurrent_failures_single_transition() {
    let opened = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&opened);
    let breaker = CircuitBreaker::builder()
        .failure_threshold(100)
        .on_event(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::StateTransition {
                to_state: CircuitState::Open,
                ..
            } = event
            {
                counted.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build();

    let mut handles = Vec::with_capacity(1_000);
    for _ in 0..1_000 {
        let breaker = breaker.clone();
        handles.push(tokio::spawn(async move { breaker.record_failure() }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(breaker.status().failure_count, 1_000);
    assert_eq!(opened.load(Ordering::SeqCst), 1);
}
