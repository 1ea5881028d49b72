//! Store client stress tests

use futures::future::join_all;
use std::time::{Duration, Instant};
use storeguard::memory::MemoryDriver;
use storeguard::{OperationOptions, ResilienceConfig, ShutdownSignal, StoreClient};

use super::ConcurrencyTracker;

fn stress_config() -> ResilienceConfig {
    ResilienceConfig {
        retry_base_delay: 1,
        retry_max_delay: 10,
        retry_jitter_max: 1,
        operation_max_attempts: 5,
        circuit_breaker_threshold: 1_000_000,
        ..ResilienceConfig::default()
    }
}

/// Test: 10k concurrent operations against a flaky store
#[tokio::test]
#[ignore]
async fn stress_concurrent_operations_with_injected_faults() {
    let driver = MemoryDriver::with_pool_size(10_000);
    let client = StoreClient::builder(driver.clone(), stress_config())
        .build()
        .unwrap();
    client.connect().await.unwrap();
    driver.set_error_rate(0.2, Some(7));
    driver.set_latency(Duration::from_millis(1));

    let tracker = ConcurrencyTracker::default();
    let options = OperationOptions::new();
    let start = Instant::now();

    let outcomes = join_all((0..10_000).map(|i| {
        let tracker = &tracker;
        let client = &client;
        let options = &options;
        async move {
            tracker.enter();
            let outcome = client
                .execute_with_retry(
                    |connection| async move {
                        connection
                            .put("orders", format!("o-{i}"), "placed")
                            .await
                    },
                    options,
                )
                .await;
            tracker.exit();
            outcome
        }
    }))
    .await;

    let succeeded = outcomes.iter().filter(|outcome| outcome.is_success()).count();
    let exhausted = outcomes
        .iter()
        .filter(|outcome| outcome.is_retryable_failure())
        .count();

    println!("10k operations completed in {:?}", start.elapsed());
    println!("Succeeded: {succeeded}, exhausted: {exhausted}, peak concurrency: {}", tracker.peak());

    assert_eq!(succeeded + exhausted, 10_000);
    assert_eq!(driver.documents("orders").len(), succeeded);
    assert_eq!(tracker.current(), 0);
    // 0.2^5 of the calls exhaust their attempts
    assert!(exhausted < 100, "too many exhausted calls: {exhausted}");
}

/// Test: shutdown under load drains every in-flight operation
#[tokio::test]
#[ignore]
async fn stress_shutdown_drains_under_load() {
    let driver = MemoryDriver::with_pool_size(5_000);
    let client = StoreClient::builder(driver.clone(), stress_config())
        .build()
        .unwrap();
    client.connect().await.unwrap();
    driver.set_latency(Duration::from_millis(50));

    let options = OperationOptions::new();
    let operations = join_all((0..5_000).map(|_| {
        client.execute_with_retry(
            |connection| async move { connection.count("orders").await },
            &options,
        )
    }));
    let shutdown = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        client.graceful_shutdown(ShutdownSignal::Terminate).await
    };

    let (outcomes, report) = tokio::join!(operations, shutdown);

    assert!(outcomes.iter().all(|outcome| outcome.is_success()));
    assert!(report.drained);
    assert_eq!(report.abandoned, 0);
}
