use super::{client_with, connected_client, fast_config};
use std::time::Duration;
use storeguard::circuitbreaker::CircuitState;
use storeguard::memory::MemoryDriver;
use storeguard::{
    CallScope, OperationOptions, OperationOutcome, RetryPolicy, ShutdownSignal, StoreError,
};

#[tokio::test(start_paused = true)]
async fn success_on_first_attempt() {
    let (driver, client) = connected_client().await;

    let mut calls = 0;
    let outcome = client
        .execute_with_retry(
            |connection| {
                calls += 1;
                async move {
                    connection.put("orders", "o-1", "pending").await?;
                    connection.find("orders", "o-1").await
                }
            },
            &OperationOptions::new(),
        )
        .await;

    assert_eq!(outcome, OperationOutcome::Success(Some("pending".to_string())));
    assert_eq!(calls, 1);
    assert_eq!(client.circuit_breaker_status().state, CircuitState::Closed);
    assert_eq!(driver.documents("orders").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried() {
    let (driver, client) = connected_client().await;
    driver.fail_next(StoreError::driver(91, "primary stepping down"));
    driver.fail_next(StoreError::connection("connection reset by peer"));

    let mut calls = 0;
    let outcome = client
        .execute_with_retry(
            |connection| {
                calls += 1;
                async move { connection.count("orders").await }
            },
            &OperationOptions::new(),
        )
        .await;

    assert_eq!(outcome, OperationOutcome::Success(0));
    assert_eq!(calls, 3);
    assert_eq!(client.circuit_breaker_status().failure_count, 0);
}

#[tokio::test(start_paused = true)]
async fn fatal_error_is_not_retried() {
    let (driver, client) = connected_client().await;
    driver.fail_next(StoreError::validation("order id must not be empty"));

    let mut calls = 0;
    let outcome = client
        .execute_with_retry(
            |connection| {
                calls += 1;
                async move { connection.find("orders", "").await }
            },
            &OperationOptions::new(),
        )
        .await;

    assert_eq!(
        outcome,
        OperationOutcome::FatalFailure(StoreError::validation("order id must not be empty"))
    );
    assert_eq!(outcome.http_status(), 400);
    assert_eq!(calls, 1);
    assert_eq!(client.circuit_breaker_status().failure_count, 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_count_once_against_the_breaker() {
    let (driver, client) = connected_client().await;
    for _ in 0..3 {
        driver.fail_next(StoreError::driver(6, "host unreachable"));
    }

    let outcome = client
        .execute_with_retry(
            |connection| async move { connection.count("orders").await },
            &OperationOptions::new(),
        )
        .await;

    match outcome {
        OperationOutcome::RetryableFailure { error, attempts } => {
            assert_eq!(attempts, 3);
            assert_eq!(error.code(), Some(6));
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
    assert_eq!(client.circuit_breaker_status().failure_count, 1);
}

#[tokio::test(start_paused = true)]
async fn open_circuit_short_circuits_calls() {
    let (driver, client) = connected_client().await;
    driver.set_reachable(false);

    for _ in 0..3 {
        let outcome = client
            .execute_with_retry(
                |connection| async move { connection.count("orders").await },
                &OperationOptions::new().with_retry(RetryPolicy::no_retry()),
            )
            .await;
        assert!(outcome.is_retryable_failure());
    }
    assert_eq!(client.circuit_breaker_status().state, CircuitState::Open);

    let operations_before = driver.operation_count();
    let mut calls = 0;
    let outcome = client
        .execute_with_retry(
            |connection| {
                calls += 1;
                async move { connection.count("orders").await }
            },
            &OperationOptions::new(),
        )
        .await;

    assert!(outcome.is_circuit_open());
    assert_eq!(outcome.http_status(), 503);
    assert_eq!(calls, 0);
    assert_eq!(driver.operation_count(), operations_before);
}

#[tokio::test(start_paused = true)]
async fn missing_connection_is_a_retryable_failure() {
    let driver = MemoryDriver::new();
    let client = client_with(&driver, fast_config());

    let mut calls = 0;
    let outcome = client
        .execute_with_retry(
            |connection| {
                calls += 1;
                async move { connection.count("orders").await }
            },
            &OperationOptions::new(),
        )
        .await;

    assert!(outcome.is_retryable_failure());
    assert!(matches!(outcome.error(), Some(StoreError::Connection(_))));
    assert_eq!(calls, 0);
}

#[tokio::test(start_paused = true)]
async fn slow_attempts_time_out() {
    let (driver, client) = connected_client().await;
    driver.set_latency(Duration::from_secs(5));

    let started = tokio::time::Instant::now();
    let outcome = client
        .execute_with_retry(
            |connection| async move { connection.count("orders").await },
            &OperationOptions::new().with_retry(
                RetryPolicy::new(2)
                    .with_base_delay(Duration::from_millis(100))
                    .with_jitter_max(Duration::ZERO)
                    .with_per_attempt_timeout(Duration::from_secs(1)),
            ),
        )
        .await;

    match outcome {
        OperationOutcome::RetryableFailure { error, attempts } => {
            assert_eq!(attempts, 2);
            assert_eq!(error, StoreError::Timeout(Duration::from_secs(1)));
        }
        other => panic!("expected timeouts, got {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn caller_deadline_bounds_the_whole_call() {
    let (driver, client) = connected_client().await;
    driver.set_reachable(false);

    let started = tokio::time::Instant::now();
    let outcome = client
        .execute_with_retry(
            |connection| async move { connection.count("orders").await },
            &OperationOptions::new()
                .with_retry(
                    RetryPolicy::new(10)
                        .with_base_delay(Duration::from_secs(1))
                        .with_jitter_max(Duration::ZERO),
                )
                .with_scope(CallScope::new().timeout(Duration::from_millis(2_500))),
        )
        .await;

    assert_eq!(outcome, OperationOutcome::FatalFailure(StoreError::DeadlineExceeded));
    assert!(started.elapsed() <= Duration::from_millis(2_600));
}

#[tokio::test(start_paused = true)]
async fn calls_are_refused_once_shutdown_begins() {
    let (_driver, client) = connected_client().await;
    client.graceful_shutdown(ShutdownSignal::Requested).await;

    let mut calls = 0;
    let outcome = client
        .execute_with_retry(
            |connection| {
                calls += 1;
                async move { connection.count("orders").await }
            },
            &OperationOptions::new(),
        )
        .await;

    assert_eq!(outcome, OperationOutcome::FatalFailure(StoreError::ShuttingDown));
    assert_eq!(calls, 0);
    assert_eq!(client.circuit_breaker_status().failure_count, 0);
}

#[tokio::test(start_paused = true)]
async fn attempts_use_the_connection_current_at_that_moment() {
    let (driver, client) = connected_client().await;

    let first = client
        .execute_with_retry(
            |connection| async move { Ok(connection.id()) },
            &OperationOptions::new(),
        )
        .await;
    assert_eq!(first, OperationOutcome::Success(1));

    driver.drop_connection("server closed the socket");
    tokio::time::sleep(Duration::from_secs(1)).await;

    let second = client
        .execute_with_retry(
            |connection| async move { Ok(connection.id()) },
            &OperationOptions::new(),
        )
        .await;
    assert_eq!(second, OperationOutcome::Success(2));
    assert_eq!(driver.connect_count(), 2);
}
