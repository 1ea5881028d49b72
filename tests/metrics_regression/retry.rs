//! Retry executor metrics regression tests

use super::helpers::*;
use serial_test::serial;
use std::time::Duration;
use storeguard::circuitbreaker::CircuitBreaker;
use storeguard::retry::RetryExecutor;
use storeguard::{CallScope, RetryPolicy, StoreError};

#[tokio::test(start_paused = true)]
#[serial]
async fn retry_metrics_exist() {
    init_recorder();

    let breaker = CircuitBreaker::builder().failure_threshold(2).build();
    let executor = RetryExecutor::builder(breaker.clone())
        .name("metrics_retry")
        .build();
    let policy = RetryPolicy::new(2)
        .with_base_delay(Duration::from_millis(10))
        .with_jitter_max(Duration::ZERO);

    // One retry, then success
    let mut calls = 0;
    let outcome = executor
        .execute(
            || {
                calls += 1;
                let attempt = calls;
                async move {
                    if attempt == 1 {
                        Err(StoreError::connection("connection reset"))
                    } else {
                        Ok(())
                    }
                }
            },
            &policy,
            &CallScope::new(),
        )
        .await;
    assert!(outcome.is_success());

    // Fatal failure
    let _ = executor
        .execute(
            || async { Err::<(), _>(StoreError::validation("bad document")) },
            &policy,
            &CallScope::new(),
        )
        .await;

    // Rejected by the open circuit
    breaker.force_open();
    let rejected = executor
        .execute(|| async { Ok::<_, StoreError>(()) }, &policy, &CallScope::new())
        .await;
    assert!(rejected.is_circuit_open());

    assert_counter_exists("retry_calls_total");
    assert_metric_has_label("retry_calls_total", "executor", "metrics_retry");
    assert_metric_has_label("retry_calls_total", "outcome", "success");
    assert_metric_has_label("retry_calls_total", "outcome", "rejected");
    assert_metric_has_label("retry_calls_total", "outcome", "fatal");

    assert_counter_exists("retry_attempts_total");
    assert_metric_has_label("retry_attempts_total", "executor", "metrics_retry");
}
