//! Circuit breaker metrics regression tests

use super::helpers::*;
use serial_test::serial;
use std::time::Duration;
use storeguard::circuitbreaker::CircuitBreaker;

#[tokio::test(start_paused = true)]
#[serial]
async fn circuitbreaker_metrics_exist() {
    init_recorder();

    let breaker = CircuitBreaker::builder()
        .name("metrics_cb")
        .failure_threshold(2)
        .cooldown(Duration::from_millis(100))
        .build();

    // Closed -> Open
    assert!(breaker.should_allow());
    breaker.record_failure();
    breaker.record_failure();
    assert!(!breaker.should_allow());

    // Open -> HalfOpen -> Closed
    tokio::time::advance(Duration::from_millis(100)).await;
    assert!(breaker.should_allow());
    breaker.record_success();

    assert_counter_exists("circuitbreaker_calls_total");
    assert_metric_has_label("circuitbreaker_calls_total", "circuitbreaker", "metrics_cb");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "permitted");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "rejected");

    assert_counter_exists("circuitbreaker_transitions_total");
    assert_metric_has_label("circuitbreaker_transitions_total", "circuitbreaker", "metrics_cb");
    assert_metric_has_label("circuitbreaker_transitions_total", "from", "CLOSED");
    assert_metric_has_label("circuitbreaker_transitions_total", "to", "OPEN");
    assert_metric_has_label("circuitbreaker_transitions_total", "to", "HALF_OPEN");
    assert_metric_has_label("circuitbreaker_transitions_total", "from", "HALF_OPEN");

    assert_gauge_exists("circuitbreaker_state");
    assert_metric_has_label("circuitbreaker_state", "circuitbreaker", "metrics_cb");
}
