use super::{client_with, connected_client, fast_config};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storeguard::circuitbreaker::{CircuitBreakerEvent, CircuitState};
use storeguard::healthcheck::HealthEvent;
use storeguard::memory::MemoryDriver;
use storeguard::{
    HealthStatus, OperationOptions, ResilienceConfig, RetryPolicy, ShutdownSignal, StatsAlert,
    StoreClient,
};

#[tokio::test(start_paused = true)]
async fn health_check_reports_into_the_breaker() {
    let (driver, client) = connected_client().await;
    assert_eq!(client.health_snapshot().status, HealthStatus::Unknown);

    let healthy = client.health_check().await;
    assert_eq!(healthy.status, HealthStatus::Healthy);
    assert_eq!(healthy.http_status(), 200);
    assert!(healthy.checked_at.is_some());

    driver.set_reachable(false);
    let unhealthy = client.health_check().await;
    assert_eq!(unhealthy.status, HealthStatus::Unhealthy);
    assert_eq!(unhealthy.http_status(), 503);
    assert!(unhealthy.error.is_some());
    assert_eq!(client.circuit_breaker_status().failure_count, 1);
    assert_eq!(client.health_snapshot(), unhealthy);
}

#[tokio::test(start_paused = true)]
async fn health_monitor_probes_on_its_interval() {
    let driver = MemoryDriver::new();
    let probes = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&probes);
    let client = StoreClient::builder(
        driver.clone(),
        ResilienceConfig {
            health_check_interval: 10_000,
            ..fast_config()
        },
    )
    .on_health_event(move |event: &HealthEvent| {
        if matches!(event, HealthEvent::ProbeSucceeded { .. }) {
            counted.fetch_add(1, Ordering::SeqCst);
        }
    })
    .build()
    .unwrap();
    client.connect().await.unwrap();

    client.start_health_monitor();
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(probes.load(Ordering::SeqCst), 3);

    client.graceful_shutdown(ShutdownSignal::Requested).await;
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(probes.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn readiness_follows_connection_breaker_and_health() {
    let driver = MemoryDriver::new();
    let client = client_with(&driver, fast_config());

    let before = client.readiness();
    assert!(before.live);
    assert!(!before.ready);
    assert_eq!(before.readiness_status(), 503);

    client.connect().await.unwrap();
    client.health_check().await;
    let ready = client.readiness();
    assert!(ready.ready);
    assert_eq!(ready.readiness_status(), 200);
    assert_eq!(ready.health, HealthStatus::Healthy);

    client.breaker().force_open();
    let tripped = client.readiness();
    assert!(!tripped.ready);
    assert_eq!(tripped.circuit, CircuitState::Open);

    client.force_circuit_breaker_reset();
    assert!(client.readiness().ready);

    client.graceful_shutdown(ShutdownSignal::Requested).await;
    let stopping = client.readiness();
    assert!(!stopping.live);
    assert_eq!(stopping.liveness_status(), 503);
}

#[tokio::test(start_paused = true)]
async fn forced_reset_is_reported_as_reset_not_transition() {
    let driver = MemoryDriver::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&events);
    let client = StoreClient::builder(driver, fast_config())
        .on_circuit_event(move |event: &CircuitBreakerEvent| {
            recorded.lock().unwrap().push(event.clone())
        })
        .build()
        .unwrap();
    client.connect().await.unwrap();
    client.breaker().force_open();
    events.lock().unwrap().clear();

    client.force_circuit_breaker_reset();

    let status = client.circuit_breaker_status();
    assert_eq!(status.state, CircuitState::Closed);
    assert_eq!(status.failure_count, 0);

    let events = events.lock().unwrap();
    assert!(events
        .iter()
        .any(|event| matches!(event, CircuitBreakerEvent::Reset { from_state: CircuitState::Open, .. })));
    assert!(!events
        .iter()
        .any(|event| matches!(event, CircuitBreakerEvent::StateTransition { .. })));
}

#[tokio::test(start_paused = true)]
async fn retry_events_are_observable() {
    let driver = MemoryDriver::new();
    let retries = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&retries);
    let client = StoreClient::builder(driver.clone(), fast_config())
        .on_retry_event(move |event| {
            if let storeguard::retry::RetryEvent::Retry { attempt, delay, .. } = event {
                recorded.lock().unwrap().push((*attempt, *delay));
            }
        })
        .build()
        .unwrap();
    client.connect().await.unwrap();
    driver.fail_next(storeguard::StoreError::driver(189, "election in progress"));
    driver.fail_next(storeguard::StoreError::driver(189, "election in progress"));

    let outcome = client
        .execute_with_retry(
            |connection| async move { connection.count("orders").await },
            &OperationOptions::new().with_retry(client.retry_policy().clone()),
        )
        .await;

    assert!(outcome.is_success());
    assert_eq!(
        *retries.lock().unwrap(),
        vec![
            (1, Duration::from_millis(100)),
            (2, Duration::from_millis(200))
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn stats_raise_alerts_over_threshold() {
    let driver = MemoryDriver::with_pool_size(10);
    let alerts = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&alerts);
    let client = StoreClient::builder(driver.clone(), fast_config())
        .on_stats_alert(move |alert: &StatsAlert| recorded.lock().unwrap().push(alert.name()))
        .build()
        .unwrap();
    client.connect().await.unwrap();

    let quiet = client.collect_stats().await.unwrap();
    assert!(quiet.alerts.is_empty());
    assert_eq!(quiet.total, 10);

    driver.set_resident_memory_mb(4096);
    client
        .execute_with_retry(
            |connection| async move { connection.put("orders", "o-1", "placed").await },
            &OperationOptions::new().with_retry(RetryPolicy::no_retry()),
        )
        .await
        .into_result()
        .unwrap();
    driver.set_storage_overhead(5.0);

    let loud = client.collect_stats().await.unwrap();
    let names: Vec<_> = loud.alerts.iter().map(StatsAlert::name).collect();
    assert_eq!(names, vec!["memory_usage_high", "storage_overhead_high"]);
    assert_eq!(*alerts.lock().unwrap(), names);
}

#[tokio::test(start_paused = true)]
async fn stats_need_a_connection() {
    let driver = MemoryDriver::new();
    let client = client_with(&driver, fast_config());
    assert!(client.collect_stats().await.is_err());
}
