use super::{client_with, connected_client, fast_config};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storeguard::connection::ConnectionEvent;
use storeguard::memory::MemoryDriver;
use storeguard::{
    ConnectionError, ConnectionState, Environment, OperationOptions, ResilienceConfig,
    ShutdownSignal, StoreClient,
};

#[tokio::test(start_paused = true)]
async fn connect_resets_attempt_count() {
    let (_driver, client) = connected_client().await;
    let status = client.connection_status();

    assert_eq!(status.state, ConnectionState::Connected);
    assert_eq!(status.attempt_count, 0);
    assert!(status.last_error.is_none());
    assert_eq!(status.endpoint.to_string(), "localhost:27017/app");
}

#[tokio::test(start_paused = true)]
async fn production_degrades_and_recovers_in_background() {
    let driver = MemoryDriver::new();
    driver.set_reachable(false);
    let client = client_with(&driver, fast_config());

    let err = client.connect().await.unwrap_err();
    assert!(err.is_degraded());
    assert!(client.connection_status().degraded);

    driver.set_reachable(true);
    tokio::time::sleep(Duration::from_secs(1)).await;

    let status = client.connection_status();
    assert_eq!(status.state, ConnectionState::Connected);
    assert!(!status.degraded);
}

#[tokio::test(start_paused = true)]
async fn development_fails_fast() {
    let driver = MemoryDriver::new();
    driver.set_reachable(false);
    let client = client_with(
        &driver,
        ResilienceConfig {
            environment: Environment::Development,
            ..fast_config()
        },
    );

    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, ConnectionError::RetriesExhausted { attempts: 3, .. }));
    assert!(!client.connection_status().degraded);
    assert_eq!(client.connection_status().state, ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn lost_connection_is_reestablished() {
    let driver = MemoryDriver::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&events);
    let client = StoreClient::builder(driver.clone(), fast_config())
        .on_connection_event(move |event: &ConnectionEvent| {
            recorded.lock().unwrap().push(event.clone())
        })
        .build()
        .unwrap();
    client.connect().await.unwrap();

    driver.drop_connection("socket closed");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(client.connection_status().state, ConnectionState::Disconnected);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(client.connection_status().state, ConnectionState::Connected);
    assert_eq!(driver.connect_count(), 2);

    let events = events.lock().unwrap();
    assert!(events
        .iter()
        .any(|event| matches!(event, ConnectionEvent::Disconnected { .. })));
}

#[tokio::test(start_paused = true)]
async fn graceful_shutdown_drains_in_flight_operations() {
    let (driver, client) = connected_client().await;
    driver.set_latency(Duration::from_millis(500));

    let options = OperationOptions::new();
    let operation = client.execute_with_retry(
        |connection| async move { connection.count("orders").await },
        &options,
    );
    let shutdown = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        client.graceful_shutdown(ShutdownSignal::Terminate).await
    };
    let (outcome, report) = tokio::join!(operation, shutdown);

    assert!(outcome.is_success());
    assert!(report.drained);
    assert_eq!(report.abandoned, 0);
    assert_eq!(report.signal, ShutdownSignal::Terminate);
    assert_eq!(client.connection_status().state, ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn graceful_shutdown_force_closes_after_drain_timeout() {
    let (driver, client) = connected_client().await;
    driver.set_latency(Duration::from_secs(60));

    let options = OperationOptions::new().with_retry(
        storeguard::RetryPolicy::no_retry().with_per_attempt_timeout(Duration::from_secs(120)),
    );
    let operation = client.execute_with_retry(
        |connection| async move { connection.count("orders").await },
        &options,
    );
    let shutdown = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        client.graceful_shutdown(ShutdownSignal::Interrupt).await
    };

    tokio::select! {
        _ = operation => panic!("operation should still be running"),
        report = shutdown => {
            assert!(!report.drained);
            assert_eq!(report.abandoned, 1);
            assert!(report.drain_time >= Duration::from_secs(2));
        }
    }
}

#[tokio::test(start_paused = true)]
async fn graceful_shutdown_is_idempotent() {
    let (_driver, client) = connected_client().await;

    let first = client.graceful_shutdown(ShutdownSignal::Interrupt).await;
    let second = client.graceful_shutdown(ShutdownSignal::Terminate).await;

    assert_eq!(first, second);
    assert_eq!(second.signal, ShutdownSignal::Interrupt);
    assert!(client.connection_status().shutting_down);
}

#[tokio::test(start_paused = true)]
async fn disconnect_then_reconnect() {
    let (driver, client) = connected_client().await;

    client.disconnect().await.unwrap();
    assert_eq!(client.connection_status().state, ConnectionState::Disconnected);

    client.connect().await.unwrap();
    assert_eq!(client.connection_status().state, ConnectionState::Connected);
    assert_eq!(driver.connect_count(), 2);
}

#[test]
fn invalid_configuration_is_rejected_at_build() {
    let result = StoreClient::builder(
        MemoryDriver::new(),
        ResilienceConfig {
            operation_max_attempts: 0,
            ..ResilienceConfig::default()
        },
    )
    .build();

    assert!(matches!(result, Err(storeguard::ConfigError::Validation(_))));
}
