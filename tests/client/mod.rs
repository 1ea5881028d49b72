//! Test organization:
//! - operations.rs: single operations through retry and the breaker
//! - transactions.rs: multi-step transactions and rollback
//! - lifecycle.rs: connect, degrade, reconnect and graceful shutdown
//! - observability.rs: health, readiness, statistics and events

mod lifecycle;
mod observability;
mod operations;
mod transactions;

use storeguard::memory::MemoryDriver;
use storeguard::{ResilienceConfig, StoreClient};

/// Short delays and no jitter so paused-clock tests are exact.
pub(crate) fn fast_config() -> ResilienceConfig {
    ResilienceConfig {
        max_retries: 3,
        retry_base_delay: 100,
        retry_max_delay: 400,
        retry_jitter_max: 0,
        operation_max_attempts: 3,
        circuit_breaker_threshold: 3,
        circuit_breaker_cooldown: 10_000,
        reconnect_delay: 500,
        per_operation_timeout: 1_000,
        shutdown_drain_timeout: 2_000,
        ..ResilienceConfig::default()
    }
}

pub(crate) fn client_with(driver: &MemoryDriver, config: ResilienceConfig) -> StoreClient<MemoryDriver> {
    StoreClient::builder(driver.clone(), config)
        .name("test")
        .build()
        .unwrap()
}

pub(crate) async fn connected_client() -> (MemoryDriver, StoreClient<MemoryDriver>) {
    let driver = MemoryDriver::new();
    let client = client_with(&driver, fast_config());
    client.connect().await.unwrap();
    (driver, client)
}
