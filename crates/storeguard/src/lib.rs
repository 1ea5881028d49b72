//! Resilient access to a shared document-store connection.
//!
//! `storeguard` puts every store call behind the same set of guards:
//!
//! - **Connection management** ([`connection`]): connect with capped
//!   exponential backoff, reconnect after driver-reported drops, degrade or
//!   fail fast when the store stays unreachable, drain on shutdown.
//! - **Circuit breaker** ([`circuitbreaker`]): stop calling a store that keeps
//!   failing, probe it again after a cooldown.
//! - **Retry** ([`retry`]): retry transient failures with jittered
//!   exponential backoff, bounded per attempt and per call.
//! - **Transactions** ([`transaction`]): multi-step transactions restarted
//!   from the first step on transient errors, sessions always released.
//! - **Health** ([`healthcheck`]): periodic probes feeding the breaker.
//! - **Statistics** ([`stats`]): pool and server figures with threshold
//!   alerts.
//!
//! [`StoreClient`] wires them together from a [`ResilienceConfig`], which can
//! be loaded from TOML:
//!
//! ```toml
//! max_retries = 5
//! circuit_breaker_threshold = 5
//! circuit_breaker_cooldown = 60000
//! environment = "production"
//!
//! [endpoint]
//! host = "db.internal"
//! port = 27017
//! database = "shop"
//! ```
//!
//! # Features
//!
//! - `tracing` (default): structured logs from every component
//! - `metrics`: breaker, retry and statistics metrics through the `metrics`
//!   crate
//! - `memory`: [`memory::MemoryDriver`], an in-process store with fault
//!   injection for tests and demos
//!
//! # Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "memory")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use storeguard::memory::MemoryDriver;
//! use storeguard::{OperationOptions, ResilienceConfig, StoreClient};
//!
//! let client = StoreClient::builder(MemoryDriver::new(), ResilienceConfig::from_file("store.toml")?)
//!     .name("orders")
//!     .on_circuit_event(|event| println!("breaker: {event:?}"))
//!     .build()?;
//!
//! client.connect().await?;
//! client.start_health_monitor();
//!
//! let outcome = client
//!     .execute_with_retry(
//!         |connection| async move { connection.find("orders", "o-42").await },
//!         &OperationOptions::new(),
//!     )
//!     .await;
//! println!("answered {} with {:?}", outcome.http_status(), outcome.value());
//!
//! client.shutdown_on_signal().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod signal;

#[cfg(feature = "memory")]
pub mod memory;

pub use client::{OperationOptions, Readiness, StoreClient, StoreClientBuilder};
pub use config::{
    AlertConfig, ConfigError, EndpointConfig, Environment, ResilienceConfig,
    TransactionBreakerMode,
};
pub use signal::wait_for_signal;

pub use storeguard_circuitbreaker as circuitbreaker;
pub use storeguard_connection as connection;
pub use storeguard_core as core;
pub use storeguard_healthcheck as healthcheck;
pub use storeguard_retry as retry;
pub use storeguard_stats as stats;
pub use storeguard_transaction as transaction;

pub use storeguard_circuitbreaker::{CircuitBreakerStatus, CircuitState};
pub use storeguard_connection::{
    ConnectionError, ConnectionState, ConnectionStatus, Driver, ShutdownReport, ShutdownSignal,
};
pub use storeguard_core::{CallScope, OperationOutcome, StoreError};
pub use storeguard_healthcheck::{HealthSnapshot, HealthStatus};
pub use storeguard_retry::RetryPolicy;
pub use storeguard_stats::{PoolStats, StatsAlert, StatsProvider};
pub use storeguard_transaction::{
    step, TransactionOptions, TransactionStep, TransactionalDriver,
};
