//! Connection lifecycle management for a document store.
//!
//! [`ConnectionManager`] owns the single logical connection a store client
//! uses:
//!
//! - `connect` retries with capped exponential backoff (1s, 2s, 4s, ... up to
//!   the configured maximum) and resets its attempt counter on success.
//! - When every attempt fails, the [`ExhaustionMode`] decides between running
//!   degraded with background recovery and failing fast.
//! - Lost connections reported by the driver through [`DriverEventSender`]
//!   are re-established after a fixed delay, unless shutdown has begun.
//! - `graceful_shutdown` refuses new work, waits for in-flight operations
//!   (tracked with [`InFlightGuard`]s) up to a drain timeout and then closes
//!   the connection.
//!
//! The store itself is reached through the [`Driver`] trait.
//!
//! # Example
//!
//! ```
//! use storeguard_connection::{
//!     ConnectionConfig, ConnectionManager, Driver, DriverEventSender, Endpoint, ShutdownSignal,
//! };
//! use storeguard_core::StoreError;
//! use std::time::Duration;
//!
//! struct Loopback;
//!
//! impl Driver for Loopback {
//!     type Connection = ();
//!
//!     async fn connect(&self, _: &Endpoint, _: DriverEventSender) -> Result<(), StoreError> {
//!         Ok(())
//!     }
//!
//!     async fn ping(&self, _: &()) -> Result<(), StoreError> {
//!         Ok(())
//!     }
//!
//!     async fn close(&self, _: ()) -> Result<(), StoreError> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = ConnectionConfig::builder()
//!     .endpoint(Endpoint::new("db.internal", 27017, "orders"))
//!     .max_retries(5)
//!     .drain_timeout(Duration::from_secs(10))
//!     .on_connected(|attempts| println!("connected after {attempts} attempt(s)"))
//!     .build();
//!
//! let manager = ConnectionManager::new(Loopback, config);
//! manager.connect().await.unwrap();
//! assert!(manager.status().is_connected());
//!
//! let report = manager.graceful_shutdown(ShutdownSignal::Requested).await;
//! assert!(report.drained);
//! # }
//! ```

mod config;
mod driver;
mod error;
mod events;
mod manager;
mod shutdown;
mod state;

pub use config::{ConnectionConfig, ConnectionConfigBuilder, ExhaustionMode};
pub use driver::{Driver, DriverEvent, DriverEventSender, Endpoint};
pub use error::ConnectionError;
pub use events::ConnectionEvent;
pub use manager::ConnectionManager;
pub use shutdown::{InFlightGuard, ShutdownReport, ShutdownSignal};
pub use state::{ConnectionState, ConnectionStatus};
