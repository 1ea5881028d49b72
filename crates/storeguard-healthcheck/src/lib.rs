//! Periodic health probing for a document store.
//!
//! A [`HealthMonitor`] pings the store through the connection manager's
//! driver every `interval` (30 seconds by default), bounded by
//! `probe_timeout`. Each verdict is reported to the shared circuit breaker:
//! a successful probe records a success, which lets a breaker whose cooldown
//! has elapsed close again; a failed, timed-out or connection-less probe
//! records a failure.
//!
//! The latest [`HealthSnapshot`] is always available through
//! [`HealthMonitor::snapshot`] or a watch receiver from
//! [`HealthMonitor::subscribe`]. Probes slower than `slow_threshold` are
//! logged and reported as [`HealthEvent::SlowProbe`], but still count as
//! healthy.
//!
//! ```ignore
//! let monitor = HealthMonitor::new(
//!     manager.clone(),
//!     breaker.clone(),
//!     HealthMonitorConfig::builder()
//!         .interval(Duration::from_secs(30))
//!         .on_probe_failed(|error| eprintln!("store probe failed: {error}"))
//!         .build(),
//! );
//! monitor.start();
//! ```

mod config;
mod events;
mod monitor;
mod snapshot;

pub use config::{HealthMonitorConfig, HealthMonitorConfigBuilder};
pub use events::HealthEvent;
pub use monitor::HealthMonitor;
pub use snapshot::{HealthSnapshot, HealthStatus};
