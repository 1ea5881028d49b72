//! Connection pool and server statistics for a document store.
//!
//! [`StatsCollector::collect`] reads raw figures through the
//! [`StatsProvider`] driver extension, derives pool utilization and the
//! storage-to-data ratio, and raises a [`StatsAlert`] for each threshold
//! crossed:
//!
//! | Alert | Default threshold |
//! |---|---|
//! | `pool_utilization_high` | more than 80% of pool connections in use |
//! | `memory_usage_high` | more than 1024 MB resident |
//! | `storage_overhead_high` | storage more than 3x the data size |
//!
//! Collection is read-only: it never touches the circuit breaker or the
//! connection state.

mod config;
mod events;
mod provider;
mod stats;

pub use config::{StatsCollectorConfig, StatsCollectorConfigBuilder};
pub use events::StatsEvent;
pub use provider::{ServerStats, StatsProvider};
pub use stats::{AlertThresholds, PoolStats, StatsAlert};

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::sync::Arc;
use std::time::Instant;
use storeguard_connection::ConnectionManager;
use storeguard_core::StoreError;

/// Reads pool and server statistics and evaluates alert thresholds.
pub struct StatsCollector<D: StatsProvider> {
    manager: ConnectionManager<D>,
    config: Arc<StatsCollectorConfig>,
}

impl<D: StatsProvider> Clone for StatsCollector<D> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<D: StatsProvider> StatsCollector<D> {
    /// Creates a collector reading through `manager`'s connection.
    pub fn new(manager: ConnectionManager<D>, config: StatsCollectorConfig) -> Self {
        Self {
            manager,
            config: Arc::new(config),
        }
    }

    /// Creates a collector around configuration that other collectors
    /// already share.
    pub fn with_shared_config(
        manager: ConnectionManager<D>,
        config: Arc<StatsCollectorConfig>,
    ) -> Self {
        Self { manager, config }
    }

    /// The collector's configuration.
    pub fn config(&self) -> &StatsCollectorConfig {
        &self.config
    }

    /// Reads the current figures and evaluates thresholds.
    pub async fn collect(&self) -> Result<PoolStats, StoreError> {
        let connection = self.manager.connection()?;
        let reading = self.manager.driver().server_stats(&connection);
        let raw = tokio::time::timeout(self.config.timeout, reading)
            .await
            .map_err(|_| StoreError::Timeout(self.config.timeout))??;

        let stats = PoolStats::derive(raw, &self.config.thresholds);

        #[cfg(feature = "metrics")]
        self.record_metrics(&stats);

        for alert in &stats.alerts {
            #[cfg(feature = "tracing")]
            tracing::warn!(collector = %self.config.name, alert = alert.name(), "{alert}");

            #[cfg(feature = "metrics")]
            counter!("store_stats_alerts_total", "collector" => self.config.name.clone(), "alert" => alert.name())
                .increment(1);

            self.config.event_listeners.emit(&StatsEvent::Alert {
                name: self.config.name.clone(),
                timestamp: Instant::now(),
                alert: *alert,
            });
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            collector = %self.config.name,
            active = stats.active,
            available = stats.available,
            utilization = stats.utilization_percent,
            resident_mb = stats.resident_memory_mb,
            "collected store statistics"
        );

        self.config.event_listeners.emit(&StatsEvent::Collected {
            name: self.config.name.clone(),
            timestamp: Instant::now(),
            stats: stats.clone(),
        });

        Ok(stats)
    }

    #[cfg(feature = "metrics")]
    fn record_metrics(&self, stats: &PoolStats) {
        let name = self.config.name.clone();
        gauge!("store_pool_connections", "collector" => name.clone(), "state" => "active")
            .set(stats.active as f64);
        gauge!("store_pool_connections", "collector" => name.clone(), "state" => "available")
            .set(stats.available as f64);
        gauge!("store_pool_utilization_percent", "collector" => name.clone())
            .set(stats.utilization_percent);
        gauge!("store_resident_memory_megabytes", "collector" => name.clone())
            .set(stats.resident_memory_mb as f64);
        if let Some(ratio) = stats.storage_ratio {
            gauge!("store_storage_ratio", "collector" => name).set(ratio);
        }
    }
}

impl<D: StatsProvider> std::fmt::Debug for StatsCollector<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsCollector")
            .field("name", &self.config.name)
            .field("thresholds", &self.config.thresholds)
            .finish()
    }
}
