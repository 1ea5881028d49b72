use crate::events::StatsEvent;
use crate::stats::{AlertThresholds, PoolStats, StatsAlert};
use std::time::Duration;
use storeguard_core::{EventListeners, FnListener};

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// Configuration for the stats collector.
pub struct StatsCollectorConfig {
    pub(crate) thresholds: AlertThresholds,
    pub(crate) timeout: Duration,
    pub(crate) event_listeners: EventListeners<StatsEvent>,
    pub(crate) name: String,
}

impl StatsCollectorConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> StatsCollectorConfigBuilder {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_gauge!(
                    "store_pool_connections",
                    "Pool connections by state (active, available)"
                );
                describe_gauge!(
                    "store_pool_utilization_percent",
                    "Share of pool connections in use"
                );
                describe_gauge!(
                    "store_resident_memory_megabytes",
                    "Resident memory of the store server"
                );
                describe_gauge!(
                    "store_storage_ratio",
                    "Allocated storage divided by logical data size"
                );
                describe_counter!("store_stats_alerts_total", "Threshold alerts raised");
            });
        }
        StatsCollectorConfigBuilder::new()
    }

    /// Alert thresholds.
    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }
}

impl Default for StatsCollectorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`StatsCollectorConfig`].
pub struct StatsCollectorConfigBuilder {
    thresholds: AlertThresholds,
    timeout: Duration,
    event_listeners: EventListeners<StatsEvent>,
    name: String,
}

impl StatsCollectorConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            thresholds: AlertThresholds::default(),
            timeout: Duration::from_secs(5),
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Replaces all alert thresholds.
    pub fn thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Pool utilization, in percent, above which an alert is raised.
    ///
    /// Default: 80
    pub fn pool_utilization_threshold(mut self, percent: f64) -> Self {
        self.thresholds.pool_utilization_percent = percent;
        self
    }

    /// Resident memory, in megabytes, above which an alert is raised.
    ///
    /// Default: 1024
    pub fn memory_threshold_mb(mut self, megabytes: u64) -> Self {
        self.thresholds.memory_mb = megabytes;
        self
    }

    /// Storage-to-data ratio above which an alert is raised.
    ///
    /// Default: 3.0
    pub fn storage_ratio_threshold(mut self, ratio: f64) -> Self {
        self.thresholds.storage_ratio = ratio;
        self
    }

    /// Upper bound on reading server statistics.
    ///
    /// Default: 5 seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Gives this collector a name for observability.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked for every alert raised.
    pub fn on_alert<F>(mut self, f: F) -> Self
    where
        F: Fn(&StatsAlert) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &StatsEvent| {
                if let StatsEvent::Alert { alert, .. } = event {
                    f(alert);
                }
            }));
        self
    }

    /// Registers a callback invoked after each collection.
    pub fn on_collected<F>(mut self, f: F) -> Self
    where
        F: Fn(&PoolStats) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &StatsEvent| {
                if let StatsEvent::Collected { stats, .. } = event {
                    f(stats);
                }
            }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> StatsCollectorConfig {
        StatsCollectorConfig {
            thresholds: self.thresholds,
            timeout: self.timeout,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}

impl Default for StatsCollectorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
