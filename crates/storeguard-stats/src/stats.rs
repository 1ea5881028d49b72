use crate::provider::ServerStats;
use std::fmt;
use std::time::SystemTime;

/// Limits above which [`StatsAlert`]s are raised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    /// Pool utilization, in percent.
    pub pool_utilization_percent: f64,
    /// Resident memory, in megabytes.
    pub memory_mb: u64,
    /// Storage size divided by data size.
    pub storage_ratio: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            pool_utilization_percent: 80.0,
            memory_mb: 1024,
            storage_ratio: 3.0,
        }
    }
}

/// A threshold that was crossed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatsAlert {
    /// Too many pool connections are in use.
    PoolUtilizationHigh {
        utilization_percent: f64,
        threshold: f64,
    },
    /// The server uses more memory than allowed.
    MemoryUsageHigh { resident_mb: u64, threshold_mb: u64 },
    /// Disk allocation is large compared to the stored data.
    StorageOverheadHigh { ratio: f64, threshold: f64 },
}

impl StatsAlert {
    /// Stable alert name.
    pub fn name(&self) -> &'static str {
        match self {
            StatsAlert::PoolUtilizationHigh { .. } => "pool_utilization_high",
            StatsAlert::MemoryUsageHigh { .. } => "memory_usage_high",
            StatsAlert::StorageOverheadHigh { .. } => "storage_overhead_high",
        }
    }
}

impl fmt::Display for StatsAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsAlert::PoolUtilizationHigh {
                utilization_percent,
                threshold,
            } => write!(
                f,
                "pool utilization {utilization_percent:.1}% exceeds {threshold:.1}%"
            ),
            StatsAlert::MemoryUsageHigh {
                resident_mb,
                threshold_mb,
            } => write!(f, "resident memory {resident_mb} MB exceeds {threshold_mb} MB"),
            StatsAlert::StorageOverheadHigh { ratio, threshold } => {
                write!(f, "storage ratio {ratio:.2} exceeds {threshold:.2}")
            }
        }
    }
}

/// Derived pool and storage figures.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolStats {
    /// Connections in use.
    pub active: u64,
    /// Connections idle.
    pub available: u64,
    /// Active plus available.
    pub total: u64,
    /// `active / total` in percent, 0 for an empty pool.
    pub utilization_percent: f64,
    /// Resident memory, in megabytes.
    pub resident_memory_mb: u64,
    /// Logical data size, in bytes.
    pub data_size_bytes: u64,
    /// Allocated storage, in bytes.
    pub storage_size_bytes: u64,
    /// `storage / data`, or `None` when there is no data.
    pub storage_ratio: Option<f64>,
    /// Thresholds crossed at collection time.
    pub alerts: Vec<StatsAlert>,
    /// When the figures were read.
    pub collected_at: SystemTime,
}

impl PoolStats {
    pub(crate) fn derive(raw: ServerStats, thresholds: &AlertThresholds) -> Self {
        let total = raw.active_connections + raw.available_connections;
        let utilization_percent = if total == 0 {
            0.0
        } else {
            raw.active_connections as f64 * 100.0 / total as f64
        };
        let storage_ratio = (raw.data_size_bytes > 0)
            .then(|| raw.storage_size_bytes as f64 / raw.data_size_bytes as f64);

        let mut alerts = Vec::new();
        if utilization_percent > thresholds.pool_utilization_percent {
            alerts.push(StatsAlert::PoolUtilizationHigh {
                utilization_percent,
                threshold: thresholds.pool_utilization_percent,
            });
        }
        if raw.resident_memory_mb > thresholds.memory_mb {
            alerts.push(StatsAlert::MemoryUsageHigh {
                resident_mb: raw.resident_memory_mb,
                threshold_mb: thresholds.memory_mb,
            });
        }
        if let Some(ratio) = storage_ratio.filter(|r| *r > thresholds.storage_ratio) {
            alerts.push(StatsAlert::StorageOverheadHigh {
                ratio,
                threshold: thresholds.storage_ratio,
            });
        }

        Self {
            active: raw.active_connections,
            available: raw.available_connections,
            total,
            utilization_percent,
            resident_memory_mb: raw.resident_memory_mb,
            data_size_bytes: raw.data_size_bytes,
            storage_size_bytes: raw.storage_size_bytes,
            storage_ratio,
            alerts,
            collected_at: SystemTime::now(),
        }
    }
}
