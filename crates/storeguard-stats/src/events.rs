use crate::stats::{PoolStats, StatsAlert};
use std::time::Instant;
use storeguard_core::StoreEvent;

/// Events emitted by the stats collector.
#[derive(Debug, Clone)]
pub enum StatsEvent {
    /// A collection finished.
    Collected {
        name: String,
        timestamp: Instant,
        stats: PoolStats,
    },
    /// A threshold was crossed during collection.
    Alert {
        name: String,
        timestamp: Instant,
        alert: StatsAlert,
    },
}

impl StoreEvent for StatsEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StatsEvent::Collected { .. } => "collected",
            StatsEvent::Alert { alert, .. } => alert.name(),
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            StatsEvent::Collected { timestamp, .. } | StatsEvent::Alert { timestamp, .. } => {
                *timestamp
            }
        }
    }

    fn source(&self) -> &str {
        match self {
            StatsEvent::Collected { name, .. } | StatsEvent::Alert { name, .. } => name,
        }
    }
}
