use std::time::Instant;
use storeguard_core::{StoreError, StoreEvent};

/// Events emitted by the transaction orchestrator.
#[derive(Debug, Clone)]
pub enum TransactionEvent {
    /// Every step ran and the commit succeeded.
    Committed {
        name: String,
        timestamp: Instant,
        steps: usize,
        attempts: u32,
    },
    /// An attempt was aborted; none of its writes were applied.
    RolledBack {
        name: String,
        timestamp: Instant,
        attempt: u32,
        error: StoreError,
    },
}

impl StoreEvent for TransactionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TransactionEvent::Committed { .. } => "committed",
            TransactionEvent::RolledBack { .. } => "rolled_back",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            TransactionEvent::Committed { timestamp, .. }
            | TransactionEvent::RolledBack { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            TransactionEvent::Committed { name, .. } | TransactionEvent::RolledBack { name, .. } => {
                name
            }
        }
    }
}
