use crate::shutdown::ShutdownSignal;
use std::time::{Duration, Instant};
use storeguard_core::{StoreError, StoreEvent};

/// Events emitted by the connection manager.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// A connection attempt started.
    Connecting {
        name: String,
        timestamp: Instant,
        attempt: u32,
    },
    /// The connection is up.
    Connected {
        name: String,
        timestamp: Instant,
        attempts: u32,
    },
    /// A connection attempt failed.
    ConnectFailed {
        name: String,
        timestamp: Instant,
        attempt: u32,
        error: StoreError,
        retry_in: Option<Duration>,
    },
    /// An established connection was lost.
    Disconnected {
        name: String,
        timestamp: Instant,
        reason: String,
    },
    /// The driver reported an error.
    DriverError {
        name: String,
        timestamp: Instant,
        error: StoreError,
    },
    /// Connect retries were exhausted; background recovery continues.
    Degraded {
        name: String,
        timestamp: Instant,
        attempts: u32,
    },
    /// Graceful shutdown began.
    ShutdownStarted {
        name: String,
        timestamp: Instant,
        signal: ShutdownSignal,
    },
    /// Graceful shutdown finished and the connection is closed.
    ShutdownCompleted {
        name: String,
        timestamp: Instant,
        drained: bool,
        abandoned: usize,
    },
}

impl StoreEvent for ConnectionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ConnectionEvent::Connecting { .. } => "connecting",
            ConnectionEvent::Connected { .. } => "connected",
            ConnectionEvent::ConnectFailed { .. } => "connect_failed",
            ConnectionEvent::Disconnected { .. } => "disconnected",
            ConnectionEvent::DriverError { .. } => "driver_error",
            ConnectionEvent::Degraded { .. } => "degraded",
            ConnectionEvent::ShutdownStarted { .. } => "shutdown_started",
            ConnectionEvent::ShutdownCompleted { .. } => "shutdown_completed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ConnectionEvent::Connecting { timestamp, .. }
            | ConnectionEvent::Connected { timestamp, .. }
            | ConnectionEvent::ConnectFailed { timestamp, .. }
            | ConnectionEvent::Disconnected { timestamp, .. }
            | ConnectionEvent::DriverError { timestamp, .. }
            | ConnectionEvent::Degraded { timestamp, .. }
            | ConnectionEvent::ShutdownStarted { timestamp, .. }
            | ConnectionEvent::ShutdownCompleted { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            ConnectionEvent::Connecting { name, .. }
            | ConnectionEvent::Connected { name, .. }
            | ConnectionEvent::ConnectFailed { name, .. }
            | ConnectionEvent::Disconnected { name, .. }
            | ConnectionEvent::DriverError { name, .. }
            | ConnectionEvent::Degraded { name, .. }
            | ConnectionEvent::ShutdownStarted { name, .. }
            | ConnectionEvent::ShutdownCompleted { name, .. } => name,
        }
    }
}
