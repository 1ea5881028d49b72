//! Connection state tracking.

use crate::driver::Endpoint;
use std::fmt;
use std::time::Duration;
use storeguard_core::StoreError;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No connection; the initial and the terminal state.
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// Connected and serving operations.
    Connected,
    /// Draining in-flight operations before the final close.
    Disconnecting,
}

impl ConnectionState {
    /// Upper-case label, as reported to operators.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Disconnecting => "DISCONNECTING",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the connection manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionStatus {
    /// Current lifecycle state.
    pub state: ConnectionState,
    /// Attempts made in the current connect cycle; zero once connected.
    pub attempt_count: u32,
    /// Most recent connection failure, cleared on success.
    pub last_error: Option<StoreError>,
    /// Target endpoint.
    pub endpoint: Endpoint,
    /// Whether graceful shutdown has begun.
    pub shutting_down: bool,
    /// Whether connect retries were exhausted and the manager is recovering
    /// in the background.
    pub degraded: bool,
    /// Operations currently holding an in-flight guard.
    pub in_flight: usize,
    /// How long the current connection has been up.
    pub connected_for: Option<Duration>,
}

impl ConnectionStatus {
    /// Returns true if the state is [`ConnectionState::Connected`].
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}
