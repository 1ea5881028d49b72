use storeguard_core::StoreError;

/// Errors returned by [`crate::ConnectionManager::connect`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectionError {
    /// Retries were exhausted; the manager keeps recovering in the background.
    #[error("store unreachable after {attempts} attempts, running degraded: {last_error}")]
    Degraded {
        /// Attempts made.
        attempts: u32,
        /// Error from the final attempt.
        last_error: StoreError,
    },

    /// Retries were exhausted and the manager is configured to fail fast.
    #[error("could not connect after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// Error from the final attempt.
        last_error: StoreError,
    },

    /// Shutdown began before a connection was established.
    #[error("connection manager is shutting down")]
    ShuttingDown,
}

impl ConnectionError {
    /// Returns true for [`ConnectionError::Degraded`].
    pub fn is_degraded(&self) -> bool {
        matches!(self, ConnectionError::Degraded { .. })
    }
}

impl From<ConnectionError> for StoreError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::ShuttingDown => StoreError::ShuttingDown,
            other => StoreError::Connection(other.to_string()),
        }
    }
}
