//! Health status and the snapshot published after every probe.

use std::fmt;
use std::time::{Duration, SystemTime};
use storeguard_circuitbreaker::CircuitState;
use storeguard_core::StoreError;

/// Result of the most recent probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthStatus {
    /// The store answered the probe.
    Healthy,
    /// The probe failed, timed out or found no connection.
    Unhealthy,
    /// No probe has run yet.
    Unknown,
}

impl HealthStatus {
    /// Returns true only for [`HealthStatus::Healthy`].
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    /// Lower-case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of store health.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthSnapshot {
    /// Probe verdict.
    pub status: HealthStatus,
    /// Round-trip time of the probe, if one ran.
    pub response_time: Option<Duration>,
    /// Wall-clock time the probe finished.
    pub checked_at: Option<SystemTime>,
    /// Breaker state right after the probe was recorded.
    pub circuit_state: CircuitState,
    /// Why the probe failed.
    pub error: Option<StoreError>,
}

impl HealthSnapshot {
    /// Snapshot before any probe has run.
    pub fn unknown(circuit_state: CircuitState) -> Self {
        Self {
            status: HealthStatus::Unknown,
            response_time: None,
            checked_at: None,
            circuit_state,
            error: None,
        }
    }

    pub(crate) fn healthy(response_time: Duration, circuit_state: CircuitState) -> Self {
        Self {
            status: HealthStatus::Healthy,
            response_time: Some(response_time),
            checked_at: Some(SystemTime::now()),
            circuit_state,
            error: None,
        }
    }

    pub(crate) fn unhealthy(
        response_time: Duration,
        circuit_state: CircuitState,
        error: StoreError,
    ) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            response_time: Some(response_time),
            checked_at: Some(SystemTime::now()),
            circuit_state,
            error: Some(error),
        }
    }

    /// HTTP status for a readiness endpoint: 200 when healthy, 503 otherwise.
    pub fn http_status(&self) -> u16 {
        if self.status.is_healthy() {
            200
        } else {
            503
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_snapshot() {
        let snapshot = HealthSnapshot::unknown(CircuitState::Closed);
        assert_eq!(snapshot.status, HealthStatus::Unknown);
        assert!(snapshot.checked_at.is_none());
        assert_eq!(snapshot.http_status(), 503);
    }

    #[test]
    fn test_http_status() {
        let healthy = HealthSnapshot::healthy(Duration::from_millis(3), CircuitState::Closed);
        assert_eq!(healthy.http_status(), 200);

        let unhealthy = HealthSnapshot::unhealthy(
            Duration::from_millis(3),
            CircuitState::Open,
            StoreError::connection("refused"),
        );
        assert_eq!(unhealthy.http_status(), 503);
        assert_eq!(unhealthy.status.to_string(), "unhealthy");
    }
}
