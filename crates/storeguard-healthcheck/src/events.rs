use std::time::{Duration, Instant};
use storeguard_core::{StoreError, StoreEvent};

/// Events emitted by the health monitor.
#[derive(Debug, Clone)]
pub enum HealthEvent {
    /// The store answered the probe.
    ProbeSucceeded {
        name: String,
        timestamp: Instant,
        response_time: Duration,
    },
    /// The probe failed.
    ProbeFailed {
        name: String,
        timestamp: Instant,
        error: StoreError,
    },
    /// The probe succeeded but took longer than the slow threshold.
    SlowProbe {
        name: String,
        timestamp: Instant,
        response_time: Duration,
        threshold: Duration,
    },
}

impl StoreEvent for HealthEvent {
    fn event_type(&self) -> &'static str {
        match self {
            HealthEvent::ProbeSucceeded { .. } => "probe_succeeded",
            HealthEvent::ProbeFailed { .. } => "probe_failed",
            HealthEvent::SlowProbe { .. } => "slow_probe",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            HealthEvent::ProbeSucceeded { timestamp, .. }
            | HealthEvent::ProbeFailed { timestamp, .. }
            | HealthEvent::SlowProbe { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            HealthEvent::ProbeSucceeded { name, .. }
            | HealthEvent::ProbeFailed { name, .. }
            | HealthEvent::SlowProbe { name, .. } => name,
        }
    }
}
