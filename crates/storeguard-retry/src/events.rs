use std::time::{Duration, Instant};
use storeguard_core::{StoreError, StoreEvent};

/// Events emitted by the retry executor.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// An attempt failed with a retryable error; another follows after `delay`.
    Retry {
        name: String,
        timestamp: Instant,
        attempt: u32,
        delay: Duration,
        error: StoreError,
    },
    /// The operation succeeded, on the first try or after retries.
    Success {
        name: String,
        timestamp: Instant,
        attempts: u32,
    },
    /// Every attempt failed with a retryable error.
    Exhausted {
        name: String,
        timestamp: Instant,
        attempts: u32,
        error: StoreError,
    },
    /// A non-retryable error ended the call.
    Fatal {
        name: String,
        timestamp: Instant,
        attempts: u32,
        error: StoreError,
    },
    /// The breaker refused the call before any attempt.
    Rejected { name: String, timestamp: Instant },
    /// The caller's scope was cancelled or ran past its deadline.
    Interrupted {
        name: String,
        timestamp: Instant,
        attempts: u32,
        error: StoreError,
    },
}

impl StoreEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "success",
            RetryEvent::Exhausted { .. } => "exhausted",
            RetryEvent::Fatal { .. } => "fatal",
            RetryEvent::Rejected { .. } => "rejected",
            RetryEvent::Interrupted { .. } => "interrupted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Exhausted { timestamp, .. }
            | RetryEvent::Fatal { timestamp, .. }
            | RetryEvent::Rejected { timestamp, .. }
            | RetryEvent::Interrupted { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            RetryEvent::Retry { name, .. }
            | RetryEvent::Success { name, .. }
            | RetryEvent::Exhausted { name, .. }
            | RetryEvent::Fatal { name, .. }
            | RetryEvent::Rejected { name, .. }
            | RetryEvent::Interrupted { name, .. } => name,
        }
    }
}
