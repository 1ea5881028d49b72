use crate::backoff::{exponential_floor, IntervalFunction, JitteredBackoff};
use std::time::Duration;

/// Per-call retry parameters.
///
/// A plain value: build one per call site (or clone a shared default) and
/// pass it by reference to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Delay after the first failed attempt, before jitter.
    pub base_delay: Duration,
    /// Upper bound on any single delay, jitter included.
    pub max_delay: Duration,
    /// Upper bound of the uniform jitter added to each delay.
    pub jitter_max: Duration,
    /// Time budget for one attempt.
    pub per_attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            jitter_max: Duration::from_millis(250),
            per_attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A default policy with the given attempt budget.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self::new(1)
    }

    /// Sets the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the delay cap.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the jitter bound. `Duration::ZERO` disables jitter.
    pub fn with_jitter_max(mut self, jitter: Duration) -> Self {
        self.jitter_max = jitter;
        self
    }

    /// Sets the per-attempt timeout.
    pub fn with_per_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.per_attempt_timeout = timeout;
        self
    }

    /// The attempt budget, never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after failed attempt `attempt` with jitter ignored.
    pub fn backoff_floor(&self, attempt: u32) -> Duration {
        exponential_floor(self.base_delay, attempt, self.max_delay)
    }

    /// Delay after failed attempt `attempt`, jitter included.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.interval_function().next_interval(attempt)
    }

    /// The interval function this policy describes.
    pub fn interval_function(&self) -> JitteredBackoff {
        JitteredBackoff::new(self.base_delay, self.max_delay, self.jitter_max)
    }
}
