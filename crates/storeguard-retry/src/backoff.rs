use std::time::Duration;

/// Abstraction for computing retry intervals.
pub trait IntervalFunction: Send + Sync {
    /// Computes the delay after the given failed attempt.
    ///
    /// `attempt` is 1-based: the delay before the second attempt is
    /// `next_interval(1)`.
    fn next_interval(&self, attempt: u32) -> Duration;
}

/// Returns `min(base * 2^(attempt-1), max)` without overflowing.
pub fn exponential_floor(base: Duration, attempt: u32, max: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(Duration::MAX).min(max)
}

/// Doubling backoff capped at a maximum.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    max_interval: Duration,
}

impl ExponentialBackoff {
    /// Creates a doubling backoff starting at `initial_interval`, uncapped.
    pub fn new(initial_interval: Duration) -> Self {
        Self {
            initial_interval,
            max_interval: Duration::MAX,
        }
    }

    /// Sets the maximum interval.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn next_interval(&self, attempt: u32) -> Duration {
        exponential_floor(self.initial_interval, attempt, self.max_interval)
    }
}

/// Doubling backoff with additive random jitter.
///
/// The delay after attempt `k` is
/// `min(initial * 2^(k-1) + uniform(0, jitter_max), max_interval)`.
#[derive(Debug, Clone)]
pub struct JitteredBackoff {
    initial_interval: Duration,
    max_interval: Duration,
    jitter_max: Duration,
}

impl JitteredBackoff {
    /// Creates a jittered backoff.
    pub fn new(initial_interval: Duration, max_interval: Duration, jitter_max: Duration) -> Self {
        Self {
            initial_interval,
            max_interval,
            jitter_max,
        }
    }

    fn jitter(&self) -> Duration {
        use rand::Rng;
        if self.jitter_max.is_zero() {
            return Duration::ZERO;
        }
        let max_nanos = u64::try_from(self.jitter_max.as_nanos()).unwrap_or(u64::MAX);
        Duration::from_nanos(rand::rng().random_range(0..=max_nanos))
    }
}

impl IntervalFunction for JitteredBackoff {
    fn next_interval(&self, attempt: u32) -> Duration {
        let floor = exponential_floor(self.initial_interval, attempt, self.max_interval);
        floor.saturating_add(self.jitter()).min(self.max_interval)
    }
}
