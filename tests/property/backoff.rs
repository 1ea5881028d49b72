//! Property tests for backoff delays.
//!
//! Invariants tested:
//! - Without jitter the delay after attempt k is min(base * 2^(k-1), max)
//! - With jitter the delay lies in [floor, floor + jitter], capped at max

use proptest::prelude::*;
use std::time::Duration;
use storeguard::retry::{ExponentialBackoff, IntervalFunction};
use storeguard::RetryPolicy;

fn expected_floor(base_ms: u64, attempt: u32, max_ms: u64) -> u64 {
    let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
    base_ms.saturating_mul(factor).min(max_ms)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: the jitter-free delay doubles per attempt up to the cap
    #[test]
    fn floor_doubles_and_caps(
        base_ms in 1u64..=5_000,
        max_ms in 1u64..=120_000,
        attempt in 1u32..=40,
    ) {
        let policy = RetryPolicy::new(50)
            .with_base_delay(Duration::from_millis(base_ms))
            .with_max_delay(Duration::from_millis(max_ms))
            .with_jitter_max(Duration::ZERO);

        let expected = Duration::from_millis(expected_floor(base_ms, attempt, max_ms));
        prop_assert_eq!(policy.backoff_floor(attempt), expected);
        prop_assert_eq!(policy.backoff(attempt), expected);

        let connect = ExponentialBackoff::new(Duration::from_millis(base_ms))
            .max_interval(Duration::from_millis(max_ms));
        prop_assert_eq!(connect.next_interval(attempt), expected);
    }

    /// Property: jittered delays stay within [floor, floor + jitter_max]
    #[test]
    fn jitter_stays_in_bounds(
        base_ms in 1u64..=5_000,
        max_ms in 1u64..=120_000,
        jitter_ms in 0u64..=1_000,
        attempt in 1u32..=20,
    ) {
        let policy = RetryPolicy::new(50)
            .with_base_delay(Duration::from_millis(base_ms))
            .with_max_delay(Duration::from_millis(max_ms))
            .with_jitter_max(Duration::from_millis(jitter_ms));

        let floor = policy.backoff_floor(attempt);
        let ceiling = (floor + Duration::from_millis(jitter_ms)).min(Duration::from_millis(max_ms));
        for _ in 0..20 {
            let delay = policy.backoff(attempt);
            prop_assert!(delay >= floor, "{:?} below floor {:?}", delay, floor);
            prop_assert!(delay <= ceiling, "{:?} above ceiling {:?}", delay, ceiling);
        }
    }
}
