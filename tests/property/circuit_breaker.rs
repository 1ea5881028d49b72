//! Property tests for the circuit breaker.
//!
//! Invariants tested:
//! - Opens exactly when the failure count reaches the threshold
//! - Successes while closed leave the failure count alone
//! - Rejects every call while the cooldown runs
//! - Half-opens on the first check after the cooldown
//! - One half-open success closes it with a zero count, one failure reopens it

use super::paused_runtime;
use proptest::prelude::*;
use std::time::Duration;
use storeguard::circuitbreaker::{CircuitBreaker, CircuitState};

fn breaker(threshold: u32, cooldown_ms: u64) -> CircuitBreaker {
    CircuitBreaker::builder()
        .failure_threshold(threshold)
        .cooldown(Duration::from_millis(cooldown_ms))
        .build()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: the circuit opens on the threshold-th failure, never before
    #[test]
    fn opens_exactly_at_threshold(threshold in 1u32..=20) {
        let rt = paused_runtime();
        rt.block_on(async {
            let breaker = breaker(threshold, 60_000);

            for recorded in 1..=threshold {
                breaker.record_failure();
                let expected = if recorded < threshold {
                    CircuitState::Closed
                } else {
                    CircuitState::Open
                };
                prop_assert_eq!(breaker.state(), expected, "after {} failures", recorded);
            }
            Ok(())
        })?;
    }

    /// Property: successes while closed do not reset the failure count
    #[test]
    fn successes_while_closed_keep_the_count(threshold in 2u32..=10) {
        let rt = paused_runtime();
        rt.block_on(async {
            let breaker = breaker(threshold, 60_000);
            for recorded in 1..threshold {
                breaker.record_failure();
                breaker.record_success();
                prop_assert_eq!(breaker.status().failure_count, recorded);
                prop_assert_eq!(breaker.state(), CircuitState::Closed);
            }
            breaker.record_failure();
            prop_assert_eq!(breaker.state(), CircuitState::Open);
            Ok(())
        })?;
    }

    /// Property: no call is admitted before the cooldown elapses, and the
    /// first check after it half-opens the circuit
    #[test]
    fn cooldown_gates_calls(
        cooldown_ms in 100u64..=120_000,
        probes in proptest::collection::vec(0u64..1_000, 1..10),
    ) {
        let rt = paused_runtime();
        rt.block_on(async {
            let breaker = breaker(1, cooldown_ms);
            breaker.record_failure();
            prop_assert_eq!(breaker.state(), CircuitState::Open);

            let mut waited = 0u64;
            for step in probes {
                let step = step.min(cooldown_ms - 1 - waited);
                tokio::time::advance(Duration::from_millis(step)).await;
                waited += step;
                prop_assert!(!breaker.should_allow(), "admitted after {}ms of {}ms", waited, cooldown_ms);
            }

            tokio::time::advance(Duration::from_millis(cooldown_ms - waited)).await;
            prop_assert!(breaker.should_allow());
            prop_assert_eq!(breaker.state(), CircuitState::HalfOpen);
            Ok(())
        })?;
    }

    /// Property: a half-open trial decides the next state on its own
    #[test]
    fn half_open_trial_decides(threshold in 1u32..=10, trial_succeeds in any::<bool>()) {
        let rt = paused_runtime();
        rt.block_on(async {
            let breaker = breaker(threshold, 1_000);
            for _ in 0..threshold {
                breaker.record_failure();
            }
            tokio::time::advance(Duration::from_millis(1_000)).await;
            prop_assert!(breaker.should_allow());

            let reopened_from = breaker.status().last_transition_at;
            if trial_succeeds {
                breaker.record_success();
                prop_assert_eq!(breaker.state(), CircuitState::Closed);
                prop_assert_eq!(breaker.status().failure_count, 0);
            } else {
                tokio::time::advance(Duration::from_millis(10)).await;
                breaker.record_failure();
                prop_assert_eq!(breaker.state(), CircuitState::Open);
                prop_assert!(breaker.status().last_transition_at > reopened_from);
            }
            Ok(())
        })?;
    }
}
