//! Property tests for the retry executor.
//!
//! Invariants tested:
//! - Never exceeds max_attempts
//! - Stops on the first success
//! - Non-retryable errors end the call after one attempt
//! - Exactly one breaker update per call

use super::paused_runtime;
use proptest::prelude::*;
use std::time::Duration;
use storeguard::circuitbreaker::CircuitBreaker;
use storeguard::retry::RetryExecutor;
use storeguard::{CallScope, OperationOutcome, RetryPolicy, StoreError};

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts)
        .with_base_delay(Duration::from_millis(10))
        .with_jitter_max(Duration::from_millis(5))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: a permanently transient failure uses the whole budget and
    /// no more
    #[test]
    fn respects_max_attempts(max_attempts in 1u32..=10) {
        let rt = paused_runtime();
        rt.block_on(async {
            let breaker = CircuitBreaker::builder().failure_threshold(100).build();
            let executor = RetryExecutor::new(breaker.clone());
            let mut calls = 0u32;

            let outcome = executor
                .execute(
                    || {
                        calls += 1;
                        async { Err::<(), _>(StoreError::connection("connection refused")) }
                    },
                    &policy(max_attempts),
                    &CallScope::new(),
                )
                .await;

            prop_assert!(outcome.is_retryable_failure());
            prop_assert_eq!(calls, max_attempts);
            prop_assert_eq!(breaker.status().failure_count, 1);
            Ok(())
        })?;
    }

    /// Property: success on attempt n stops retrying at n
    #[test]
    fn stops_on_success(max_attempts in 1u32..=10, succeed_at in 1u32..=10) {
        prop_assume!(succeed_at <= max_attempts);
        let rt = paused_runtime();
        rt.block_on(async {
            let executor = RetryExecutor::new(CircuitBreaker::default());
            let mut calls = 0u32;

            let outcome = executor
                .execute(
                    || {
                        calls += 1;
                        let attempt = calls;
                        async move {
                            if attempt < succeed_at {
                                Err(StoreError::driver(11600, "interrupted at shutdown"))
                            } else {
                                Ok(attempt)
                            }
                        }
                    },
                    &policy(max_attempts),
                    &CallScope::new(),
                )
                .await;

            prop_assert_eq!(outcome, OperationOutcome::Success(succeed_at));
            prop_assert_eq!(calls, succeed_at);
            Ok(())
        })?;
    }

    /// Property: a non-retryable error is returned unchanged after one call
    #[test]
    fn fatal_errors_are_not_retried(max_attempts in 1u32..=10, code in 20_000i32..30_000) {
        let rt = paused_runtime();
        rt.block_on(async {
            let executor = RetryExecutor::new(CircuitBreaker::default());
            let mut calls = 0u32;
            let error = StoreError::driver(code, "document failed validation");

            let outcome = executor
                .execute(
                    || {
                        calls += 1;
                        let error = error.clone();
                        async move { Err::<(), _>(error) }
                    },
                    &policy(max_attempts),
                    &CallScope::new(),
                )
                .await;

            prop_assert_eq!(outcome, OperationOutcome::FatalFailure(error));
            prop_assert_eq!(calls, 1);
            Ok(())
        })?;
    }
}
