//! Breaker-gated retry execution for document-store operations.
//!
//! [`RetryExecutor::execute`] runs an async operation under a
//! [`RetryPolicy`]:
//!
//! 1. The circuit breaker is consulted once. If it refuses, the outcome is
//!    [`OperationOutcome::CircuitOpen`] and the operation is never invoked.
//! 2. Attempts run strictly one after another, each bounded by the policy's
//!    per-attempt timeout.
//! 3. Retryable failures (see [`TransientErrorClassifier`]) are retried
//!    after `min(base * 2^(attempt-1) + jitter, max_delay)` until the attempt
//!    budget runs out. Anything else ends the call on first occurrence.
//! 4. The call reports exactly one outcome to the breaker: a success, or a
//!    single failure however many attempts were made. Dropping the
//!    `execute` future mid-call reports a failure.
//!
//! The caller's [`CallScope`] bounds the whole sequence. Cancelling it, or
//! letting its deadline pass, drops the in-flight attempt or backoff sleep at
//! once.
//!
//! # Example
//!
//! ```
//! use storeguard_circuitbreaker::CircuitBreaker;
//! use storeguard_core::{CallScope, OperationOutcome, StoreError};
//! use storeguard_retry::{RetryExecutor, RetryPolicy};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let executor = RetryExecutor::builder(CircuitBreaker::default())
//!     .name("catalog")
//!     .on_retry(|attempt, delay| println!("attempt {attempt} failed, retrying in {delay:?}"))
//!     .build();
//!
//! let policy = RetryPolicy::new(3).with_base_delay(Duration::from_millis(10));
//! let outcome = executor
//!     .execute(|| async { Ok::<_, StoreError>(42) }, &policy, &CallScope::new())
//!     .await;
//! assert_eq!(outcome, OperationOutcome::Success(42));
//! # }
//! ```

mod backoff;
mod classifier;
mod config;
mod events;
mod policy;

pub use backoff::{exponential_floor, ExponentialBackoff, IntervalFunction, JitteredBackoff};
pub use classifier::{
    FnClassifier, RetryClassifier, SharedRetryClassifier, TransientErrorClassifier,
    TRANSIENT_ERROR_CODES, TRANSIENT_LABELS,
};
pub use config::RetryExecutorBuilder;
pub use events::RetryEvent;
pub use policy::RetryPolicy;

#[cfg(feature = "metrics")]
use metrics::counter;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use storeguard_circuitbreaker::{CallPermit, CircuitBreaker};
use storeguard_core::{CallScope, EventListeners, OperationOutcome, StoreError};

/// Runs store operations behind the circuit breaker with bounded retries.
#[derive(Clone)]
pub struct RetryExecutor {
    breaker: CircuitBreaker,
    classifier: SharedRetryClassifier,
    event_listeners: Arc<EventListeners<RetryEvent>>,
    name: Arc<str>,
}

impl RetryExecutor {
    /// Creates a builder for an executor gated by `breaker`.
    pub fn builder(breaker: CircuitBreaker) -> RetryExecutorBuilder {
        RetryExecutorBuilder::new(breaker)
    }

    /// Creates an executor with the default classifier and no listeners.
    pub fn new(breaker: CircuitBreaker) -> Self {
        Self::builder(breaker).build()
    }

    /// The breaker gating this executor.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// The retry classifier in use.
    pub fn classifier(&self) -> &SharedRetryClassifier {
        &self.classifier
    }

    /// The executor's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs `operation` until it succeeds, fails fatally, exhausts the
    /// policy or is interrupted by `scope`.
    pub async fn execute<T, F, Fut>(
        &self,
        mut operation: F,
        policy: &RetryPolicy,
        scope: &CallScope,
    ) -> OperationOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        // Nothing was admitted yet, so the breaker is left untouched.
        if let Some(interruption) = scope.interruption() {
            self.emit_terminal(FailureKind::Interrupted, 0, &interruption);
            return OperationOutcome::FatalFailure(interruption);
        }

        let Some(permit) = self.breaker.try_acquire() else {
            #[cfg(feature = "tracing")]
            tracing::debug!(executor = %self.name, breaker = self.breaker.name(), "call rejected by open circuit");
            #[cfg(feature = "metrics")]
            counter!("retry_calls_total", "executor" => self.name.to_string(), "outcome" => "rejected")
                .increment(1);
            self.event_listeners.emit(&RetryEvent::Rejected {
                name: self.name.to_string(),
                timestamp: Instant::now(),
            });
            return OperationOutcome::CircuitOpen;
        };

        let max_attempts = policy.attempts();
        let mut attempt: u32 = 1;

        loop {
            let attempt_result = scope
                .run(tokio::time::timeout(policy.per_attempt_timeout, operation()))
                .await;

            let error = match attempt_result {
                Ok(Ok(Ok(value))) => {
                    permit.record_success();
                    #[cfg(feature = "metrics")]
                    counter!("retry_calls_total", "executor" => self.name.to_string(), "outcome" => "success")
                        .increment(1);
                    self.event_listeners.emit(&RetryEvent::Success {
                        name: self.name.to_string(),
                        timestamp: Instant::now(),
                        attempts: attempt,
                    });
                    return OperationOutcome::Success(value);
                }
                Ok(Ok(Err(error))) => error,
                Ok(Err(_elapsed)) => StoreError::Timeout(policy.per_attempt_timeout),
                Err(interruption) => return self.interrupted(permit, interruption, attempt),
            };

            if !self.classifier.is_retryable(&error) {
                permit.record_failure();
                self.emit_terminal(FailureKind::Fatal, attempt, &error);
                return OperationOutcome::FatalFailure(error);
            }

            if attempt >= max_attempts {
                permit.record_failure();
                self.emit_terminal(FailureKind::Exhausted, attempt, &error);
                return OperationOutcome::RetryableFailure {
                    error,
                    attempts: attempt,
                };
            }

            let delay = policy.backoff(attempt);

            #[cfg(feature = "tracing")]
            tracing::debug!(
                executor = %self.name,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retryable failure, backing off"
            );
            #[cfg(feature = "metrics")]
            counter!("retry_attempts_total", "executor" => self.name.to_string()).increment(1);

            self.event_listeners.emit(&RetryEvent::Retry {
                name: self.name.to_string(),
                timestamp: Instant::now(),
                attempt,
                delay,
                error,
            });

            if let Err(interruption) = scope.sleep(delay).await {
                return self.interrupted(permit, interruption, attempt);
            }
            attempt += 1;
        }
    }

    fn interrupted<T>(
        &self,
        permit: CallPermit,
        interruption: StoreError,
        attempts: u32,
    ) -> OperationOutcome<T> {
        permit.record_failure();
        self.emit_terminal(FailureKind::Interrupted, attempts, &interruption);
        OperationOutcome::FatalFailure(interruption)
    }

    fn emit_terminal(&self, kind: FailureKind, attempts: u32, error: &StoreError) {
        #[cfg(feature = "tracing")]
        tracing::warn!(executor = %self.name, attempts, outcome = kind.as_str(), error = %error, "operation failed");
        #[cfg(feature = "metrics")]
        counter!("retry_calls_total", "executor" => self.name.to_string(), "outcome" => kind.as_str())
            .increment(1);

        let name = self.name.to_string();
        let timestamp = Instant::now();
        let error = error.clone();
        let event = match kind {
            FailureKind::Fatal => RetryEvent::Fatal {
                name,
                timestamp,
                attempts,
                error,
            },
            FailureKind::Exhausted => RetryEvent::Exhausted {
                name,
                timestamp,
                attempts,
                error,
            },
            FailureKind::Interrupted => RetryEvent::Interrupted {
                name,
                timestamp,
                attempts,
                error,
            },
        };
        self.event_listeners.emit(&event);
    }
}

#[derive(Debug, Clone, Copy)]
enum FailureKind {
    Fatal,
    Exhausted,
    Interrupted,
}

impl FailureKind {
    #[cfg(any(feature = "tracing", feature = "metrics"))]
    fn as_str(self) -> &'static str {
        match self {
            FailureKind::Fatal => "fatal",
            FailureKind::Exhausted => "exhausted",
            FailureKind::Interrupted => "interrupted",
        }
    }
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("name", &self.name)
            .field("breaker", &self.breaker)
            .finish()
    }
}
