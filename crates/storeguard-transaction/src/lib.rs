//! All-or-nothing multi-step transactions against a document store.
//!
//! [`TransactionOrchestrator::run`] executes an ordered list of
//! [`TransactionStep`]s inside one store transaction:
//!
//! 1. A session is opened and a transaction started with the configured
//!    read concern, write concern and commit bound.
//! 2. Steps run in order on that session. The first failing step aborts the
//!    transaction, so none of its writes are applied.
//! 3. The commit is bounded by `max_commit_time`.
//!
//! Attempts go through a breaker-gated [`RetryExecutor`]: an open circuit
//! rejects the call before any session is opened, and a transient failure
//! (a write conflict, a `TransientTransactionError` label, a lost connection)
//! restarts the whole sequence from the first step on a fresh session. The
//! session is released on every path, including when an attempt is dropped
//! by a timeout or cancellation.
//!
//! Whether transactions share the single-operation breaker is an explicit
//! choice, see [`TransactionBreaker`].

mod config;
mod driver;
mod events;
mod options;
mod session;
mod step;

pub use config::{TransactionBreaker, TransactionOrchestratorBuilder};
pub use driver::TransactionalDriver;
pub use events::TransactionEvent;
pub use options::{ReadConcern, TransactionOptions, WriteConcern};
pub use step::{step, TransactionStep};

use session::SessionGuard;
use std::sync::Arc;
use std::time::Instant;
use storeguard_circuitbreaker::CircuitBreaker;
use storeguard_connection::ConnectionManager;
use storeguard_core::{CallScope, EventListeners, OperationOutcome, StoreError};
use storeguard_retry::RetryExecutor;

/// Runs transactions with the retry and breaker discipline of single
/// operations.
pub struct TransactionOrchestrator<D: TransactionalDriver> {
    manager: ConnectionManager<D>,
    executor: RetryExecutor,
    event_listeners: Arc<EventListeners<TransactionEvent>>,
    name: Arc<str>,
}

impl<D: TransactionalDriver> Clone for TransactionOrchestrator<D> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            executor: self.executor.clone(),
            event_listeners: Arc::clone(&self.event_listeners),
            name: Arc::clone(&self.name),
        }
    }
}

impl<D: TransactionalDriver> TransactionOrchestrator<D> {
    /// Creates a builder. `shared_breaker` is the breaker single operations
    /// use; whether transactions report to it is set with
    /// [`TransactionOrchestratorBuilder::breaker`].
    pub fn builder(
        manager: ConnectionManager<D>,
        shared_breaker: CircuitBreaker,
    ) -> TransactionOrchestratorBuilder<D> {
        TransactionOrchestratorBuilder::new(manager, shared_breaker)
    }

    /// The breaker transactions report to.
    pub fn breaker(&self) -> &CircuitBreaker {
        self.executor.breaker()
    }

    /// The orchestrator's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs `steps` as one transaction and returns their results in order.
    pub async fn run<T>(
        &self,
        steps: &[TransactionStep<D::Session, T>],
        options: &TransactionOptions,
        scope: &CallScope,
    ) -> OperationOutcome<Vec<T>> {
        let mut attempts: u32 = 0;
        let outcome = self
            .executor
            .execute(
                || {
                    attempts += 1;
                    self.attempt(attempts, steps, options)
                },
                &options.retry,
                scope,
            )
            .await;

        if outcome.is_success() {
            #[cfg(feature = "tracing")]
            tracing::info!(
                orchestrator = %self.name,
                steps = steps.len(),
                attempts,
                "transaction committed"
            );

            self.event_listeners.emit(&TransactionEvent::Committed {
                name: self.name.to_string(),
                timestamp: Instant::now(),
                steps: steps.len(),
                attempts,
            });
        }
        outcome
    }

    async fn attempt<T>(
        &self,
        attempt: u32,
        steps: &[TransactionStep<D::Session, T>],
        options: &TransactionOptions,
    ) -> Result<Vec<T>, StoreError> {
        let connection = self.manager.connection()?;
        let driver = self.manager.driver();
        let session = driver.start_session(&connection).await?;
        let mut guard = SessionGuard::new(Arc::clone(driver), session);

        match self.apply(&mut guard, steps, options).await {
            Ok(values) => {
                guard.finish().await;
                Ok(values)
            }
            Err(error) => {
                guard.abort().await;

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    orchestrator = %self.name,
                    attempt,
                    error = %error,
                    "transaction rolled back"
                );

                self.event_listeners.emit(&TransactionEvent::RolledBack {
                    name: self.name.to_string(),
                    timestamp: Instant::now(),
                    attempt,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    async fn apply<T>(
        &self,
        guard: &mut SessionGuard<D>,
        steps: &[TransactionStep<D::Session, T>],
        options: &TransactionOptions,
    ) -> Result<Vec<T>, StoreError> {
        let driver = self.manager.driver();
        driver.start_transaction(guard.session()?, options)?;
        guard.mark_in_transaction();

        let mut values = Vec::with_capacity(steps.len());
        for step in steps {
            values.push(step(guard.session()?).await?);
        }

        let commit = driver.commit_transaction(guard.session()?);
        match tokio::time::timeout(options.max_commit_time, commit).await {
            Ok(result) => result?,
            Err(_) => return Err(StoreError::Timeout(options.max_commit_time)),
        }
        Ok(values)
    }
}

impl<D: TransactionalDriver> std::fmt::Debug for TransactionOrchestrator<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionOrchestrator")
            .field("name", &self.name)
            .field("breaker", self.executor.breaker())
            .finish()
    }
}
