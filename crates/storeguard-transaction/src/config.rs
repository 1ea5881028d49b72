use crate::driver::TransactionalDriver;
use crate::events::TransactionEvent;
use crate::TransactionOrchestrator;
use std::sync::Arc;
use storeguard_circuitbreaker::CircuitBreaker;
use storeguard_connection::ConnectionManager;
use storeguard_core::{EventListeners, FnListener, StoreError};
use storeguard_retry::{
    RetryClassifier, RetryExecutor, SharedRetryClassifier, TransientErrorClassifier,
};

/// Which breaker transactions report to.
#[derive(Debug, Clone, Default)]
pub enum TransactionBreaker {
    /// The breaker single operations use. A run of failing transactions
    /// then also stops plain reads and writes.
    #[default]
    Shared,
    /// A breaker of its own, with its own threshold and cooldown.
    Dedicated(CircuitBreaker),
}

impl TransactionBreaker {
    /// Picks the breaker to use given the client's shared one.
    pub fn resolve(self, shared: &CircuitBreaker) -> CircuitBreaker {
        match self {
            TransactionBreaker::Shared => shared.clone(),
            TransactionBreaker::Dedicated(breaker) => breaker,
        }
    }
}

/// Builder for a [`TransactionOrchestrator`].
pub struct TransactionOrchestratorBuilder<D: TransactionalDriver> {
    manager: ConnectionManager<D>,
    shared_breaker: CircuitBreaker,
    breaker: TransactionBreaker,
    classifier: SharedRetryClassifier,
    event_listeners: EventListeners<TransactionEvent>,
    name: String,
}

impl<D: TransactionalDriver> TransactionOrchestratorBuilder<D> {
    pub(crate) fn new(manager: ConnectionManager<D>, shared_breaker: CircuitBreaker) -> Self {
        Self {
            manager,
            shared_breaker,
            breaker: TransactionBreaker::Shared,
            classifier: Arc::new(TransientErrorClassifier),
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Chooses the breaker transactions report to.
    ///
    /// Default: [`TransactionBreaker::Shared`]
    pub fn breaker(mut self, breaker: TransactionBreaker) -> Self {
        self.breaker = breaker;
        self
    }

    /// Replaces the retry classifier.
    pub fn classifier<C>(mut self, classifier: C) -> Self
    where
        C: RetryClassifier + 'static,
    {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Uses a classifier shared with other executors.
    pub fn shared_classifier(mut self, classifier: SharedRetryClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Gives this orchestrator a name for observability.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked after a commit with the number of steps
    /// and the attempts it took.
    pub fn on_committed<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, u32) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &TransactionEvent| {
                if let TransactionEvent::Committed { steps, attempts, .. } = event {
                    f(*steps, *attempts);
                }
            }));
        self
    }

    /// Registers a callback invoked whenever an attempt is rolled back.
    pub fn on_rolled_back<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, &StoreError) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &TransactionEvent| {
                if let TransactionEvent::RolledBack { attempt, error, .. } = event {
                    f(*attempt, error);
                }
            }));
        self
    }

    /// Registers a listener for every transaction event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&TransactionEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    /// Builds the orchestrator.
    pub fn build(self) -> TransactionOrchestrator<D> {
        let breaker = self.breaker.resolve(&self.shared_breaker);
        let executor = RetryExecutor::builder(breaker)
            .name(self.name.clone())
            .shared_classifier(self.classifier)
            .build();

        TransactionOrchestrator {
            manager: self.manager,
            executor,
            event_listeners: Arc::new(self.event_listeners),
            name: Arc::from(self.name),
        }
    }
}
