use crate::classifier::{RetryClassifier, SharedRetryClassifier, TransientErrorClassifier};
use crate::events::RetryEvent;
use crate::RetryExecutor;
use std::sync::Arc;
use std::time::Duration;
use storeguard_circuitbreaker::CircuitBreaker;
use storeguard_core::{EventListeners, FnListener, StoreError};

/// Builder for a [`RetryExecutor`].
pub struct RetryExecutorBuilder {
    breaker: CircuitBreaker,
    classifier: SharedRetryClassifier,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
}

impl RetryExecutorBuilder {
    pub(crate) fn new(breaker: CircuitBreaker) -> Self {
        Self {
            breaker,
            classifier: Arc::new(TransientErrorClassifier),
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Replaces the retry classifier.
    ///
    /// Default: [`TransientErrorClassifier`]
    pub fn classifier<C>(mut self, classifier: C) -> Self
    where
        C: RetryClassifier + 'static,
    {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Uses a classifier that is already shared with other executors.
    pub fn shared_classifier(mut self, classifier: SharedRetryClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Gives this executor a name for observability.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked before each backoff sleep with the
    /// failed attempt number and the chosen delay.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if let RetryEvent::Retry { attempt, delay, .. } = event {
                    f(*attempt, *delay);
                }
            }));
        self
    }

    /// Registers a callback invoked when a call succeeds.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if let RetryEvent::Success { attempts, .. } = event {
                    f(*attempts);
                }
            }));
        self
    }

    /// Registers a callback invoked when a call ends in failure, whatever
    /// the reason.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, &StoreError) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RetryEvent| match event {
                RetryEvent::Exhausted {
                    attempts, error, ..
                }
                | RetryEvent::Fatal {
                    attempts, error, ..
                }
                | RetryEvent::Interrupted {
                    attempts, error, ..
                } => f(*attempts, error),
                _ => {}
            }));
        self
    }

    /// Registers a listener for every retry event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&RetryEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    /// Builds the executor.
    pub fn build(self) -> RetryExecutor {
        RetryExecutor {
            breaker: self.breaker,
            classifier: self.classifier,
            event_listeners: Arc::new(self.event_listeners),
            name: Arc::from(self.name),
        }
    }
}
