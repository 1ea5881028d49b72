use crate::config::{ConfigError, ResilienceConfig};
use std::future::Future;
use std::sync::Arc;
use storeguard_circuitbreaker::{
    CircuitBreaker, CircuitBreakerConfigBuilder, CircuitBreakerEvent, CircuitBreakerStatus,
    CircuitState,
};
use storeguard_connection::{
    ConnectionConfigBuilder, ConnectionError, ConnectionEvent, ConnectionManager, ConnectionState,
    ConnectionStatus, Driver, ShutdownReport, ShutdownSignal,
};
use storeguard_core::{CallScope, OperationOutcome, StoreError};
use storeguard_healthcheck::{
    HealthEvent, HealthMonitor, HealthMonitorConfigBuilder, HealthSnapshot, HealthStatus,
};
use storeguard_retry::{
    RetryClassifier, RetryEvent, RetryExecutor, RetryPolicy, SharedRetryClassifier,
    TransientErrorClassifier,
};
use storeguard_stats::{
    PoolStats, StatsAlert, StatsCollector, StatsCollectorConfig, StatsCollectorConfigBuilder,
    StatsProvider,
};
use storeguard_transaction::{
    TransactionBreaker, TransactionEvent, TransactionOptions, TransactionOrchestrator,
    TransactionStep, TransactionalDriver,
};

type RetryListener = Box<dyn Fn(&RetryEvent) + Send + Sync>;
type TransactionListener = Arc<dyn Fn(&TransactionEvent) + Send + Sync>;

/// Per-call settings for [`StoreClient::execute_with_retry`].
#[derive(Debug, Clone, Default)]
pub struct OperationOptions {
    /// Overrides the client's default retry policy.
    pub retry: Option<RetryPolicy>,
    /// Cancellation and deadline for the whole call.
    pub scope: CallScope,
}

impl OperationOptions {
    /// Default policy, no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `policy` instead of the client default.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Runs the call inside `scope`.
    pub fn with_scope(mut self, scope: CallScope) -> Self {
        self.scope = scope;
        self
    }
}

/// Liveness and readiness, for orchestrator probes.
#[derive(Debug, Clone, PartialEq)]
pub struct Readiness {
    /// The client has not begun shutting down.
    pub live: bool,
    /// Connected, circuit not open and the last probe not unhealthy.
    pub ready: bool,
    /// Connection state at the time of the check.
    pub connection: ConnectionState,
    /// Breaker state at the time of the check.
    pub circuit: CircuitState,
    /// Latest health verdict.
    pub health: HealthStatus,
}

impl Readiness {
    /// 200 while live, 503 otherwise.
    pub fn liveness_status(&self) -> u16 {
        if self.live {
            200
        } else {
            503
        }
    }

    /// 200 while ready, 503 otherwise.
    pub fn readiness_status(&self) -> u16 {
        if self.ready {
            200
        } else {
            503
        }
    }
}

/// The single entry point collaborators use to reach the store.
///
/// Owns one connection manager, one circuit breaker, the retry executor
/// gated by it and a health monitor reporting into it. Clones share all of
/// them; separate clients built with [`StoreClient::builder`] share nothing.
pub struct StoreClient<D: Driver> {
    manager: ConnectionManager<D>,
    breaker: CircuitBreaker,
    executor: RetryExecutor,
    monitor: HealthMonitor<D>,
    retry_policy: RetryPolicy,
    transaction_breaker: TransactionBreaker,
    transaction_options: TransactionOptions,
    transaction_listeners: Arc<[TransactionListener]>,
    classifier: SharedRetryClassifier,
    stats_config: Arc<StatsCollectorConfig>,
    config: Arc<ResilienceConfig>,
    name: Arc<str>,
}

impl<D: Driver> Clone for StoreClient<D> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            breaker: self.breaker.clone(),
            executor: self.executor.clone(),
            monitor: self.monitor.clone(),
            retry_policy: self.retry_policy.clone(),
            transaction_breaker: self.transaction_breaker.clone(),
            transaction_options: self.transaction_options.clone(),
            transaction_listeners: Arc::clone(&self.transaction_listeners),
            classifier: Arc::clone(&self.classifier),
            stats_config: Arc::clone(&self.stats_config),
            config: Arc::clone(&self.config),
            name: Arc::clone(&self.name),
        }
    }
}

impl<D: Driver> StoreClient<D> {
    /// Starts building a client for `driver` configured by `config`.
    pub fn builder(driver: D, config: ResilienceConfig) -> StoreClientBuilder<D> {
        StoreClientBuilder::new(driver, config)
    }

    /// The client's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configuration the client was built from.
    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    /// The connection manager.
    pub fn manager(&self) -> &ConnectionManager<D> {
        &self.manager
    }

    /// The shared circuit breaker.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// The health monitor.
    pub fn health_monitor(&self) -> &HealthMonitor<D> {
        &self.monitor
    }

    /// Default retry policy for single operations.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Default options for transactions.
    pub fn transaction_options(&self) -> &TransactionOptions {
        &self.transaction_options
    }

    /// Connects to the store. See [`ConnectionManager::connect`].
    pub async fn connect(&self) -> Result<(), ConnectionError> {
        self.manager.connect().await.map(|_| ())
    }

    /// Stops health probing and closes the connection.
    pub async fn disconnect(&self) -> Result<(), StoreError> {
        self.monitor.stop();
        self.manager.disconnect().await
    }

    /// Refuses new work, drains in-flight operations and closes the
    /// connection. Idempotent.
    pub async fn graceful_shutdown(&self, signal: ShutdownSignal) -> ShutdownReport {
        self.monitor.stop();
        self.manager.graceful_shutdown(signal).await
    }

    /// Waits for SIGINT or SIGTERM, then shuts down gracefully.
    pub async fn shutdown_on_signal(&self) -> ShutdownReport {
        let signal = crate::signal::wait_for_signal().await;

        #[cfg(feature = "tracing")]
        tracing::info!(client = %self.name, %signal, "shutdown signal received");

        self.graceful_shutdown(signal).await
    }

    /// Starts periodic health probing.
    pub fn start_health_monitor(&self) {
        self.monitor.start();
    }

    /// Probes the store now and returns the verdict.
    pub async fn health_check(&self) -> HealthSnapshot {
        self.monitor.probe_now().await
    }

    /// The latest health verdict without probing.
    pub fn health_snapshot(&self) -> HealthSnapshot {
        self.monitor.snapshot()
    }

    /// Current connection status.
    pub fn connection_status(&self) -> ConnectionStatus {
        self.manager.status()
    }

    /// Current state of the shared breaker.
    pub fn circuit_breaker_status(&self) -> CircuitBreakerStatus {
        self.breaker.status()
    }

    /// Closes the shared breaker regardless of its state.
    pub fn force_circuit_breaker_reset(&self) {
        #[cfg(feature = "tracing")]
        tracing::warn!(client = %self.name, state = ?self.breaker.state(), "circuit breaker reset by operator");

        self.breaker.force_reset();
    }

    /// Liveness and readiness derived from connection, breaker and health.
    pub fn readiness(&self) -> Readiness {
        let status = self.manager.status();
        let circuit = self.breaker.state();
        let health = self.monitor.snapshot().status;
        let live = !status.shutting_down;

        Readiness {
            live,
            ready: live
                && status.is_connected()
                && circuit != CircuitState::Open
                && health != HealthStatus::Unhealthy,
            connection: status.state,
            circuit,
            health,
        }
    }

    /// Runs a single operation on the current connection behind the breaker,
    /// retrying transient failures.
    ///
    /// Each attempt receives the connection handle current at that moment,
    /// so an attempt after a reconnect uses the new connection. Once
    /// shutdown has begun the call is refused with
    /// [`StoreError::ShuttingDown`] without touching the breaker.
    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        mut operation: F,
        options: &OperationOptions,
    ) -> OperationOutcome<T>
    where
        F: FnMut(D::Connection) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let Some(_in_flight) = self.manager.track() else {
            return OperationOutcome::FatalFailure(StoreError::ShuttingDown);
        };
        let policy = options.retry.as_ref().unwrap_or(&self.retry_policy);

        self.executor
            .execute(
                || {
                    let attempt = self.manager.connection().map(&mut operation);
                    async move {
                        match attempt {
                            Ok(running) => running.await,
                            Err(error) => Err(error),
                        }
                    }
                },
                policy,
                &options.scope,
            )
            .await
    }
}

impl<D: TransactionalDriver> StoreClient<D> {
    /// Runs `steps` as one transaction, restarting from the first step on
    /// transient failures, and returns their results in order.
    pub async fn execute_with_transaction<T>(
        &self,
        steps: &[TransactionStep<D::Session, T>],
        options: &TransactionOptions,
        scope: &CallScope,
    ) -> OperationOutcome<Vec<T>> {
        let Some(_in_flight) = self.manager.track() else {
            return OperationOutcome::FatalFailure(StoreError::ShuttingDown);
        };
        self.orchestrator().run(steps, options, scope).await
    }

    fn orchestrator(&self) -> TransactionOrchestrator<D> {
        let mut builder = TransactionOrchestrator::builder(self.manager.clone(), self.breaker.clone())
            .breaker(self.transaction_breaker.clone())
            .shared_classifier(Arc::clone(&self.classifier))
            .name(format!("{}-transactions", self.name));
        for listener in self.transaction_listeners.iter() {
            let listener = Arc::clone(listener);
            builder = builder.on_event(move |event: &TransactionEvent| listener(event));
        }
        builder.build()
    }
}

impl<D: StatsProvider> StoreClient<D> {
    /// Reads pool and server statistics and evaluates alert thresholds.
    pub async fn collect_stats(&self) -> Result<PoolStats, StoreError> {
        StatsCollector::with_shared_config(self.manager.clone(), Arc::clone(&self.stats_config))
            .collect()
            .await
    }
}

/// Builder for a [`StoreClient`].
///
/// Component builders are seeded from the [`ResilienceConfig`]; the `on_*`
/// methods attach observers to them.
pub struct StoreClientBuilder<D: Driver> {
    driver: D,
    config: ResilienceConfig,
    name: String,
    classifier: SharedRetryClassifier,
    connection: ConnectionConfigBuilder,
    breaker: CircuitBreakerConfigBuilder,
    health: HealthMonitorConfigBuilder,
    stats: StatsCollectorConfigBuilder,
    retry_listeners: Vec<RetryListener>,
    transaction_listeners: Vec<TransactionListener>,
}

impl<D: Driver> StoreClientBuilder<D> {
    fn new(driver: D, config: ResilienceConfig) -> Self {
        Self {
            connection: config.connection(),
            breaker: config.circuit_breaker(),
            health: config.health_monitor(),
            stats: config.stats(),
            driver,
            config,
            name: String::from("store"),
            classifier: Arc::new(TransientErrorClassifier),
            retry_listeners: Vec::new(),
            transaction_listeners: Vec::new(),
        }
    }

    /// Names the client; component names derive from it.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the retry classifier for operations and transactions.
    pub fn classifier<C>(mut self, classifier: C) -> Self
    where
        C: RetryClassifier + 'static,
    {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Observes connection lifecycle events.
    pub fn on_connection_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        self.connection = self.connection.on_event(f);
        self
    }

    /// Observes circuit breaker events.
    pub fn on_circuit_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&CircuitBreakerEvent) + Send + Sync + 'static,
    {
        self.breaker = self.breaker.on_event(f);
        self
    }

    /// Observes retries and terminal outcomes of single operations.
    pub fn on_retry_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&RetryEvent) + Send + Sync + 'static,
    {
        self.retry_listeners.push(Box::new(f));
        self
    }

    /// Observes transaction commits and rollbacks.
    pub fn on_transaction_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&TransactionEvent) + Send + Sync + 'static,
    {
        self.transaction_listeners.push(Arc::new(f));
        self
    }

    /// Observes health probes.
    pub fn on_health_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&HealthEvent) + Send + Sync + 'static,
    {
        self.health = self.health.on_event(f);
        self
    }

    /// Observes statistics alerts.
    pub fn on_stats_alert<F>(mut self, f: F) -> Self
    where
        F: Fn(&StatsAlert) + Send + Sync + 'static,
    {
        self.stats = self.stats.on_alert(f);
        self
    }

    /// Validates the configuration and wires the components together.
    pub fn build(self) -> Result<StoreClient<D>, ConfigError> {
        self.config.validate()?;

        let name = self.name;
        let manager = ConnectionManager::new(
            self.driver,
            self.connection.name(format!("{name}-connection")).build(),
        );
        let breaker = self.breaker.name(format!("{name}-breaker")).build();

        let mut executor = RetryExecutor::builder(breaker.clone())
            .name(format!("{name}-operations"))
            .shared_classifier(Arc::clone(&self.classifier));
        for listener in self.retry_listeners {
            executor = executor.on_event(listener);
        }

        let monitor = HealthMonitor::new(
            manager.clone(),
            breaker.clone(),
            self.health.name(format!("{name}-health")).build(),
        );
        let stats_config = self.stats.name(format!("{name}-stats")).build();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            client = %name,
            endpoint = %self.config.endpoint(),
            environment = ?self.config.environment,
            transaction_breaker = ?self.config.transaction_breaker,
            "store client built"
        );

        Ok(StoreClient {
            transaction_breaker: self.config.transaction_breaker(&name),
            transaction_options: self.config.transaction_options(),
            retry_policy: self.config.retry_policy(),
            manager,
            breaker,
            executor: executor.build(),
            monitor,
            transaction_listeners: self.transaction_listeners.into(),
            classifier: self.classifier,
            stats_config: Arc::new(stats_config),
            config: Arc::new(self.config),
            name: Arc::from(name),
        })
    }
}
