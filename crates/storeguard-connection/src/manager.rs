use crate::config::{ConnectionConfig, ExhaustionMode};
use crate::driver::{Driver, DriverEvent, DriverEventSender};
use crate::error::ConnectionError;
use crate::events::ConnectionEvent;
use crate::shutdown::{InFlight, InFlightGuard, ShutdownReport, ShutdownSignal};
use crate::state::{ConnectionState, ConnectionStatus};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use storeguard_core::StoreError;
use storeguard_retry::{ExponentialBackoff, IntervalFunction};
use tokio::sync::{mpsc, OnceCell};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

struct Slot<C> {
    state: ConnectionState,
    connection: Option<C>,
    attempt_count: u32,
    last_error: Option<StoreError>,
    degraded: bool,
    recovering: bool,
    shutting_down: bool,
    connected_at: Option<Instant>,
}

struct Inner<D: Driver> {
    driver: Arc<D>,
    config: ConnectionConfig,
    backoff: ExponentialBackoff,
    slot: Mutex<Slot<D::Connection>>,
    // Serializes connection attempts; held across awaits.
    connect_lock: tokio::sync::Mutex<()>,
    in_flight: Arc<InFlight>,
    shutdown: CancellationToken,
    shutdown_report: OnceCell<ShutdownReport>,
    events_tx: mpsc::UnboundedSender<DriverEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<DriverEvent>>>,
}

impl<D: Driver> Inner<D> {
    fn slot(&self) -> MutexGuard<'_, Slot<D::Connection>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<D: Driver> Drop for Inner<D> {
    fn drop(&mut self) {
        // Stops the supervisor and any recovery loop.
        self.shutdown.cancel();
    }
}

/// Owns the store connection and its lifecycle.
///
/// The manager establishes the connection with capped exponential backoff,
/// reconnects automatically when the driver reports a lost connection, and
/// drains in-flight work during graceful shutdown. All state lives in the
/// instance; clones share it.
pub struct ConnectionManager<D: Driver> {
    inner: Arc<Inner<D>>,
}

impl<D: Driver> Clone for ConnectionManager<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: Driver> ConnectionManager<D> {
    /// Creates a manager that owns `driver`.
    pub fn new(driver: D, config: ConnectionConfig) -> Self {
        Self::with_shared_driver(Arc::new(driver), config)
    }

    /// Creates a manager around a driver that is shared with other code.
    pub fn with_shared_driver(driver: Arc<D>, config: ConnectionConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let backoff = ExponentialBackoff::new(config.base_delay).max_interval(config.max_delay);

        Self {
            inner: Arc::new(Inner {
                driver,
                backoff,
                slot: Mutex::new(Slot {
                    state: ConnectionState::Disconnected,
                    connection: None,
                    attempt_count: 0,
                    last_error: None,
                    degraded: false,
                    recovering: false,
                    shutting_down: false,
                    connected_at: None,
                }),
                connect_lock: tokio::sync::Mutex::new(()),
                in_flight: Arc::new(InFlight::default()),
                shutdown: CancellationToken::new(),
                shutdown_report: OnceCell::new(),
                events_tx,
                events_rx: Mutex::new(Some(events_rx)),
                config,
            }),
        }
    }

    /// The underlying driver.
    pub fn driver(&self) -> &Arc<D> {
        &self.inner.driver
    }

    /// The manager's configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// The manager's name.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// A sender for driver lifecycle events, for drivers that report
    /// independently of `connect`.
    pub fn event_sender(&self) -> DriverEventSender {
        DriverEventSender::new(self.inner.events_tx.clone())
    }

    /// A token cancelled when graceful shutdown begins.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.child_token()
    }

    fn slot(&self) -> MutexGuard<'_, Slot<D::Connection>> {
        self.inner.slot()
    }

    fn emit(&self, event: ConnectionEvent) {
        self.inner.config.event_listeners.emit(&event);
    }

    fn now() -> std::time::Instant {
        std::time::Instant::now()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.slot().state
    }

    /// Returns true if graceful shutdown has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.slot().shutting_down
    }

    /// Snapshot of the connection status.
    pub fn status(&self) -> ConnectionStatus {
        let slot = self.slot();
        ConnectionStatus {
            state: slot.state,
            attempt_count: slot.attempt_count,
            last_error: slot.last_error.clone(),
            endpoint: self.inner.config.endpoint.clone(),
            shutting_down: slot.shutting_down,
            degraded: slot.degraded,
            in_flight: self.inner.in_flight.count(),
            connected_for: slot.connected_at.map(|at| at.elapsed()),
        }
    }

    /// Returns the live connection handle.
    ///
    /// While shutdown drains, operations already in flight keep getting the
    /// handle until it is closed.
    pub fn connection(&self) -> Result<D::Connection, StoreError> {
        let slot = self.slot();
        match (&slot.connection, slot.shutting_down) {
            (Some(connection), _) => Ok(connection.clone()),
            (None, true) => Err(StoreError::ShuttingDown),
            (None, false) => Err(StoreError::connection(format!(
                "not connected to {} (state {})",
                self.inner.config.endpoint, slot.state
            ))),
        }
    }

    /// Registers an in-flight operation. Returns `None` once shutdown has
    /// begun.
    pub fn track(&self) -> Option<InFlightGuard> {
        let slot = self.slot();
        if slot.shutting_down {
            return None;
        }
        Some(self.inner.in_flight.enter())
    }

    /// Establishes the connection, retrying with capped exponential backoff.
    ///
    /// Returns the existing handle if already connected. After
    /// `max_retries` failed attempts the result depends on the configured
    /// [`ExhaustionMode`].
    pub async fn connect(&self) -> Result<D::Connection, ConnectionError> {
        self.ensure_supervisor();
        let _serial = self.inner.connect_lock.lock().await;

        {
            let slot = self.slot();
            if slot.shutting_down {
                return Err(ConnectionError::ShuttingDown);
            }
            if let (ConnectionState::Connected, Some(connection)) =
                (slot.state, slot.connection.as_ref())
            {
                return Ok(connection.clone());
            }
        }

        let max_attempts = self.inner.config.max_retries.max(1);
        let mut last_error = StoreError::connection("no connection attempt made");

        for attempt in 1..=max_attempts {
            let error = match self.attempt_once(attempt).await {
                Ok(connection) => return Ok(connection),
                Err(StoreError::ShuttingDown) => return Err(ConnectionError::ShuttingDown),
                Err(error) => error,
            };

            let retry_in =
                (attempt < max_attempts).then(|| self.inner.backoff.next_interval(attempt));

            #[cfg(feature = "tracing")]
            tracing::warn!(
                manager = %self.inner.config.name,
                endpoint = %self.inner.config.endpoint,
                attempt,
                max_attempts,
                retry_in = ?retry_in,
                error = %error,
                "connection attempt failed"
            );

            self.emit(ConnectionEvent::ConnectFailed {
                name: self.inner.config.name.clone(),
                timestamp: Self::now(),
                attempt,
                error: error.clone(),
                retry_in,
            });
            last_error = error;

            if let Some(delay) = retry_in {
                tokio::select! {
                    _ = self.inner.shutdown.cancelled() => return Err(ConnectionError::ShuttingDown),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        match self.inner.config.exhaustion_mode {
            ExhaustionMode::Degrade => {
                self.slot().degraded = true;

                #[cfg(feature = "tracing")]
                tracing::error!(
                    manager = %self.inner.config.name,
                    endpoint = %self.inner.config.endpoint,
                    attempts = max_attempts,
                    "store unreachable, continuing in degraded mode"
                );

                self.emit(ConnectionEvent::Degraded {
                    name: self.inner.config.name.clone(),
                    timestamp: Self::now(),
                    attempts: max_attempts,
                });
                self.spawn_recovery();

                Err(ConnectionError::Degraded {
                    attempts: max_attempts,
                    last_error,
                })
            }
            ExhaustionMode::FailFast => {
                #[cfg(feature = "tracing")]
                tracing::error!(
                    manager = %self.inner.config.name,
                    endpoint = %self.inner.config.endpoint,
                    attempts = max_attempts,
                    "store unreachable, giving up"
                );

                Err(ConnectionError::RetriesExhausted {
                    attempts: max_attempts,
                    last_error,
                })
            }
        }
    }

    async fn attempt_once(&self, attempt: u32) -> Result<D::Connection, StoreError> {
        {
            let mut slot = self.slot();
            if slot.shutting_down {
                return Err(StoreError::ShuttingDown);
            }
            slot.state = ConnectionState::Connecting;
            slot.attempt_count = attempt;
        }

        self.emit(ConnectionEvent::Connecting {
            name: self.inner.config.name.clone(),
            timestamp: Self::now(),
            attempt,
        });

        let timeout = self.inner.config.connect_timeout;
        let connecting = self
            .inner
            .driver
            .connect(&self.inner.config.endpoint, self.event_sender());

        let result = tokio::select! {
            _ = self.inner.shutdown.cancelled() => Err(StoreError::ShuttingDown),
            result = tokio::time::timeout(timeout, connecting) => match result {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout(timeout)),
            },
        };

        match result {
            Ok(connection) => {
                let accepted = {
                    let mut slot = self.slot();
                    if slot.shutting_down {
                        false
                    } else {
                        slot.state = ConnectionState::Connected;
                        slot.connection = Some(connection.clone());
                        slot.attempt_count = 0;
                        slot.last_error = None;
                        slot.degraded = false;
                        slot.connected_at = Some(Instant::now());
                        true
                    }
                };

                if !accepted {
                    let _ = self.inner.driver.close(connection).await;
                    return Err(StoreError::ShuttingDown);
                }

                #[cfg(feature = "tracing")]
                tracing::info!(
                    manager = %self.inner.config.name,
                    endpoint = %self.inner.config.endpoint,
                    attempts = attempt,
                    "connected to store"
                );

                self.emit(ConnectionEvent::Connected {
                    name: self.inner.config.name.clone(),
                    timestamp: Self::now(),
                    attempts: attempt,
                });
                Ok(connection)
            }
            Err(error) => {
                let mut slot = self.slot();
                if !slot.shutting_down {
                    slot.state = ConnectionState::Disconnected;
                }
                slot.last_error = Some(error.clone());
                Err(error)
            }
        }
    }

    /// Closes the connection without entering shutdown. A later `connect`
    /// opens a fresh one.
    pub async fn disconnect(&self) -> Result<(), StoreError> {
        let _serial = self.inner.connect_lock.lock().await;

        let connection = {
            let mut slot = self.slot();
            if !slot.shutting_down {
                slot.state = ConnectionState::Disconnected;
            }
            slot.degraded = false;
            slot.connected_at = None;
            slot.connection.take()
        };

        let Some(connection) = connection else {
            return Ok(());
        };

        #[cfg(feature = "tracing")]
        tracing::info!(manager = %self.inner.config.name, "closing store connection");

        let result = self.inner.driver.close(connection).await;
        self.emit(ConnectionEvent::Disconnected {
            name: self.inner.config.name.clone(),
            timestamp: Self::now(),
            reason: String::from("closed by client"),
        });
        result
    }

    /// Stops accepting work, waits up to the drain timeout for in-flight
    /// operations, then closes the connection.
    ///
    /// Cancels the [`shutdown_token`](Self::shutdown_token), which stops the
    /// health monitor and any reconnection in progress. Calling this more
    /// than once returns the first report.
    pub async fn graceful_shutdown(&self, signal: ShutdownSignal) -> ShutdownReport {
        self.inner
            .shutdown_report
            .get_or_init(|| self.run_shutdown(signal))
            .await
            .clone()
    }

    async fn run_shutdown(&self, signal: ShutdownSignal) -> ShutdownReport {
        {
            let mut slot = self.slot();
            slot.shutting_down = true;
            slot.state = ConnectionState::Disconnecting;
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            manager = %self.inner.config.name,
            %signal,
            in_flight = self.inner.in_flight.count(),
            "graceful shutdown started"
        );

        self.emit(ConnectionEvent::ShutdownStarted {
            name: self.inner.config.name.clone(),
            timestamp: Self::now(),
            signal,
        });
        self.inner.shutdown.cancel();

        let started = Instant::now();
        let drain_timeout = self.inner.config.drain_timeout;
        let drained = tokio::time::timeout(drain_timeout, self.inner.in_flight.wait_idle())
            .await
            .is_ok();
        let abandoned = self.inner.in_flight.count();
        let drain_time = started.elapsed();

        #[cfg(feature = "tracing")]
        if !drained {
            tracing::warn!(
                manager = %self.inner.config.name,
                abandoned,
                "drain timeout elapsed, force-closing connection"
            );
        }

        let connection = self.slot().connection.take();
        let close_error = match connection {
            Some(connection) => {
                let close_timeout = self.inner.config.connect_timeout;
                match tokio::time::timeout(close_timeout, self.inner.driver.close(connection)).await
                {
                    Ok(Ok(())) => None,
                    Ok(Err(error)) => Some(error),
                    Err(_) => Some(StoreError::Timeout(close_timeout)),
                }
            }
            None => None,
        };

        {
            let mut slot = self.slot();
            slot.state = ConnectionState::Disconnected;
            slot.connected_at = None;
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            manager = %self.inner.config.name,
            drained,
            abandoned,
            drain_ms = drain_time.as_millis() as u64,
            "graceful shutdown completed"
        );

        self.emit(ConnectionEvent::ShutdownCompleted {
            name: self.inner.config.name.clone(),
            timestamp: Self::now(),
            drained,
            abandoned,
        });

        ShutdownReport {
            signal,
            drained,
            abandoned,
            drain_time,
            close_error,
        }
    }

    fn ensure_supervisor(&self) {
        let receiver = self
            .inner
            .events_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(receiver) = receiver {
            tokio::spawn(supervise(
                Arc::downgrade(&self.inner),
                receiver,
                self.inner.shutdown.clone(),
            ));
        }
    }

    fn spawn_recovery(&self) {
        {
            let mut slot = self.slot();
            if slot.recovering {
                return;
            }
            slot.recovering = true;
        }

        tokio::spawn(recover(
            Arc::downgrade(&self.inner),
            self.inner.shutdown.clone(),
            self.inner.config.max_delay,
        ));
    }

    /// Applies a driver event; returns true if a reconnect should follow.
    async fn on_driver_event(&self, event: DriverEvent) -> bool {
        match event {
            DriverEvent::Connected => {
                #[cfg(feature = "tracing")]
                tracing::debug!(manager = %self.inner.config.name, "driver reports connection up");
                false
            }
            DriverEvent::Error(error) => {
                self.slot().last_error = Some(error.clone());

                #[cfg(feature = "tracing")]
                tracing::warn!(manager = %self.inner.config.name, error = %error, "driver error");

                self.emit(ConnectionEvent::DriverError {
                    name: self.inner.config.name.clone(),
                    timestamp: Self::now(),
                    error,
                });
                false
            }
            DriverEvent::Disconnected { reason } => {
                let lost = {
                    let mut slot = self.slot();
                    if slot.state == ConnectionState::Connected && !slot.shutting_down {
                        slot.state = ConnectionState::Disconnected;
                        slot.connected_at = None;
                        Some(slot.connection.take())
                    } else {
                        None
                    }
                };

                let Some(stale) = lost else {
                    return false;
                };

                // The driver gave up on it, but the handle may still own a socket.
                if let Some(connection) = stale {
                    if let Err(_error) = self.inner.driver.close(connection).await {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(manager = %self.inner.config.name, error = %_error, "closing lost connection failed");
                    }
                }

                #[cfg(feature = "tracing")]
                tracing::warn!(
                    manager = %self.inner.config.name,
                    reason = %reason,
                    reconnect_in_ms = self.inner.config.reconnect_delay.as_millis() as u64,
                    "store connection lost"
                );

                self.emit(ConnectionEvent::Disconnected {
                    name: self.inner.config.name.clone(),
                    timestamp: Self::now(),
                    reason,
                });
                true
            }
        }
    }
}

impl<D: Driver> std::fmt::Debug for ConnectionManager<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("name", &self.inner.config.name)
            .field("endpoint", &self.inner.config.endpoint)
            .field("state", &self.state())
            .finish()
    }
}

async fn supervise<D: Driver>(
    weak: Weak<Inner<D>>,
    mut events: mpsc::UnboundedReceiver<DriverEvent>,
    shutdown: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let Some(inner) = weak.upgrade() else { break };
        let manager = ConnectionManager { inner };
        if !manager.on_driver_event(event).await {
            continue;
        }

        let delay = manager.inner.config.reconnect_delay;
        drop(manager);

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        let Some(inner) = weak.upgrade() else { break };
        let manager = ConnectionManager { inner };
        let result = manager.connect().await;

        #[cfg(feature = "tracing")]
        if let Err(error) = &result {
            tracing::warn!(manager = %manager.inner.config.name, error = %error, "reconnect failed");
        }
        drop(result);
    }
}

async fn recover<D: Driver>(weak: Weak<Inner<D>>, shutdown: CancellationToken, interval: Duration) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        let Some(inner) = weak.upgrade() else { return };
        let manager = ConnectionManager { inner };
        let _serial = manager.inner.connect_lock.lock().await;

        let next_attempt = {
            let slot = manager.slot();
            if !slot.degraded || slot.shutting_down || slot.state == ConnectionState::Connected {
                break;
            }
            slot.attempt_count + 1
        };

        match manager.attempt_once(next_attempt).await {
            Ok(_) => {
                #[cfg(feature = "tracing")]
                tracing::info!(
                    manager = %manager.inner.config.name,
                    attempts = next_attempt,
                    "store reachable again, leaving degraded mode"
                );
                break;
            }
            Err(StoreError::ShuttingDown) => break,
            Err(error) => {
                manager.emit(ConnectionEvent::ConnectFailed {
                    name: manager.inner.config.name.clone(),
                    timestamp: std::time::Instant::now(),
                    attempt: next_attempt,
                    error,
                    retry_in: Some(interval),
                });
            }
        }
    }

    if let Some(inner) = weak.upgrade() {
        inner.slot().recovering = false;
    }
}
