use crate::config::HealthMonitorConfig;
use crate::events::HealthEvent;
use crate::snapshot::HealthSnapshot;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use storeguard_circuitbreaker::CircuitBreaker;
use storeguard_connection::{ConnectionManager, Driver};
use storeguard_core::StoreError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

struct MonitorInner<D: Driver> {
    manager: ConnectionManager<D>,
    breaker: CircuitBreaker,
    config: HealthMonitorConfig,
    snapshot: watch::Sender<HealthSnapshot>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<D: Driver> MonitorInner<D> {
    fn task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<D: Driver> Drop for MonitorInner<D> {
    fn drop(&mut self) {
        if let Some(task) = self.task().take() {
            task.abort();
        }
    }
}

/// Probes the store on a timer and reports each verdict to the circuit
/// breaker.
///
/// The latest [`HealthSnapshot`] is published through a watch channel, so
/// readers never see a half-written result. The probe loop stops on
/// [`stop`](Self::stop), when the last handle is dropped, or when the
/// connection manager begins graceful shutdown.
pub struct HealthMonitor<D: Driver> {
    inner: Arc<MonitorInner<D>>,
}

impl<D: Driver> Clone for HealthMonitor<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: Driver> HealthMonitor<D> {
    /// Creates a monitor. Probing starts with [`start`](Self::start).
    pub fn new(
        manager: ConnectionManager<D>,
        breaker: CircuitBreaker,
        config: HealthMonitorConfig,
    ) -> Self {
        let snapshot = watch::Sender::new(HealthSnapshot::unknown(breaker.state()));
        Self {
            inner: Arc::new(MonitorInner {
                manager,
                breaker,
                config,
                snapshot,
                task: Mutex::new(None),
            }),
        }
    }

    /// The monitor's configuration.
    pub fn config(&self) -> &HealthMonitorConfig {
        &self.inner.config
    }

    /// The latest snapshot.
    pub fn snapshot(&self) -> HealthSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Subscribes to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<HealthSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Returns true while the probe loop is running.
    pub fn is_running(&self) -> bool {
        self.inner
            .task()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Runs one probe now, records it with the breaker and publishes the
    /// resulting snapshot.
    pub async fn probe_now(&self) -> HealthSnapshot {
        let config = &self.inner.config;
        let started = Instant::now();

        let result = match self.inner.manager.connection() {
            Ok(connection) => {
                let ping = self.inner.manager.driver().ping(&connection);
                match tokio::time::timeout(config.probe_timeout, ping).await {
                    Ok(result) => result,
                    Err(_) => Err(StoreError::Timeout(config.probe_timeout)),
                }
            }
            Err(error) => Err(error),
        };
        let response_time = started.elapsed();

        let snapshot = match result {
            Ok(()) => {
                self.inner.breaker.record_success();

                if response_time > config.slow_threshold {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        monitor = %config.name,
                        response_ms = response_time.as_millis() as u64,
                        threshold_ms = config.slow_threshold.as_millis() as u64,
                        "slow health probe"
                    );

                    config.event_listeners.emit(&HealthEvent::SlowProbe {
                        name: config.name.clone(),
                        timestamp: std::time::Instant::now(),
                        response_time,
                        threshold: config.slow_threshold,
                    });
                }

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    monitor = %config.name,
                    response_ms = response_time.as_millis() as u64,
                    "health probe succeeded"
                );

                config.event_listeners.emit(&HealthEvent::ProbeSucceeded {
                    name: config.name.clone(),
                    timestamp: std::time::Instant::now(),
                    response_time,
                });

                HealthSnapshot::healthy(response_time, self.inner.breaker.state())
            }
            Err(error) => {
                // Shutting down is not a store failure.
                if error != StoreError::ShuttingDown {
                    self.inner.breaker.record_failure();
                }

                #[cfg(feature = "tracing")]
                tracing::warn!(monitor = %config.name, error = %error, "health probe failed");

                config.event_listeners.emit(&HealthEvent::ProbeFailed {
                    name: config.name.clone(),
                    timestamp: std::time::Instant::now(),
                    error: error.clone(),
                });

                HealthSnapshot::unhealthy(response_time, self.inner.breaker.state(), error)
            }
        };

        self.inner.snapshot.send_replace(snapshot.clone());
        snapshot
    }

    /// Starts the periodic probe loop. The first probe runs immediately.
    /// Calling this while the loop is running does nothing.
    pub fn start(&self) {
        let mut task = self.inner.task();
        if task.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            monitor = %self.inner.config.name,
            interval_ms = self.inner.config.interval.as_millis() as u64,
            "starting health monitor"
        );

        *task = Some(tokio::spawn(run_probes(Arc::downgrade(&self.inner))));
    }

    /// Stops the probe loop.
    pub fn stop(&self) {
        if let Some(task) = self.inner.task().take() {
            task.abort();

            #[cfg(feature = "tracing")]
            tracing::info!(monitor = %self.inner.config.name, "health monitor stopped");
        }
    }
}

impl<D: Driver> std::fmt::Debug for HealthMonitor<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("name", &self.inner.config.name)
            .field("status", &self.inner.snapshot.borrow().status)
            .field("running", &self.is_running())
            .finish()
    }
}

async fn run_probes<D: Driver>(weak: Weak<MonitorInner<D>>) {
    let (interval, shutdown) = match weak.upgrade() {
        Some(inner) => (inner.config.interval, inner.manager.shutdown_token()),
        None => return,
    };

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(inner) = weak.upgrade() else { break };
        let monitor = HealthMonitor { inner };
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = monitor.probe_now() => {}
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("health probe loop exited");
}
