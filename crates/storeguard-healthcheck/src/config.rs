use crate::events::HealthEvent;
use std::time::Duration;
use storeguard_core::{EventListeners, FnListener, StoreError};

/// Configuration for the health monitor.
pub struct HealthMonitorConfig {
    pub(crate) interval: Duration,
    pub(crate) probe_timeout: Duration,
    pub(crate) slow_threshold: Duration,
    pub(crate) event_listeners: EventListeners<HealthEvent>,
    pub(crate) name: String,
}

impl HealthMonitorConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> HealthMonitorConfigBuilder {
        HealthMonitorConfigBuilder::new()
    }

    /// Time between probes.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Upper bound on a single probe.
    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Latency above which a successful probe is logged as slow.
    pub fn slow_threshold(&self) -> Duration {
        self.slow_threshold
    }
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        HealthMonitorConfigBuilder::new().build()
    }
}

/// Builder for [`HealthMonitorConfig`].
pub struct HealthMonitorConfigBuilder {
    interval: Duration,
    probe_timeout: Duration,
    slow_threshold: Duration,
    event_listeners: EventListeners<HealthEvent>,
    name: String,
}

impl HealthMonitorConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            slow_threshold: Duration::from_secs(1),
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the time between probes.
    ///
    /// Default: 30 seconds
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the upper bound on a single probe. A probe that exceeds it counts
    /// as a failure.
    ///
    /// Default: 5 seconds
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Sets the latency above which a successful probe is logged as slow.
    ///
    /// Default: 1 second
    pub fn slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    /// Gives this monitor a name for observability.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked with the round-trip time of each
    /// successful probe.
    pub fn on_probe_succeeded<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &HealthEvent| {
                if let HealthEvent::ProbeSucceeded { response_time, .. } = event {
                    f(*response_time);
                }
            }));
        self
    }

    /// Registers a callback invoked when a probe fails.
    pub fn on_probe_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(&StoreError) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &HealthEvent| {
                if let HealthEvent::ProbeFailed { error, .. } = event {
                    f(error);
                }
            }));
        self
    }

    /// Registers a callback invoked when a probe is slower than the
    /// threshold.
    pub fn on_slow_probe<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &HealthEvent| {
                if let HealthEvent::SlowProbe { response_time, .. } = event {
                    f(*response_time);
                }
            }));
        self
    }

    /// Registers a listener for every health event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&HealthEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> HealthMonitorConfig {
        HealthMonitorConfig {
            interval: self.interval,
            probe_timeout: self.probe_timeout,
            slow_threshold: self.slow_threshold,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}

impl Default for HealthMonitorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
