use crate::driver::Endpoint;
use crate::events::ConnectionEvent;
use std::time::Duration;
use storeguard_core::{EventListeners, FnListener};

/// What `connect` does once every attempt has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExhaustionMode {
    /// Report a degraded status and keep reconnecting in the background.
    /// The process stays up.
    #[default]
    Degrade,
    /// Return [`crate::ConnectionError::RetriesExhausted`] so the caller
    /// can exit.
    FailFast,
}

/// Configuration for the connection manager.
pub struct ConnectionConfig {
    pub(crate) endpoint: Endpoint,
    pub(crate) max_retries: u32,
    pub(crate) base_delay: Duration,
    pub(crate) max_delay: Duration,
    pub(crate) connect_timeout: Duration,
    pub(crate) reconnect_delay: Duration,
    pub(crate) drain_timeout: Duration,
    pub(crate) exhaustion_mode: ExhaustionMode,
    pub(crate) event_listeners: EventListeners<ConnectionEvent>,
    pub(crate) name: String,
}

impl ConnectionConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::new()
    }

    /// Target endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Total connection attempts per connect cycle.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Drain timeout used by graceful shutdown.
    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    /// Behaviour after exhausting connect attempts.
    pub fn exhaustion_mode(&self) -> ExhaustionMode {
        self.exhaustion_mode
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("endpoint", &self.endpoint)
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("connect_timeout", &self.connect_timeout)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("drain_timeout", &self.drain_timeout)
            .field("exhaustion_mode", &self.exhaustion_mode)
            .field("name", &self.name)
            .finish()
    }
}

/// Builder for [`ConnectionConfig`].
pub struct ConnectionConfigBuilder {
    endpoint: Endpoint,
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    connect_timeout: Duration,
    reconnect_delay: Duration,
    drain_timeout: Duration,
    exhaustion_mode: ExhaustionMode,
    event_listeners: EventListeners<ConnectionEvent>,
    name: String,
}

impl ConnectionConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            endpoint: Endpoint::default(),
            max_retries: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
            drain_timeout: Duration::from_secs(10),
            exhaustion_mode: ExhaustionMode::Degrade,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the endpoint.
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Sets the total number of attempts per connect cycle.
    ///
    /// Default: 5
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Sets the delay after the first failed attempt; later delays double.
    ///
    /// Default: 1 second
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Caps the delay between attempts. Also the interval of background
    /// recovery while degraded.
    ///
    /// Default: 30 seconds
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Bounds a single connection attempt.
    ///
    /// Default: 10 seconds
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Pause between losing a connection and reconnecting.
    ///
    /// Default: 5 seconds
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Longest graceful shutdown waits for in-flight operations.
    ///
    /// Default: 10 seconds
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Chooses what happens after exhausting connect attempts.
    ///
    /// Default: [`ExhaustionMode::Degrade`]
    pub fn exhaustion_mode(mut self, mode: ExhaustionMode) -> Self {
        self.exhaustion_mode = mode;
        self
    }

    /// Gives this manager a name for observability.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when a connection is established, with
    /// the number of attempts it took.
    pub fn on_connected<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &ConnectionEvent| {
                if let ConnectionEvent::Connected { attempts, .. } = event {
                    f(*attempts);
                }
            }));
        self
    }

    /// Registers a callback invoked when an established connection is lost.
    pub fn on_disconnected<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &ConnectionEvent| {
                if let ConnectionEvent::Disconnected { reason, .. } = event {
                    f(reason);
                }
            }));
        self
    }

    /// Registers a callback invoked when the manager enters degraded mode.
    pub fn on_degraded<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &ConnectionEvent| {
                if let ConnectionEvent::Degraded { attempts, .. } = event {
                    f(*attempts);
                }
            }));
        self
    }

    /// Registers a listener for every connection event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> ConnectionConfig {
        ConnectionConfig {
            endpoint: self.endpoint,
            max_retries: self.max_retries,
            base_delay: self.base_delay,
            max_delay: self.max_delay,
            connect_timeout: self.connect_timeout,
            reconnect_delay: self.reconnect_delay,
            drain_timeout: self.drain_timeout,
            exhaustion_mode: self.exhaustion_mode,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}

impl Default for ConnectionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfigBuilder::new().build()
    }
}
