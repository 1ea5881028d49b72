use crate::events::CircuitBreakerEvent;
use crate::{CircuitBreaker, CircuitState};
use std::time::Duration;
use storeguard_core::{EventListeners, FnListener};

/// Configuration for the circuit breaker.
pub struct CircuitBreakerConfig {
    pub(crate) failure_threshold: u32,
    pub(crate) cooldown: Duration,
    pub(crate) permitted_calls_in_half_open: u32,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) name: String,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Recorded failures that open the circuit while closed.
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    /// How long the circuit stays open before a trial call is allowed.
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Instance name used in events, logs and metric labels.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for configuring and constructing a circuit breaker.
pub struct CircuitBreakerConfigBuilder {
    failure_threshold: u32,
    cooldown: Duration,
    permitted_calls_in_half_open: u32,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    name: String,
}

impl CircuitBreakerConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(60),
            permitted_calls_in_half_open: 1,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets how many recorded failures open the circuit while closed.
    ///
    /// Failures accumulate until the circuit next enters the closed state;
    /// successes observed while closed do not reset the count.
    ///
    /// Default: 5
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Sets how long the circuit stays open before allowing a trial call.
    ///
    /// Default: 60 seconds
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Sets how many trial calls may be in flight while half-open.
    ///
    /// Default: 1
    pub fn permitted_calls_in_half_open(mut self, n: u32) -> Self {
        self.permitted_calls_in_half_open = n.max(1);
        self
    }

    /// Gives this breaker a name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback for state transitions.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::StateTransition {
                from_state,
                to_state,
                ..
            } = event
            {
                f(*from_state, *to_state);
            }
        }));
        self
    }

    /// Registers a callback invoked when a call is let through.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::CallPermitted { state, .. } = event {
                f(*state);
            }
        }));
        self
    }

    /// Registers a callback invoked when a call is rejected.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &CircuitBreakerEvent| {
            if matches!(event, CircuitBreakerEvent::CallRejected { .. }) {
                f();
            }
        }));
        self
    }

    /// Registers a callback invoked for every recorded failure with the
    /// resulting failure count.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::FailureRecorded { failure_count, .. } = event {
                f(*failure_count);
            }
        }));
        self
    }

    /// Registers a callback invoked when an operator forces a reset.
    pub fn on_reset<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::Reset { from_state, .. } = event {
                f(*from_state);
            }
        }));
        self
    }

    /// Registers a listener for every breaker event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&CircuitBreakerEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    /// Builds the configuration.
    pub fn build_config(self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            cooldown: self.cooldown,
            permitted_calls_in_half_open: self.permitted_calls_in_half_open,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    /// Builds the circuit breaker.
    pub fn build(self) -> CircuitBreaker {
        CircuitBreaker::new(self.build_config())
    }
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
