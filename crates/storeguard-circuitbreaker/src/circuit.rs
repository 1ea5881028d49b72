use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CircuitState {
    /// Calls are allowed.
    Closed = 0,
    /// Calls are rejected until the cooldown elapses.
    Open = 1,
    /// A limited number of trial calls are allowed.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    /// Upper-case label, as reported to operators.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the breaker.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerStatus {
    /// Instance name.
    pub name: String,
    /// Current state.
    pub state: CircuitState,
    /// Failures recorded since the circuit last closed.
    pub failure_count: u32,
    /// Failures needed to open the circuit.
    pub threshold: u32,
    /// Configured open-state cooldown.
    pub cooldown: Duration,
    /// When the breaker last changed state.
    pub last_transition_at: Instant,
    /// Time left before an open circuit admits a trial call.
    pub cooldown_remaining: Option<Duration>,
}

pub(crate) struct Circuit {
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    failure_count: u32,
    half_open_in_flight: u32,
    last_transition_at: Instant,
}

impl Circuit {
    pub(crate) fn new(state_atomic: Arc<AtomicU8>) -> Self {
        state_atomic.store(CircuitState::Closed as u8, Ordering::Release);
        Self {
            state: CircuitState::Closed,
            state_atomic,
            failure_count: 0,
            half_open_in_flight: 0,
            last_transition_at: Instant::now(),
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn status(&self, config: &CircuitBreakerConfig) -> CircuitBreakerStatus {
        let cooldown_remaining = match self.state {
            CircuitState::Open => Some(
                config
                    .cooldown
                    .saturating_sub(self.last_transition_at.elapsed()),
            ),
            _ => None,
        };

        CircuitBreakerStatus {
            name: config.name.clone(),
            state: self.state,
            failure_count: self.failure_count,
            threshold: config.failure_threshold,
            cooldown: config.cooldown,
            last_transition_at: self.last_transition_at,
            cooldown_remaining,
        }
    }

    fn cooldown_elapsed(&self, config: &CircuitBreakerConfig) -> bool {
        self.last_transition_at.elapsed() >= config.cooldown
    }

    pub(crate) fn try_acquire(
        &mut self,
        config: &CircuitBreakerConfig,
        events: &mut Vec<CircuitBreakerEvent>,
    ) -> bool {
        let permitted = match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if self.cooldown_elapsed(config) {
                    // Only the caller holding the lock observes this edge;
                    // everyone after it sees HalfOpen with the trial slot taken.
                    self.transition_to(CircuitState::HalfOpen, config, events);
                    self.half_open_in_flight = 1;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if self.half_open_in_flight < config.permitted_calls_in_half_open {
                    self.half_open_in_flight += 1;
                    true
                } else {
                    false
                }
            }
        };

        if permitted {
            events.push(CircuitBreakerEvent::CallPermitted {
                name: config.name.clone(),
                timestamp: std::time::Instant::now(),
                state: self.state,
            });
        } else {
            events.push(CircuitBreakerEvent::CallRejected {
                name: config.name.clone(),
                timestamp: std::time::Instant::now(),
            });
        }

        #[cfg(feature = "metrics")]
        counter!(
            "circuitbreaker_calls_total",
            "circuitbreaker" => config.name.clone(),
            "outcome" => if permitted { "permitted" } else { "rejected" }
        )
        .increment(1);

        permitted
    }

    pub(crate) fn record_success(
        &mut self,
        config: &CircuitBreakerConfig,
        events: &mut Vec<CircuitBreakerEvent>,
    ) {
        events.push(CircuitBreakerEvent::SuccessRecorded {
            name: config.name.clone(),
            timestamp: std::time::Instant::now(),
            state: self.state,
        });

        match self.state {
            CircuitState::Closed => {}
            CircuitState::HalfOpen => self.transition_to(CircuitState::Closed, config, events),
            CircuitState::Open => {
                // A success reported while open (typically a health probe)
                // closes the circuit only once the cooldown is over, and then
                // through HalfOpen so that no illegal Open -> Closed edge exists.
                if self.cooldown_elapsed(config) {
                    self.transition_to(CircuitState::HalfOpen, config, events);
                    self.transition_to(CircuitState::Closed, config, events);
                }
            }
        }
    }

    pub(crate) fn record_failure(
        &mut self,
        config: &CircuitBreakerConfig,
        events: &mut Vec<CircuitBreakerEvent>,
    ) {
        self.failure_count = self.failure_count.saturating_add(1);

        events.push(CircuitBreakerEvent::FailureRecorded {
            name: config.name.clone(),
            timestamp: std::time::Instant::now(),
            state: self.state,
            failure_count: self.failure_count,
        });

        match self.state {
            CircuitState::Closed if self.failure_count >= config.failure_threshold => {
                self.transition_to(CircuitState::Open, config, events);
            }
            CircuitState::HalfOpen => self.transition_to(CircuitState::Open, config, events),
            _ => {}
        }
    }

    pub(crate) fn force_open(
        &mut self,
        config: &CircuitBreakerConfig,
        events: &mut Vec<CircuitBreakerEvent>,
    ) {
        if self.state == CircuitState::Open {
            self.last_transition_at = Instant::now();
        } else {
            self.transition_to(CircuitState::Open, config, events);
        }
    }

    pub(crate) fn reset(
        &mut self,
        config: &CircuitBreakerConfig,
        events: &mut Vec<CircuitBreakerEvent>,
    ) {
        let from_state = self.state;

        #[cfg(feature = "tracing")]
        tracing::warn!(
            circuitbreaker = %config.name,
            from = %from_state,
            failure_count = self.failure_count,
            "Circuit breaker forcibly reset to CLOSED"
        );

        self.set_state(CircuitState::Closed, config);
        events.push(CircuitBreakerEvent::Reset {
            name: config.name.clone(),
            timestamp: std::time::Instant::now(),
            from_state,
        });
    }

    fn transition_to(
        &mut self,
        state: CircuitState,
        config: &CircuitBreakerConfig,
        events: &mut Vec<CircuitBreakerEvent>,
    ) {
        if self.state == state {
            return;
        }

        let from_state = self.state;

        events.push(CircuitBreakerEvent::StateTransition {
            name: config.name.clone(),
            timestamp: std::time::Instant::now(),
            from_state,
            to_state: state,
        });

        #[cfg(feature = "tracing")]
        tracing::info!(
            circuitbreaker = %config.name,
            from = %from_state,
            to = %state,
            failure_count = self.failure_count,
            "Circuit state transition"
        );

        #[cfg(feature = "metrics")]
        counter!(
            "circuitbreaker_transitions_total",
            "circuitbreaker" => config.name.clone(),
            "from" => from_state.as_str(),
            "to" => state.as_str()
        )
        .increment(1);

        self.set_state(state, config);
    }

    fn set_state(&mut self, state: CircuitState, _config: &CircuitBreakerConfig) {
        self.state = state;
        self.state_atomic.store(state as u8, Ordering::Release);
        self.last_transition_at = Instant::now();
        self.half_open_in_flight = 0;
        if state == CircuitState::Closed {
            self.failure_count = 0;
        }

        #[cfg(feature = "metrics")]
        gauge!("circuitbreaker_state", "circuitbreaker" => _config.name.clone())
            .set(state as u8 as f64);
    }
}
