//! Circuit breaker gating access to the document store.
//!
//! The breaker is a small state machine shared by every caller of a store
//! client:
//!
//! - **Closed**: calls pass. Each terminal failure reported by the retry
//!   executor, the transaction orchestrator or the health monitor increments
//!   a cumulative counter; reaching the threshold opens the circuit.
//! - **Open**: calls are rejected without touching the store until the
//!   cooldown has elapsed.
//! - **HalfOpen**: the first caller after the cooldown is admitted as a trial.
//!   Its success closes the circuit, its failure reopens it.
//!
//! Only the edges Closed→Open, Open→HalfOpen, HalfOpen→Closed and
//! HalfOpen→Open exist. [`CircuitBreaker::force_reset`] is the administrative
//! escape hatch; it is logged and reported as a [`CircuitBreakerEvent::Reset`]
//! rather than as a transition.
//!
//! # Example
//!
//! ```
//! use storeguard_circuitbreaker::{CircuitBreakerConfig, CircuitState};
//! use std::time::Duration;
//!
//! let breaker = CircuitBreakerConfig::builder()
//!     .name("orders-db")
//!     .failure_threshold(5)
//!     .cooldown(Duration::from_secs(60))
//!     .on_state_transition(|from, to| println!("breaker {from} -> {to}"))
//!     .build();
//!
//! assert!(breaker.should_allow());
//! for _ in 0..5 {
//!     breaker.record_failure();
//! }
//! assert_eq!(breaker.state(), CircuitState::Open);
//! assert!(!breaker.should_allow());
//! ```
//!
//! The breaker measures its cooldown with [`tokio::time::Instant`], so tests
//! running on a paused tokio clock can advance through it deterministically.

mod circuit;
mod config;
mod events;
mod permit;

pub use circuit::{CircuitBreakerStatus, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use events::CircuitBreakerEvent;
pub use permit::CallPermit;

use circuit::Circuit;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared circuit breaker handle.
///
/// Cloning is cheap; every clone observes and mutates the same state.
#[derive(Clone)]
pub struct CircuitBreaker {
    config: Arc<CircuitBreakerConfig>,
    circuit: Arc<Mutex<Circuit>>,
    state_atomic: Arc<AtomicU8>,
}

impl CircuitBreaker {
    /// Creates a breaker from a finished configuration.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        let state_atomic = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        Self {
            config: Arc::new(config),
            circuit: Arc::new(Mutex::new(Circuit::new(Arc::clone(&state_atomic)))),
            state_atomic,
        }
    }

    /// Creates a configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    // The guarded state is always left consistent, so poison is ignored.
    fn circuit(&self) -> MutexGuard<'_, Circuit> {
        self.circuit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_circuit<R>(
        &self,
        f: impl FnOnce(&mut Circuit, &CircuitBreakerConfig, &mut Vec<CircuitBreakerEvent>) -> R,
    ) -> R {
        let mut events = Vec::new();
        let result = {
            let mut circuit = self.circuit();
            f(&mut circuit, &self.config, &mut events)
        };
        // Listeners run outside the lock so they may query the breaker.
        for event in &events {
            self.config.event_listeners.emit(event);
        }
        result
    }

    /// Decides whether a call may proceed.
    ///
    /// When the cooldown of an open circuit has elapsed, exactly one caller
    /// moves it to half-open and receives `true`; concurrent callers are
    /// rejected until the trial slot is released by a recorded outcome.
    ///
    /// The caller owns the outcome: it must follow up with
    /// [`record_success`](Self::record_success) or
    /// [`record_failure`](Self::record_failure). Callers whose work can be
    /// dropped mid-flight should use [`try_acquire`](Self::try_acquire).
    pub fn should_allow(&self) -> bool {
        self.with_circuit(|circuit, config, events| circuit.try_acquire(config, events))
    }

    /// Like [`should_allow`](Self::should_allow), but hands back a
    /// [`CallPermit`] that reports the outcome.
    ///
    /// A permit dropped without an outcome counts as a failure, so a call
    /// abandoned during the half-open trial reopens the circuit instead of
    /// holding the trial slot forever.
    pub fn try_acquire(&self) -> Option<CallPermit> {
        self.should_allow().then(|| CallPermit::new(self.clone()))
    }

    /// Reports a successful call or probe.
    pub fn record_success(&self) {
        self.with_circuit(|circuit, config, events| circuit.record_success(config, events))
    }

    /// Reports a terminal failure.
    pub fn record_failure(&self) {
        self.with_circuit(|circuit, config, events| circuit.record_failure(config, events))
    }

    /// Opens the circuit immediately, restarting the cooldown.
    pub fn force_open(&self) {
        self.with_circuit(|circuit, config, events| circuit.force_open(config, events))
    }

    /// Administrative override: returns the breaker to closed with a zero
    /// failure count, whatever its current state.
    pub fn force_reset(&self) {
        self.with_circuit(|circuit, config, events| circuit.reset(config, events))
    }

    /// Returns the current state without taking the lock.
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(Ordering::Acquire))
    }

    /// Returns the state as seen under the lock, together with counters.
    pub fn status(&self) -> CircuitBreakerStatus {
        self.circuit().status(&self.config)
    }

    /// Returns true if the circuit is open.
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// The breaker's instance name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The breaker's configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Returns an HTTP status code for readiness endpoints.
    ///
    /// Half-open still serves traffic, so only an open circuit maps to 503.
    pub fn http_status(&self) -> u16 {
        match self.state() {
            CircuitState::Closed => 200,
            CircuitState::HalfOpen => 200,
            CircuitState::Open => 503,
        }
    }

    /// Returns "healthy", "degraded" or "unhealthy" for closed, half-open
    /// and open respectively.
    pub fn health_status(&self) -> &'static str {
        match self.state() {
            CircuitState::Closed => "healthy",
            CircuitState::HalfOpen => "degraded",
            CircuitState::Open => "unhealthy",
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.config.name)
            .field("state", &self.state())
            .finish()
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        CircuitBreakerConfigBuilder::new().build()
    }
}
