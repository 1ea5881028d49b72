use crate::CircuitBreaker;

/// Admission to one call, obtained from [`CircuitBreaker::try_acquire`].
///
/// Reporting consumes the permit. If it is dropped unreported (the call's
/// future was cancelled, timed out from outside, or lost a `select!`), a
/// failure is recorded on drop.
#[must_use = "dropping a permit without reporting records a failure"]
pub struct CallPermit {
    breaker: Option<CircuitBreaker>,
}

impl CallPermit {
    pub(crate) fn new(breaker: CircuitBreaker) -> Self {
        Self {
            breaker: Some(breaker),
        }
    }

    /// Reports the call as successful.
    pub fn record_success(mut self) {
        if let Some(breaker) = self.breaker.take() {
            breaker.record_success();
        }
    }

    /// Reports the call as failed.
    pub fn record_failure(mut self) {
        if let Some(breaker) = self.breaker.take() {
            breaker.record_failure();
        }
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if let Some(breaker) = self.breaker.take() {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                circuitbreaker = breaker.name(),
                state = %breaker.state(),
                "call abandoned without an outcome, recording failure"
            );
            breaker.record_failure();
        }
    }
}

impl std::fmt::Debug for CallPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallPermit")
            .field("breaker", &self.breaker.as_ref().map(CircuitBreaker::name))
            .finish()
    }
}
