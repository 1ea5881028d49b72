//! Tagged result of a guarded store operation.

use crate::StoreError;

/// The result of running an operation through the resilience layer.
///
/// Expected failure modes are represented as variants rather than panics or
/// bare errors, so callers can map them to responses without inspecting
/// error strings.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome<T> {
    /// The operation completed.
    Success(T),
    /// Every attempt failed with a retryable error.
    RetryableFailure {
        /// The error from the final attempt.
        error: StoreError,
        /// How many attempts were made.
        attempts: u32,
    },
    /// A non-retryable error, or the caller cancelled.
    FatalFailure(StoreError),
    /// The circuit breaker rejected the call; the operation was never invoked.
    CircuitOpen,
}

impl<T> OperationOutcome<T> {
    /// Returns true for [`OperationOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, OperationOutcome::Success(_))
    }

    /// Returns true for [`OperationOutcome::CircuitOpen`].
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, OperationOutcome::CircuitOpen)
    }

    /// Returns true for [`OperationOutcome::RetryableFailure`].
    pub fn is_retryable_failure(&self) -> bool {
        matches!(self, OperationOutcome::RetryableFailure { .. })
    }

    /// Returns true for [`OperationOutcome::FatalFailure`].
    pub fn is_fatal(&self) -> bool {
        matches!(self, OperationOutcome::FatalFailure(_))
    }

    /// Borrows the success value.
    pub fn value(&self) -> Option<&T> {
        match self {
            OperationOutcome::Success(v) => Some(v),
            _ => None,
        }
    }

    /// Borrows the failure cause, if there is one.
    pub fn error(&self) -> Option<&StoreError> {
        match self {
            OperationOutcome::RetryableFailure { error, .. } => Some(error),
            OperationOutcome::FatalFailure(error) => Some(error),
            _ => None,
        }
    }

    /// Maps the success value.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> OperationOutcome<U> {
        match self {
            OperationOutcome::Success(v) => OperationOutcome::Success(f(v)),
            OperationOutcome::RetryableFailure { error, attempts } => {
                OperationOutcome::RetryableFailure { error, attempts }
            }
            OperationOutcome::FatalFailure(e) => OperationOutcome::FatalFailure(e),
            OperationOutcome::CircuitOpen => OperationOutcome::CircuitOpen,
        }
    }

    /// Collapses the outcome into a `Result`.
    pub fn into_result(self) -> Result<T, StoreError> {
        match self {
            OperationOutcome::Success(v) => Ok(v),
            OperationOutcome::RetryableFailure { error, .. } => Err(error),
            OperationOutcome::FatalFailure(e) => Err(e),
            OperationOutcome::CircuitOpen => Err(StoreError::CircuitOpen),
        }
    }

    /// HTTP status code a service boundary should answer with.
    ///
    /// Transient conditions map to 503, validation errors to 400 and any
    /// other fatal error to 500.
    pub fn http_status(&self) -> u16 {
        match self {
            OperationOutcome::Success(_) => 200,
            OperationOutcome::RetryableFailure { .. } | OperationOutcome::CircuitOpen => 503,
            OperationOutcome::FatalFailure(StoreError::Validation(_)) => 400,
            OperationOutcome::FatalFailure(_) => 500,
        }
    }
}
