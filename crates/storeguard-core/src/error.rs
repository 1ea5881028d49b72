//! Error taxonomy for document-store operations.
//!
//! [`StoreError`] is the single error type that flows through the retry
//! executor, the transaction orchestrator and the health monitor. Whether an
//! error is worth retrying is decided by a retry classifier, not by the error
//! itself; the helpers here only expose the facts a classifier needs
//! (driver code, labels, message).

use std::time::Duration;

/// Errors produced by store operations and by the resilience layer itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The connection could not be established or was lost.
    #[error("connection error: {0}")]
    Connection(String),

    /// A single attempt exceeded its time budget.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The circuit breaker rejected the call.
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// The request itself is invalid; retrying cannot help.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An error reported by the underlying driver.
    #[error("driver error (code {code:?}): {message}")]
    Driver {
        /// Numeric server error code, if the driver reported one.
        code: Option<i32>,
        /// Error labels attached by the server (e.g. `TransientTransactionError`).
        labels: Vec<String>,
        /// Human readable message.
        message: String,
    },

    /// The caller cancelled the operation.
    #[error("operation cancelled by caller")]
    Cancelled,

    /// The caller's overall deadline passed.
    #[error("caller deadline exceeded")]
    DeadlineExceeded,

    /// The client is draining for shutdown and refuses new work.
    #[error("store client is shutting down")]
    ShuttingDown,
}

impl StoreError {
    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        StoreError::Connection(message.into())
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation(message.into())
    }

    /// Creates a driver error with a server code and no labels.
    pub fn driver(code: i32, message: impl Into<String>) -> Self {
        StoreError::Driver {
            code: Some(code),
            labels: Vec::new(),
            message: message.into(),
        }
    }

    /// Creates a driver error that carries only a message.
    pub fn driver_message(message: impl Into<String>) -> Self {
        StoreError::Driver {
            code: None,
            labels: Vec::new(),
            message: message.into(),
        }
    }

    /// Attaches a server error label. No-op for non-driver errors.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        if let StoreError::Driver { labels, .. } = &mut self {
            labels.push(label.into());
        }
        self
    }

    /// Returns the driver error code, if any.
    pub fn code(&self) -> Option<i32> {
        match self {
            StoreError::Driver { code, .. } => *code,
            _ => None,
        }
    }

    /// Returns true if the driver attached the given label.
    pub fn has_label(&self, label: &str) -> bool {
        match self {
            StoreError::Driver { labels, .. } => labels.iter().any(|l| l == label),
            _ => false,
        }
    }

    /// Returns true if this error came from the caller's cancellation token
    /// or deadline rather than from the store.
    pub fn is_interruption(&self) -> bool {
        matches!(self, StoreError::Cancelled | StoreError::DeadlineExceeded)
    }

    /// Returns true if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::Timeout(_))
    }

    /// Returns true if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }
}
