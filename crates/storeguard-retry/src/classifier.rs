//! Retryability classification for store errors.
//!
//! This module provides the [`RetryClassifier`] trait and the
//! [`TransientErrorClassifier`] used by default, which recognizes network
//! failures, timeouts and the server's transient error codes and labels.

use std::sync::Arc;
use storeguard_core::StoreError;

/// Server error codes that indicate a transient condition.
///
/// Host unreachable/not found, network timeout, shutdown in progress,
/// primary stepped down, exceeded time limit, socket exceptions, not
/// writable primary, interrupted at shutdown, write conflict and missing
/// transaction.
pub const TRANSIENT_ERROR_CODES: &[i32] = &[
    6, 7, 89, 91, 112, 189, 251, 262, 9001, 10107, 11600, 11602, 13435, 13436,
];

/// Server labels that mark an error as safe to retry.
pub const TRANSIENT_LABELS: &[&str] = &["TransientTransactionError", "RetryableWriteError"];

const TRANSIENT_WORDING: &[&str] = &["connection", "timeout", "timed out", "network", "socket"];

/// Decides whether a failed attempt should be retried.
pub trait RetryClassifier: Send + Sync {
    /// Returns `true` if the error is transient.
    fn is_retryable(&self, error: &StoreError) -> bool;
}

/// Shared classifier handle.
pub type SharedRetryClassifier = Arc<dyn RetryClassifier>;

/// Default classifier.
///
/// | Error | Retryable |
/// |---|---|
/// | `Connection`, `Timeout` | yes |
/// | `Driver` with a transient code or label | yes |
/// | `Driver` whose message mentions connections, timeouts or the network | yes |
/// | anything else | no |
#[derive(Debug, Clone, Copy, Default)]
pub struct TransientErrorClassifier;

impl RetryClassifier for TransientErrorClassifier {
    fn is_retryable(&self, error: &StoreError) -> bool {
        match error {
            StoreError::Connection(_) | StoreError::Timeout(_) => true,
            StoreError::Driver {
                code,
                labels,
                message,
            } => {
                if code.is_some_and(|c| TRANSIENT_ERROR_CODES.contains(&c)) {
                    return true;
                }
                if labels
                    .iter()
                    .any(|l| TRANSIENT_LABELS.contains(&l.as_str()))
                {
                    return true;
                }
                let message = message.to_ascii_lowercase();
                TRANSIENT_WORDING.iter().any(|w| message.contains(w))
            }
            StoreError::CircuitOpen
            | StoreError::Validation(_)
            | StoreError::Cancelled
            | StoreError::DeadlineExceeded
            | StoreError::ShuttingDown => false,
        }
    }
}

/// A classifier backed by a closure.
///
/// ```rust
/// use storeguard_retry::{FnClassifier, RetryClassifier};
/// use storeguard_core::StoreError;
///
/// // Treat duplicate-key races as retryable as well.
/// let classifier = FnClassifier::new(|e: &StoreError| e.code() == Some(11000));
/// assert!(classifier.is_retryable(&StoreError::driver(11000, "dup key")));
/// ```
#[derive(Clone)]
pub struct FnClassifier<F> {
    f: F,
}

impl<F> FnClassifier<F>
where
    F: Fn(&StoreError) -> bool + Send + Sync,
{
    /// Creates a new closure-backed classifier.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> RetryClassifier for FnClassifier<F>
where
    F: Fn(&StoreError) -> bool + Send + Sync,
{
    fn is_retryable(&self, error: &StoreError) -> bool {
        (self.f)(error)
    }
}
