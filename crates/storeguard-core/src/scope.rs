//! Caller-side cancellation and deadlines.
//!
//! A [`CallScope`] travels with every guarded call. It bounds the whole
//! attempt sequence, including backoff sleeps: when the token is cancelled or
//! the deadline passes, whatever is being awaited is dropped immediately.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::StoreError;

/// Cancellation token plus optional deadline for one logical call.
#[derive(Debug, Clone, Default)]
pub struct CallScope {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallScope {
    /// A scope that is never cancelled and has no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope driven by an existing cancellation token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Sets an absolute deadline.
    pub fn deadline(mut self, at: Instant) -> Self {
        self.deadline = Some(at);
        self
    }

    /// Sets a deadline relative to now.
    pub fn timeout(self, after: Duration) -> Self {
        self.deadline(Instant::now() + after)
    }

    /// The token backing this scope.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The deadline, if one was set.
    pub fn deadline_at(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels the scope.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// A scope that is cancelled with this one but can also be cancelled
    /// on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Returns the interruption error if the scope is already finished.
    pub fn interruption(&self) -> Option<StoreError> {
        if self.token.is_cancelled() {
            return Some(StoreError::Cancelled);
        }
        match self.deadline {
            Some(at) if Instant::now() >= at => Some(StoreError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Runs `fut` until it completes or the scope ends.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, StoreError> {
        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(StoreError::Cancelled),
            _ = deadline => Err(StoreError::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }

    /// Sleeps for `duration` unless the scope ends first.
    pub async fn sleep(&self, duration: Duration) -> Result<(), StoreError> {
        self.run(tokio::time::sleep(duration)).await
    }
}
