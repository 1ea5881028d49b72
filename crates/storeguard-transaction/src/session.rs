use crate::driver::TransactionalDriver;
use std::sync::Arc;
use storeguard_core::StoreError;

/// Owns a session for the length of one attempt.
///
/// The explicit `commit`/`abort` paths release the session in place. If the
/// attempt future is dropped instead (timeout, cancellation), `Drop` hands
/// the session to a spawned task that aborts any open transaction and ends
/// the session.
pub(crate) struct SessionGuard<D: TransactionalDriver> {
    driver: Arc<D>,
    session: Option<D::Session>,
    in_transaction: bool,
}

impl<D: TransactionalDriver> SessionGuard<D> {
    pub(crate) fn new(driver: Arc<D>, session: D::Session) -> Self {
        Self {
            driver,
            session: Some(session),
            in_transaction: false,
        }
    }

    pub(crate) fn session(&mut self) -> Result<&mut D::Session, StoreError> {
        self.session
            .as_mut()
            .ok_or_else(|| StoreError::driver_message("session already released"))
    }

    pub(crate) fn mark_in_transaction(&mut self) {
        self.in_transaction = true;
    }

    /// Ends the session after a successful commit.
    pub(crate) async fn finish(mut self) {
        self.in_transaction = false;
        if let Some(session) = self.session.take() {
            self.driver.end_session(session).await;
        }
    }

    /// Aborts the open transaction, if any, and ends the session.
    pub(crate) async fn abort(mut self) {
        if self.in_transaction {
            if let Some(session) = self.session.as_mut() {
                if let Err(_error) = self.driver.abort_transaction(session).await {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %_error, "transaction abort failed");
                }
            }
            self.in_transaction = false;
        }
        if let Some(session) = self.session.take() {
            self.driver.end_session(session).await;
        }
    }
}

impl<D: TransactionalDriver> Drop for SessionGuard<D> {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            #[cfg(feature = "tracing")]
            tracing::warn!("no runtime available, session dropped without cleanup");
            return;
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            in_transaction = self.in_transaction,
            "attempt abandoned, releasing session in background"
        );

        let driver = Arc::clone(&self.driver);
        let in_transaction = self.in_transaction;
        runtime.spawn(async move {
            if in_transaction {
                if let Err(_error) = driver.abort_transaction(&mut session).await {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %_error, "background transaction abort failed");
                }
            }
            driver.end_session(session).await;
        });
    }
}
