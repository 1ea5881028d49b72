use crate::options::TransactionOptions;
use std::future::Future;
use storeguard_connection::Driver;
use storeguard_core::StoreError;

/// A driver that supports multi-document transactions.
///
/// Sessions are created per attempt and always released through
/// [`end_session`](Self::end_session), including when an attempt is
/// abandoned mid-flight.
pub trait TransactionalDriver: Driver {
    /// A client session. Steps receive it to bind their operations to the
    /// transaction.
    type Session: Send + 'static;

    /// Opens a session on `connection`.
    fn start_session(
        &self,
        connection: &Self::Connection,
    ) -> impl Future<Output = Result<Self::Session, StoreError>> + Send;

    /// Starts a transaction on the session.
    fn start_transaction(
        &self,
        session: &mut Self::Session,
        options: &TransactionOptions,
    ) -> Result<(), StoreError>;

    /// Commits the session's transaction.
    fn commit_transaction(
        &self,
        session: &mut Self::Session,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Aborts the session's transaction, discarding its writes.
    fn abort_transaction(
        &self,
        session: &mut Self::Session,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Releases the session.
    fn end_session(&self, session: Self::Session) -> impl Future<Output = ()> + Send;
}
