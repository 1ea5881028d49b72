use futures::future::BoxFuture;
use storeguard_core::StoreError;

/// One operation inside a transaction.
///
/// Steps may run more than once: a transient failure restarts the whole
/// transaction from the first step on a fresh session.
pub type TransactionStep<S, T> =
    Box<dyn for<'s> Fn(&'s mut S) -> BoxFuture<'s, Result<T, StoreError>> + Send + Sync>;

/// Boxes a closure as a [`TransactionStep`].
///
/// ```ignore
/// use futures::FutureExt;
///
/// let debit = step(move |session: &mut Session| {
///     async move { session.update("accounts", "a", -50).await }.boxed()
/// });
/// ```
pub fn step<S, T, F>(f: F) -> TransactionStep<S, T>
where
    F: for<'s> Fn(&'s mut S) -> BoxFuture<'s, Result<T, StoreError>> + Send + Sync + 'static,
{
    Box::new(f)
}
