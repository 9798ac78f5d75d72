use {
    super::error::ReconcileError,
    super::id::IdempotencyKey,
    std::{future::Future, pin::Pin},
};

pub type GuardFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ReconcileError>> + Send + 'a>>;

/// Duplicate suppressor. `claim` is the compare-and-set: it records the key
/// only if absent and reports whether this caller won. Callers treat errors
/// as "not processed" and carry on.
pub trait IdempotencyGuard: Send + Sync {
    fn has_processed(&self, key: &IdempotencyKey) -> GuardFuture<'_, bool>;

    /// `true` if the key was absent and is now held by the caller.
    fn claim(&self, key: &IdempotencyKey) -> GuardFuture<'_, bool>;

    /// Give a claimed key back so a redelivery can retry.
    fn release(&self, key: &IdempotencyKey) -> GuardFuture<'_, ()>;
}
