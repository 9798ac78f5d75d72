use {
    super::entity::{Gift, GiftUpdate, Order, OrderUpdate, Subscription, SubscriptionUpdate},
    super::error::ReconcileError,
    super::id::GatewayId,
    chrono::{DateTime, Utc},
    std::{future::Future, pin::Pin},
};

pub type RepoFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ReconcileError>> + Send + 'a>>;

/// Storage for the three reconciled entity kinds. Failures surface as
/// `ReconcileError::Persistence`.
pub trait EntityRepository: Send + Sync {
    fn find_order(&self, id: i64) -> RepoFuture<'_, Option<Order>>;

    fn find_order_by_payment_id(&self, payment_id: &GatewayId) -> RepoFuture<'_, Option<Order>>;

    fn find_gift(&self, id: i64) -> RepoFuture<'_, Option<Gift>>;

    fn find_subscription_by_gateway_id(
        &self,
        subscription_id: &GatewayId,
    ) -> RepoFuture<'_, Option<Subscription>>;

    fn update_order(&self, update: &OrderUpdate) -> RepoFuture<'_, ()>;

    fn update_gift(&self, update: &GiftUpdate) -> RepoFuture<'_, ()>;

    fn update_subscription(&self, update: &SubscriptionUpdate) -> RepoFuture<'_, ()>;

    /// Set `notified_at` if still null. Returns `false` when another writer
    /// got there first.
    fn mark_order_notified(&self, id: i64, at: DateTime<Utc>) -> RepoFuture<'_, bool>;

    /// Set `notified_at` and move the gift to `notified` in one write, only
    /// if `notified_at` is still null.
    fn mark_gift_notified(&self, id: i64, at: DateTime<Utc>) -> RepoFuture<'_, bool>;

    fn mark_subscription_notified(&self, id: i64, at: DateTime<Utc>) -> RepoFuture<'_, bool>;
}
