use {
    crate::domain::entity::{
        Gift, GiftStatus, GiftUpdate, Order, OrderUpdate, Subscription, SubscriptionUpdate,
    },
    crate::domain::error::ReconcileError,
    crate::domain::id::GatewayId,
    crate::domain::repository::{EntityRepository, RepoFuture},
    chrono::{DateTime, Utc},
    std::collections::BTreeMap,
    std::sync::{
        Mutex, MutexGuard,
        atomic::{AtomicUsize, Ordering},
    },
};

#[derive(Debug, Default)]
struct Tables {
    orders: BTreeMap<i64, Order>,
    gifts: BTreeMap<i64, Gift>,
    subscriptions: BTreeMap<i64, Subscription>,
}

/// Map-backed repository for local runs and tests. Same write semantics as
/// the Postgres one, including the null-only `notified_at` and
/// `started_at` updates.
#[derive(Debug, Default)]
pub struct InMemoryEntityRepository {
    tables: Mutex<Tables>,
    writes: AtomicUsize,
}

impl InMemoryEntityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        match self.tables.lock() {
            Ok(t) => t,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn insert_order(&self, order: Order) {
        self.tables().orders.insert(order.id, order);
    }

    pub fn insert_gift(&self, gift: Gift) {
        self.tables().gifts.insert(gift.id, gift);
    }

    pub fn insert_subscription(&self, subscription: Subscription) {
        self.tables()
            .subscriptions
            .insert(subscription.id, subscription);
    }

    pub fn order(&self, id: i64) -> Option<Order> {
        self.tables().orders.get(&id).cloned()
    }

    pub fn gift(&self, id: i64) -> Option<Gift> {
        self.tables().gifts.get(&id).cloned()
    }

    pub fn subscription(&self, id: i64) -> Option<Subscription> {
        self.tables().subscriptions.get(&id).cloned()
    }

    /// Number of successful mutating calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn ready<T: Send + 'static>(value: T) -> RepoFuture<'static, T> {
    Box::pin(async move { Ok(value) })
}

fn missing<T: Send + 'static>(entity: &str, id: i64) -> RepoFuture<'static, T> {
    let msg = format!("{entity} {id} vanished before update");
    Box::pin(async move { Err(ReconcileError::Persistence(msg)) })
}

impl EntityRepository for InMemoryEntityRepository {
    fn find_order(&self, id: i64) -> RepoFuture<'_, Option<Order>> {
        ready(self.order(id))
    }

    fn find_order_by_payment_id(&self, payment_id: &GatewayId) -> RepoFuture<'_, Option<Order>> {
        let found = self
            .tables()
            .orders
            .values()
            .rev()
            .find(|o| o.gateway_payment_id.as_ref() == Some(payment_id))
            .cloned();
        ready(found)
    }

    fn find_gift(&self, id: i64) -> RepoFuture<'_, Option<Gift>> {
        ready(self.gift(id))
    }

    fn find_subscription_by_gateway_id(
        &self,
        subscription_id: &GatewayId,
    ) -> RepoFuture<'_, Option<Subscription>> {
        let found = self
            .tables()
            .subscriptions
            .values()
            .find(|s| &s.gateway_subscription_id == subscription_id)
            .cloned();
        ready(found)
    }

    fn update_order(&self, update: &OrderUpdate) -> RepoFuture<'_, ()> {
        let mut tables = self.tables();
        let Some(order) = tables.orders.get_mut(&update.id) else {
            return missing("order", update.id);
        };
        order.status = update.status;
        order.gateway_payment_id = Some(update.gateway_payment_id.clone());
        order.payment_details = Some(update.payment_details.clone());
        drop(tables);
        self.wrote();
        ready(())
    }

    fn update_gift(&self, update: &GiftUpdate) -> RepoFuture<'_, ()> {
        let mut tables = self.tables();
        let Some(gift) = tables.gifts.get_mut(&update.id) else {
            return missing("gift", update.id);
        };
        gift.payment_status = update.payment_status;
        gift.status = update.status;
        gift.gateway_payment_id = Some(update.gateway_payment_id.clone());
        gift.payment_details = Some(update.payment_details.clone());
        drop(tables);
        self.wrote();
        ready(())
    }

    fn update_subscription(&self, update: &SubscriptionUpdate) -> RepoFuture<'_, ()> {
        let mut tables = self.tables();
        let Some(sub) = tables.subscriptions.get_mut(&update.id) else {
            return missing("subscription", update.id);
        };
        sub.status = update.status;
        sub.started_at = sub.started_at.or(update.started_at);
        sub.gateway_details = Some(update.gateway_details.clone());
        drop(tables);
        self.wrote();
        ready(())
    }

    fn mark_order_notified(&self, id: i64, at: DateTime<Utc>) -> RepoFuture<'_, bool> {
        let mut tables = self.tables();
        let marked = match tables.orders.get_mut(&id) {
            Some(order) if order.notified_at.is_none() => {
                order.notified_at = Some(at);
                true
            }
            _ => false,
        };
        drop(tables);
        if marked {
            self.wrote();
        }
        ready(marked)
    }

    fn mark_gift_notified(&self, id: i64, at: DateTime<Utc>) -> RepoFuture<'_, bool> {
        let mut tables = self.tables();
        let marked = match tables.gifts.get_mut(&id) {
            Some(gift) if gift.notified_at.is_none() => {
                gift.notified_at = Some(at);
                gift.status = GiftStatus::Notified;
                true
            }
            _ => false,
        };
        drop(tables);
        if marked {
            self.wrote();
        }
        ready(marked)
    }

    fn mark_subscription_notified(&self, id: i64, at: DateTime<Utc>) -> RepoFuture<'_, bool> {
        let mut tables = self.tables();
        let marked = match tables.subscriptions.get_mut(&id) {
            Some(sub) if sub.notified_at.is_none() => {
                sub.notified_at = Some(at);
                true
            }
            _ => false,
        };
        drop(tables);
        if marked {
            self.wrote();
        }
        ready(marked)
    }
}
