use {
    crate::domain::entity::{
        Gift, GiftPaymentStatus, GiftStatus, GiftUpdate, Order, OrderStatus, OrderUpdate,
        Subscription, SubscriptionStatus, SubscriptionUpdate,
    },
    crate::domain::error::ReconcileError,
    crate::domain::id::GatewayId,
    crate::domain::repository::{EntityRepository, RepoFuture},
    chrono::{DateTime, Utc},
    sqlx::PgPool,
};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    status: String,
    gateway_payment_id: Option<String>,
    customer_email: String,
    payment_details: Option<serde_json::Value>,
    notified_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = ReconcileError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            status: OrderStatus::try_from(row.status.as_str())?,
            gateway_payment_id: row.gateway_payment_id.map(GatewayId::new).transpose()?,
            customer_email: row.customer_email,
            payment_details: row.payment_details,
            notified_at: row.notified_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct GiftRow {
    id: i64,
    payment_status: String,
    status: String,
    gateway_payment_id: Option<String>,
    purchaser_name: String,
    recipient_name: String,
    recipient_email: String,
    message: Option<String>,
    payment_details: Option<serde_json::Value>,
    notified_at: Option<DateTime<Utc>>,
}

impl TryFrom<GiftRow> for Gift {
    type Error = ReconcileError;

    fn try_from(row: GiftRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            payment_status: GiftPaymentStatus::try_from(row.payment_status.as_str())?,
            status: GiftStatus::try_from(row.status.as_str())?,
            gateway_payment_id: row.gateway_payment_id.map(GatewayId::new).transpose()?,
            purchaser_name: row.purchaser_name,
            recipient_name: row.recipient_name,
            recipient_email: row.recipient_email,
            message: row.message,
            payment_details: row.payment_details,
            notified_at: row.notified_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    id: i64,
    status: String,
    gateway_subscription_id: String,
    subscriber_email: String,
    plan_name: String,
    started_at: Option<DateTime<Utc>>,
    gateway_details: Option<serde_json::Value>,
    notified_at: Option<DateTime<Utc>>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = ReconcileError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            status: SubscriptionStatus::try_from(row.status.as_str())?,
            gateway_subscription_id: GatewayId::new(row.gateway_subscription_id)?,
            subscriber_email: row.subscriber_email,
            plan_name: row.plan_name,
            started_at: row.started_at,
            gateway_details: row.gateway_details,
            notified_at: row.notified_at,
        })
    }
}

const ORDER_COLUMNS: &str =
    "id, status, gateway_payment_id, customer_email, payment_details, notified_at";

const GIFT_COLUMNS: &str = "id, payment_status, status, gateway_payment_id, purchaser_name, \
     recipient_name, recipient_email, message, payment_details, notified_at";

const SUBSCRIPTION_COLUMNS: &str = "id, status, gateway_subscription_id, subscriber_email, \
     plan_name, started_at, gateway_details, notified_at";

#[derive(Clone)]
pub struct PgEntityRepository {
    pool: PgPool,
}

impl PgEntityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl EntityRepository for PgEntityRepository {
    fn find_order(&self, id: i64) -> RepoFuture<'_, Option<Order>> {
        Box::pin(async move {
            let row = sqlx::query_as::<_, OrderRow>(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
            row.map(Order::try_from).transpose()
        })
    }

    fn find_order_by_payment_id(&self, payment_id: &GatewayId) -> RepoFuture<'_, Option<Order>> {
        let payment_id = payment_id.clone();
        Box::pin(async move {
            // Latest order wins if a payment id was ever reused.
            let row = sqlx::query_as::<_, OrderRow>(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders WHERE gateway_payment_id = $1 \
                 ORDER BY id DESC LIMIT 1"
            ))
            .bind(payment_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
            row.map(Order::try_from).transpose()
        })
    }

    fn find_gift(&self, id: i64) -> RepoFuture<'_, Option<Gift>> {
        Box::pin(async move {
            let row = sqlx::query_as::<_, GiftRow>(&format!(
                "SELECT {GIFT_COLUMNS} FROM gifts WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
            row.map(Gift::try_from).transpose()
        })
    }

    fn find_subscription_by_gateway_id(
        &self,
        subscription_id: &GatewayId,
    ) -> RepoFuture<'_, Option<Subscription>> {
        let subscription_id = subscription_id.clone();
        Box::pin(async move {
            let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE gateway_subscription_id = $1"
            ))
            .bind(subscription_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
            row.map(Subscription::try_from).transpose()
        })
    }

    fn update_order(&self, update: &OrderUpdate) -> RepoFuture<'_, ()> {
        let update = update.clone();
        Box::pin(async move {
            let result = sqlx::query(
                r#"
                UPDATE orders
                SET status = $2, gateway_payment_id = $3, payment_details = $4, updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(update.id)
            .bind(update.status.as_str())
            .bind(update.gateway_payment_id.as_str())
            .bind(&update.payment_details)
            .execute(&self.pool)
            .await?;
            expect_one_row(result.rows_affected(), "order", update.id)
        })
    }

    fn update_gift(&self, update: &GiftUpdate) -> RepoFuture<'_, ()> {
        let update = update.clone();
        Box::pin(async move {
            let result = sqlx::query(
                r#"
                UPDATE gifts
                SET payment_status = $2, status = $3, gateway_payment_id = $4,
                    payment_details = $5, updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(update.id)
            .bind(update.payment_status.as_str())
            .bind(update.status.as_str())
            .bind(update.gateway_payment_id.as_str())
            .bind(&update.payment_details)
            .execute(&self.pool)
            .await?;
            expect_one_row(result.rows_affected(), "gift", update.id)
        })
    }

    fn update_subscription(&self, update: &SubscriptionUpdate) -> RepoFuture<'_, ()> {
        let update = update.clone();
        Box::pin(async move {
            // COALESCE keeps an existing started_at even if a racing writer set it.
            let result = sqlx::query(
                r#"
                UPDATE subscriptions
                SET status = $2, started_at = COALESCE(started_at, $3),
                    gateway_details = $4, updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(update.id)
            .bind(update.status.as_str())
            .bind(update.started_at)
            .bind(&update.gateway_details)
            .execute(&self.pool)
            .await?;
            expect_one_row(result.rows_affected(), "subscription", update.id)
        })
    }

    fn mark_order_notified(&self, id: i64, at: DateTime<Utc>) -> RepoFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE orders SET notified_at = $2, updated_at = now() \
                 WHERE id = $1 AND notified_at IS NULL",
            )
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn mark_gift_notified(&self, id: i64, at: DateTime<Utc>) -> RepoFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE gifts SET notified_at = $2, status = 'notified', updated_at = now() \
                 WHERE id = $1 AND notified_at IS NULL",
            )
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn mark_subscription_notified(&self, id: i64, at: DateTime<Utc>) -> RepoFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE subscriptions SET notified_at = $2, updated_at = now() \
                 WHERE id = $1 AND notified_at IS NULL",
            )
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        })
    }
}

fn expect_one_row(rows: u64, entity: &str, id: i64) -> Result<(), ReconcileError> {
    if rows == 0 {
        return Err(ReconcileError::Persistence(format!(
            "{entity} {id} vanished before update"
        )));
    }
    Ok(())
}
