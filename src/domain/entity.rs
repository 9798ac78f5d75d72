use {
    super::error::ReconcileError,
    super::id::GatewayId,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Paid,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = ReconcileError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "paid" => Ok(Self::Paid),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            other => Err(ReconcileError::Validation(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

/// Outcome of the money side of a gift purchase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GiftPaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl GiftPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for GiftPaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for GiftPaymentStatus {
    type Error = ReconcileError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            other => Err(ReconcileError::Validation(format!(
                "unknown gift payment status: {other}"
            ))),
        }
    }
}

/// Delivery side of a gift. `Notified` is reached only together with
/// `notified_at`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GiftStatus {
    Pending,
    Paid,
    Notified,
}

impl GiftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Notified => "notified",
        }
    }
}

impl fmt::Display for GiftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for GiftStatus {
    type Error = ReconcileError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "notified" => Ok(Self::Notified),
            other => Err(ReconcileError::Validation(format!(
                "unknown gift status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Paused,
    Cancelled,
    Failed,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for SubscriptionStatus {
    type Error = ReconcileError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "cancelled" => Ok(Self::Cancelled),
            "failed" => Ok(Self::Failed),
            other => Err(ReconcileError::Validation(format!(
                "unknown subscription status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    pub status: OrderStatus,
    pub gateway_payment_id: Option<GatewayId>,
    pub customer_email: String,
    /// Last canonical record seen for this order.
    pub payment_details: Option<serde_json::Value>,
    pub notified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gift {
    pub id: i64,
    pub payment_status: GiftPaymentStatus,
    pub status: GiftStatus,
    pub gateway_payment_id: Option<GatewayId>,
    pub purchaser_name: String,
    pub recipient_name: String,
    pub recipient_email: String,
    pub message: Option<String>,
    pub payment_details: Option<serde_json::Value>,
    pub notified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub id: i64,
    pub status: SubscriptionStatus,
    pub gateway_subscription_id: GatewayId,
    pub subscriber_email: String,
    pub plan_name: String,
    pub started_at: Option<DateTime<Utc>>,
    pub gateway_details: Option<serde_json::Value>,
    pub notified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Order,
    Gift,
    Subscription,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Gift => "gift",
            Self::Subscription => "subscription",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of resolving a canonical record: exactly one local entity.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedEntity {
    Order(Order),
    Gift(Gift),
    Subscription(Subscription),
}

impl ResolvedEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Order(_) => EntityKind::Order,
            Self::Gift(_) => EntityKind::Gift,
            Self::Subscription(_) => EntityKind::Subscription,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Self::Order(o) => o.id,
            Self::Gift(g) => g.id,
            Self::Subscription(s) => s.id,
        }
    }
}

/// Status write for an order. Status, gateway id and snapshot land together.
#[derive(Debug, Clone)]
pub struct OrderUpdate {
    pub id: i64,
    pub status: OrderStatus,
    pub gateway_payment_id: GatewayId,
    pub payment_details: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct GiftUpdate {
    pub id: i64,
    pub payment_status: GiftPaymentStatus,
    pub status: GiftStatus,
    pub gateway_payment_id: GatewayId,
    pub payment_details: serde_json::Value,
}

/// `started_at` is only ever filled, never replaced; stores must keep an
/// existing value.
#[derive(Debug, Clone)]
pub struct SubscriptionUpdate {
    pub id: i64,
    pub status: SubscriptionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub gateway_details: serde_json::Value,
}
