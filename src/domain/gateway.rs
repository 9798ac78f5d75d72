use {
    super::error::ReconcileError,
    super::id::{ExternalReference, GatewayId},
    super::money::MoneyAmount,
    chrono::{DateTime, Utc},
    serde::Serialize,
    std::{future::Future, pin::Pin},
};

/// The gateway's own view of a payment or subscription, fetched by id.
/// Webhook payloads are never turned into one of these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    pub gateway_id: GatewayId,
    pub gateway_status: String,
    pub external_reference: ExternalReference,
    pub amount: MoneyAmount,
    pub approved_at: Option<DateTime<Utc>>,
    /// Present when the record is a subscription (preapproval).
    pub subscription_id: Option<GatewayId>,
}

impl CanonicalRecord {
    /// JSON snapshot persisted next to a status change.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "gateway_id": self.gateway_id.as_str(),
            "status": self.gateway_status,
            "external_reference": self.external_reference.as_str(),
            "amount": self.amount.cents(),
            "approved_at": self.approved_at.map(|t| t.to_rfc3339()),
            "subscription_id": self.subscription_id.as_ref().map(|id| id.as_str()),
        })
    }
}

pub type GatewayFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CanonicalRecord, ReconcileError>> + Send + 'a>>;

/// Read-only access to the gateway API. Implementations report every
/// failure as `ReconcileError::GatewayFetch` and do not retry.
pub trait GatewayClient: Send + Sync {
    fn fetch_payment(&self, id: &GatewayId) -> GatewayFuture<'_>;

    fn fetch_subscription(&self, id: &GatewayId) -> GatewayFuture<'_>;
}
