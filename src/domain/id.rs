use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::error::ReconcileError;
use super::notification::NotificationKind;

/// Gateway-assigned identifier of a payment or a subscription (preapproval).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayId(String);

impl GatewayId {
    pub fn new(id: impl Into<String>) -> Result<Self, ReconcileError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ReconcileError::Validation(
                "GatewayId cannot be empty".into(),
            ));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ReconcileError::Validation(format!(
                "GatewayId contains unexpected characters: {trimmed}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Correlation string supplied when the payment was created on the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalReference(String);

pub const GIFT_REFERENCE_PREFIX: &str = "gift-";

impl ExternalReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into().trim().to_string())
    }

    pub fn for_gift(gift_id: i64) -> Self {
        Self(format!("{GIFT_REFERENCE_PREFIX}{gift_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Trailing id of a `gift-<id>` reference. `None` when the prefix is
    /// absent; `Some(Err)` when the prefix is present but the id is garbage.
    pub fn gift_id(&self) -> Option<Result<i64, ReconcileError>> {
        let rest = self.0.strip_prefix(GIFT_REFERENCE_PREFIX)?;
        Some(rest.parse::<i64>().map_err(|_| {
            ReconcileError::Validation(format!("malformed gift reference: {}", self.0))
        }))
    }

    /// Bare numeric order id, if the reference is one.
    pub fn order_id(&self) -> Option<i64> {
        self.0.parse::<i64>().ok().filter(|id| *id > 0)
    }
}

/// `<kind>-<gateway id>`, the dedup key for a notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(kind: NotificationKind, gateway_id: &GatewayId) -> Self {
        Self(format!("{}-{}", kind.as_str(), gateway_id.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_id_rejects_blank_and_path_like_values() {
        assert!(GatewayId::new("  ").is_err());
        assert!(GatewayId::new("12/../admin").is_err());
        for bad in ["..", "12#frag", "12%2F34", "12?x=1", "12 34"] {
            assert!(GatewayId::new(bad).is_err(), "{bad}");
        }
        assert!(GatewayId::new("2c93808-4_ab").is_ok());
        assert_eq!(GatewayId::new(" 123 ").unwrap().as_str(), "123");
    }

    #[test]
    fn gift_reference_parsing() {
        assert_eq!(ExternalReference::new("gift-7").gift_id().unwrap().unwrap(), 7);
        assert!(ExternalReference::new("gift-x").gift_id().unwrap().is_err());
        assert!(ExternalReference::new("42").gift_id().is_none());
        assert_eq!(ExternalReference::for_gift(9).as_str(), "gift-9");
    }

    #[test]
    fn order_reference_must_be_positive_number() {
        assert_eq!(ExternalReference::new("42").order_id(), Some(42));
        assert_eq!(ExternalReference::new("0").order_id(), None);
        assert_eq!(ExternalReference::new("abc").order_id(), None);
        assert_eq!(ExternalReference::new("").order_id(), None);
    }

    #[test]
    fn idempotency_key_format() {
        let id = GatewayId::new("P1").unwrap();
        assert_eq!(
            IdempotencyKey::new(NotificationKind::Payment, &id).as_str(),
            "payment-P1"
        );
        assert_eq!(
            IdempotencyKey::new(NotificationKind::SubscriptionEvent, &id).as_str(),
            "subscription-P1"
        );
    }
}
