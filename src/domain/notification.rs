use {
    super::error::ReconcileError,
    super::id::{GatewayId, IdempotencyKey},
    derive_more::Display,
    serde::Deserialize,
};

/// Which gateway resource a notification points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum NotificationKind {
    #[display("payment")]
    Payment,
    #[display("subscription")]
    SubscriptionEvent,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::SubscriptionEvent => "subscription",
        }
    }
}

impl TryFrom<&str> for NotificationKind {
    type Error = ReconcileError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "payment" => Ok(Self::Payment),
            "subscription_preapproval" | "preapproval" => Ok(Self::SubscriptionEvent),
            other => Err(ReconcileError::NotificationParse(format!(
                "unsupported notification type: {other}"
            ))),
        }
    }
}

/// Webhook body as the gateway sends it. Only `type` and `data.id` matter;
/// everything else is kept verbatim in `raw_payload`.
#[derive(Debug, Default, Deserialize)]
struct WebhookBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    data: Option<WebhookData>,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    id: Option<serde_json::Value>,
}

/// One inbound call, already reduced to "which resource, which id".
#[derive(Debug, Clone)]
pub struct InboundNotification {
    pub kind: NotificationKind,
    pub gateway_id: GatewayId,
    pub raw_payload: serde_json::Value,
}

impl InboundNotification {
    /// Parse a webhook call. The JSON body wins; `fallback_type` and
    /// `fallback_id` come from the query string for gateways that notify via
    /// `?type=payment&data.id=123` or `?topic=payment&id=123`.
    pub fn parse(
        body: &[u8],
        fallback_type: Option<&str>,
        fallback_id: Option<&str>,
    ) -> Result<Self, ReconcileError> {
        let raw_payload: serde_json::Value = if body.iter().all(u8::is_ascii_whitespace) {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(body).map_err(|e| {
                ReconcileError::NotificationParse(format!("body is not JSON: {e}"))
            })?
        };

        let parsed: WebhookBody = if raw_payload.is_object() {
            serde_json::from_value(raw_payload.clone()).map_err(|e| {
                ReconcileError::NotificationParse(format!("unexpected body shape: {e}"))
            })?
        } else {
            WebhookBody::default()
        };

        let kind_str = parsed
            .kind
            .as_deref()
            .or(fallback_type)
            .ok_or_else(|| ReconcileError::NotificationParse("missing type".into()))?;
        let kind = NotificationKind::try_from(kind_str)?;

        let id = parsed
            .data
            .and_then(|d| d.id)
            .and_then(|v| id_from_value(&v))
            .or_else(|| fallback_id.map(str::to_string))
            .ok_or_else(|| ReconcileError::NotificationParse("missing data.id".into()))?;
        let gateway_id = GatewayId::new(id)
            .map_err(|e| ReconcileError::NotificationParse(e.to_string()))?;

        Ok(Self {
            kind,
            gateway_id,
            raw_payload,
        })
    }

    pub fn idempotency_key(&self) -> IdempotencyKey {
        IdempotencyKey::new(self.kind, &self.gateway_id)
    }
}

fn id_from_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_and_numeric_ids() {
        let n = InboundNotification::parse(br#"{"type":"payment","data":{"id":"P1"}}"#, None, None)
            .unwrap();
        assert_eq!(n.kind, NotificationKind::Payment);
        assert_eq!(n.gateway_id.as_str(), "P1");

        let n = InboundNotification::parse(
            br#"{"type":"subscription_preapproval","action":"updated","data":{"id":98765}}"#,
            None,
            None,
        )
        .unwrap();
        assert_eq!(n.kind, NotificationKind::SubscriptionEvent);
        assert_eq!(n.gateway_id.as_str(), "98765");
    }

    #[test]
    fn missing_id_is_a_parse_error() {
        let err = InboundNotification::parse(br#"{"type":"payment","data":{}}"#, None, None)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::NotificationParse(_)));
    }

    #[test]
    fn unknown_type_is_a_parse_error() {
        let err =
            InboundNotification::parse(br#"{"type":"plan","data":{"id":"1"}}"#, None, None)
                .unwrap_err();
        assert!(matches!(err, ReconcileError::NotificationParse(_)));
    }

    #[test]
    fn garbage_body_is_a_parse_error() {
        let err = InboundNotification::parse(b"not json", None, None).unwrap_err();
        assert!(matches!(err, ReconcileError::NotificationParse(_)));
    }

    #[test]
    fn empty_body_uses_query_fallback() {
        let n = InboundNotification::parse(b"", Some("payment"), Some("555")).unwrap();
        assert_eq!(n.kind, NotificationKind::Payment);
        assert_eq!(n.gateway_id.as_str(), "555");
        assert!(n.raw_payload.is_null());
    }

    #[test]
    fn key_combines_kind_and_id() {
        let n = InboundNotification::parse(br#"{"type":"payment","data":{"id":"P1"}}"#, None, None)
            .unwrap();
        assert_eq!(n.idempotency_key().as_str(), "payment-P1");
    }
}
