use {
    crate::config::GatewayConfig,
    crate::domain::{
        error::ReconcileError,
        gateway::{CanonicalRecord, GatewayClient, GatewayFuture},
        id::{ExternalReference, GatewayId},
        money::MoneyAmount,
    },
    chrono::{DateTime, Utc},
    reqwest::Url,
    serde::Deserialize,
};

/// `GET /v1/payments/{id}`, only the fields reconciliation reads.
#[derive(Debug, Deserialize)]
struct PaymentResource {
    #[serde(default)]
    id: serde_json::Value,
    status: String,
    external_reference: Option<String>,
    transaction_amount: Option<f64>,
    date_approved: Option<DateTime<Utc>>,
}

/// `GET /preapproval/{id}`.
#[derive(Debug, Deserialize)]
struct PreapprovalResource {
    #[serde(default)]
    id: serde_json::Value,
    status: String,
    external_reference: Option<String>,
    auto_recurring: Option<AutoRecurring>,
}

#[derive(Debug, Deserialize)]
struct AutoRecurring {
    transaction_amount: Option<f64>,
}

/// REST client for the gateway. Payment and subscription calls use separate
/// bearer credentials; every failure becomes `GatewayFetch` and is not retried.
pub struct HttpGatewayClient {
    http: reqwest::Client,
    base_url: Url,
    payment_token: String,
    subscription_token: String,
}

impl HttpGatewayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, ReconcileError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ReconcileError::GatewayFetch(format!("http client: {e}")))?;
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ReconcileError::Validation(format!("gateway base url: {e}")))?;

        Ok(Self {
            http,
            base_url,
            payment_token: config.payment_token.clone(),
            subscription_token: config.subscription_token.clone(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        token: &str,
    ) -> Result<T, ReconcileError> {
        let response = self.http.get(url.clone()).bearer_auth(token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReconcileError::GatewayFetch(format!(
                "GET {url} returned {status}: {}",
                truncate(&body, 200)
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ReconcileError::GatewayFetch(format!("GET {url}: bad body: {e}")))
    }

    async fn fetch_payment_inner(&self, id: &GatewayId) -> Result<CanonicalRecord, ReconcileError> {
        let url = endpoint(&self.base_url, &["v1", "payments", id.as_str()])?;
        let payment: PaymentResource = self.get_json(url, &self.payment_token).await?;

        Ok(CanonicalRecord {
            gateway_id: resource_id(&payment.id).unwrap_or_else(|| id.clone()),
            gateway_status: payment.status,
            external_reference: ExternalReference::new(
                payment.external_reference.unwrap_or_default(),
            ),
            amount: convert_amount(payment.transaction_amount),
            approved_at: payment.date_approved,
            subscription_id: None,
        })
    }

    async fn fetch_subscription_inner(
        &self,
        id: &GatewayId,
    ) -> Result<CanonicalRecord, ReconcileError> {
        let url = endpoint(&self.base_url, &["preapproval", id.as_str()])?;
        let preapproval: PreapprovalResource = self.get_json(url, &self.subscription_token).await?;

        let gateway_id = resource_id(&preapproval.id).unwrap_or_else(|| id.clone());
        Ok(CanonicalRecord {
            subscription_id: Some(gateway_id.clone()),
            gateway_id,
            gateway_status: preapproval.status,
            external_reference: ExternalReference::new(
                preapproval.external_reference.unwrap_or_default(),
            ),
            amount: convert_amount(
                preapproval
                    .auto_recurring
                    .and_then(|r| r.transaction_amount),
            ),
            approved_at: None,
        })
    }
}

impl GatewayClient for HttpGatewayClient {
    fn fetch_payment(&self, id: &GatewayId) -> GatewayFuture<'_> {
        let id = id.clone();
        Box::pin(async move { self.fetch_payment_inner(&id).await })
    }

    fn fetch_subscription(&self, id: &GatewayId) -> GatewayFuture<'_> {
        let id = id.clone();
        Box::pin(async move { self.fetch_subscription_inner(&id).await })
    }
}

fn resource_id(value: &serde_json::Value) -> Option<GatewayId> {
    let raw = match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    GatewayId::new(raw).ok()
}

/// Appends `segments` to the base path, percent-encoding each one, so an id
/// can never escape its path slot.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ReconcileError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ReconcileError::Validation(format!("gateway base url cannot be a base: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// The amount is informational only; a value the gateway should never send
/// is logged and stored as zero rather than failing the status update.
fn convert_amount(amount: Option<f64>) -> MoneyAmount {
    match amount.map(MoneyAmount::from_decimal) {
        Some(Ok(amount)) => amount,
        Some(Err(e)) => {
            tracing::warn!(error = %e, "unusable gateway amount, storing zero");
            MoneyAmount::default()
        }
        None => MoneyAmount::default(),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
