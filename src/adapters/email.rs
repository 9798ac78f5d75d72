use {
    crate::config::EmailConfig,
    crate::domain::error::ReconcileError,
    crate::domain::notifier::{EmailMessage, Notifier, NotifierFuture},
    reqwest::Client,
    serde::Serialize,
    std::{sync::Arc, time::Duration},
};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
}

/// Sends through the Resend API. A single attempt bounded by `timeout`;
/// failures surface as `Delivery` and the caller decides what to do with them.
#[derive(Clone)]
pub struct ResendNotifier {
    api_key: String,
    from: String,
    endpoint: String,
    http_client: Client,
}

impl ResendNotifier {
    pub fn new(api_key: String, from: String, timeout: Duration) -> Result<Self, ReconcileError> {
        Self::with_endpoint(api_key, from, RESEND_API_URL.to_string(), timeout)
    }

    pub fn with_endpoint(
        api_key: String,
        from: String,
        endpoint: String,
        timeout: Duration,
    ) -> Result<Self, ReconcileError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReconcileError::Delivery(format!("http client: {e}")))?;

        Ok(Self {
            api_key,
            from,
            endpoint,
            http_client,
        })
    }

    async fn send_inner(&self, message: &EmailMessage) -> Result<(), ReconcileError> {
        let request = ResendEmailRequest {
            from: &self.from,
            to: vec![message.to.as_str()],
            subject: &message.subject,
            html: &message.html,
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReconcileError::Delivery(format!("timed out: {e}"))
                } else {
                    ReconcileError::Delivery(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(%status, body = %body, "email provider rejected message");
        Err(ReconcileError::Delivery(format!("{status} - {body}")))
    }
}

impl Notifier for ResendNotifier {
    fn send(&self, message: &EmailMessage) -> NotifierFuture<'_> {
        let message = message.clone();
        Box::pin(async move { self.send_inner(&message).await })
    }
}

/// Stand-in when no email key is configured. Logs and reports success, so
/// the notified flag is still set.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, message: &EmailMessage) -> NotifierFuture<'_> {
        tracing::info!(to = %message.to, subject = %message.subject, "email (log only)");
        Box::pin(async { Ok(()) })
    }
}

/// Picks the transport from config.
pub fn notifier_from_config(config: &EmailConfig) -> Result<Arc<dyn Notifier>, ReconcileError> {
    match &config.api_key {
        Some(key) => Ok(Arc::new(ResendNotifier::new(
            key.clone(),
            config.from.clone(),
            config.timeout,
        )?)),
        None => {
            tracing::warn!("EMAIL_API_KEY not set, emails will only be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}
