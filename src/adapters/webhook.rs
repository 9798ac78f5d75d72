use {
    crate::{AppState, domain::notification::InboundNotification},
    axum::{
        Router,
        body::Bytes,
        extract::{
            DefaultBodyLimit, Query, State,
            rejection::{BytesRejection, QueryRejection},
        },
        http::StatusCode,
        routing::{get, post},
    },
    serde::Deserialize,
    std::time::Duration,
    tower_http::{timeout::TimeoutLayer, trace::TraceLayer},
};

/// Largest body accepted on the webhook routes. Gateway notifications are a
/// few hundred bytes.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Query-string form used by some gateway notification styles.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    topic: Option<String>,
    #[serde(rename = "data.id")]
    data_id: Option<String>,
    id: Option<String>,
}

impl WebhookQuery {
    fn kind(&self) -> Option<&str> {
        self.kind.as_deref().or(self.topic.as_deref())
    }

    fn id(&self) -> Option<&str> {
        self.data_id.as_deref().or(self.id.as_deref())
    }
}

/// Acknowledges every call with `200 OK` and reconciles in a detached task.
/// The gateway retries on anything else, and retries never fix a bad body,
/// including one over [`MAX_BODY_BYTES`].
#[tracing::instrument(
    name = "webhook",
    skip_all,
    fields(kind = tracing::field::Empty, gateway_id = tracing::field::Empty)
)]
pub async fn webhook_handler(
    State(state): State<AppState>,
    query: Result<Query<WebhookQuery>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> (StatusCode, &'static str) {
    // Oversized or truncated bodies are acknowledged too; a redelivery would
    // carry the same bytes.
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, "unreadable webhook body, acknowledging");
            return (StatusCode::OK, "OK");
        }
    };
    // Garbled query strings fall back to the body alone.
    let query = query.map(|Query(q)| q).unwrap_or_default();
    match InboundNotification::parse(&body, query.kind(), query.id()) {
        Ok(notification) => {
            tracing::Span::current()
                .record("kind", tracing::field::display(notification.kind))
                .record("gateway_id", tracing::field::display(&notification.gateway_id));

            let engine = state.engine.clone();
            tokio::spawn(async move { engine.handle(notification).await });
        }
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unusable notification");
        }
    }

    (StatusCode::OK, "OK")
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/webhook", post(webhook_handler))
        .route("/webhooks/payments", post(webhook_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
