use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("notification parse: {0}")]
    NotificationParse(String),

    #[error("gateway fetch: {0}")]
    GatewayFetch(String),

    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("persistence: {0}")]
    Persistence(String),

    #[error("email delivery: {0}")]
    Delivery(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for ReconcileError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<reqwest::Error> for ReconcileError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::GatewayFetch(format!("timed out: {err}"))
        } else {
            Self::GatewayFetch(err.to_string())
        }
    }
}
