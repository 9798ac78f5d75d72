use {
    super::error::ReconcileError,
    std::{future::Future, pin::Pin},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

pub type NotifierFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ReconcileError>> + Send + 'a>>;

/// Outbound email transport.
pub trait Notifier: Send + Sync {
    fn send(&self, message: &EmailMessage) -> NotifierFuture<'_>;
}
