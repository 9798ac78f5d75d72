pub mod dispatcher;
pub mod idempotency;
pub mod reconcile;
pub mod resolver;
pub mod sweeper;
