pub mod entity;
pub mod error;
pub mod gateway;
pub mod id;
pub mod idempotency;
pub mod money;
pub mod notification;
pub mod notifier;
pub mod repository;
pub mod status_map;
