pub mod entity_repo;
pub mod idempotency_repo;
