use {
    crate::domain::error::ReconcileError,
    crate::domain::id::IdempotencyKey,
    crate::domain::idempotency::{GuardFuture, IdempotencyGuard},
    sqlx::PgPool,
    std::time::Duration,
};

/// Idempotency keys shared by every instance pointing at the same database.
/// The primary key on `key` makes a claim an atomic insert-if-absent, so
/// concurrent instances racing on one key see exactly one winner.
#[derive(Clone)]
pub struct PgIdempotencyLedger {
    pool: PgPool,
}

impl PgIdempotencyLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete keys older than `ttl`. Returns the number of removed keys.
    pub async fn sweep_expired(&self, ttl: Duration) -> Result<u64, ReconcileError> {
        let secs = i64::try_from(ttl.as_secs())
            .map_err(|_| ReconcileError::Validation("ledger ttl out of range".into()))?;
        let result = sqlx::query(
            "DELETE FROM processed_notifications \
             WHERE processed_at < now() - make_interval(secs => $1::double precision)",
        )
        .bind(secs)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

impl IdempotencyGuard for PgIdempotencyLedger {
    fn has_processed(&self, key: &IdempotencyKey) -> GuardFuture<'_, bool> {
        let key = key.clone();
        Box::pin(async move {
            let seen: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM processed_notifications WHERE key = $1)",
            )
            .bind(key.as_str())
            .fetch_one(&self.pool)
            .await?;
            Ok(seen)
        })
    }

    fn claim(&self, key: &IdempotencyKey) -> GuardFuture<'_, bool> {
        let key = key.clone();
        Box::pin(async move {
            let result = sqlx::query(
                "INSERT INTO processed_notifications (key) VALUES ($1) ON CONFLICT (key) DO NOTHING",
            )
            .bind(key.as_str())
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() == 1)
        })
    }

    fn release(&self, key: &IdempotencyKey) -> GuardFuture<'_, ()> {
        let key = key.clone();
        Box::pin(async move {
            sqlx::query("DELETE FROM processed_notifications WHERE key = $1")
                .bind(key.as_str())
                .execute(&self.pool)
                .await?;
            Ok(())
        })
    }
}
