use {
    crate::infra::postgres::idempotency_repo::PgIdempotencyLedger,
    std::time::Duration,
    tokio::sync::watch,
};

/// Periodically delete ledger keys older than `ttl`.
pub async fn run_ledger_sweeper(
    ledger: PgIdempotencyLedger,
    ttl: Duration,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(ttl_secs = ttl.as_secs(), "idempotency ledger sweeper started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("idempotency ledger sweeper shutting down");
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        match ledger.sweep_expired(ttl).await {
            Ok(0) => {}
            Ok(n) => tracing::info!(count = n, "swept expired idempotency keys"),
            Err(e) => tracing::error!(error = %e, "ledger sweep error"),
        }
    }
}
