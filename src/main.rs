use {
    gateway_sync::{
        AppState,
        adapters::{email::notifier_from_config, gateway_client::HttpGatewayClient, webhook},
        config::{Config, IdempotencyStore},
        domain::{idempotency::IdempotencyGuard, status_map::StatusMapper},
        infra::postgres::{entity_repo::PgEntityRepository, idempotency_repo::PgIdempotencyLedger},
        services::{
            idempotency::InMemoryGuard, reconcile::ReconciliationEngine,
            sweeper::run_ledger_sweeper,
        },
    },
    sqlx::postgres::PgPoolOptions,
    std::{sync::Arc, time::Duration},
    tokio::{signal, sync::watch},
    tracing_subscriber::EnvFilter,
};

const SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let mapper = match &config.status_map_path {
        Some(path) => {
            let json = tokio::fs::read_to_string(path).await?;
            tracing::info!(path = %path.display(), "loaded status map overrides");
            StatusMapper::from_overrides_json(&json)?
        }
        None => StatusMapper::default(),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let guard: Arc<dyn IdempotencyGuard> = match config.idempotency_store {
        IdempotencyStore::Postgres => {
            let ledger = PgIdempotencyLedger::new(pool.clone());
            tokio::spawn(run_ledger_sweeper(
                ledger.clone(),
                config.idempotency_ttl,
                SWEEP_INTERVAL,
                shutdown_rx,
            ));
            Arc::new(ledger)
        }
        IdempotencyStore::Memory => {
            tracing::warn!("in-memory idempotency guard: duplicates are only caught per process");
            Arc::new(InMemoryGuard::default())
        }
    };

    let engine = ReconciliationEngine::new(
        guard,
        Arc::new(HttpGatewayClient::new(&config.gateway)?),
        Arc::new(PgEntityRepository::new(pool)),
        notifier_from_config(&config.email)?,
        mapper,
    );

    let app = webhook::router(AppState {
        engine: Arc::new(engine),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
