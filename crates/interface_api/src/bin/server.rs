//! Farm Ledger - API Server Binary
//!
//! Starts the HTTP API over PostgreSQL-backed order, ledger and journal
//! adapters.
//!
//! # Usage
//!
//! ```bash
//! API_DATABASE_URL=postgres://... cargo run --bin farm-ledger-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//! * `API_LOG_LEVEL` - trace, debug, info, warn, error (default: info)
//! * `API_SYNC__BASE_CURRENCY` - Currency of totals and ledger amounts (default: BRL)
//! * `API_SYNC__REVENUE_CATEGORY` - Category of derived revenue entries (default: Sales)
//! * `API_SYNC__RECOVER_ON_STARTUP` - Replay pending sync intents at boot (default: true)

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_sync::BroadcastPublisher;
use infra_db::{
    create_pool, run_migrations, PostgresLedgerAdapter, PostgresOrderAdapter, PostgresSyncJournal,
};
use interface_api::{config::ApiConfig, create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid API configuration")?;

    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        base_currency = %config.sync.base_currency,
        "Starting Farm Ledger API Server"
    );

    let pool = create_pool(config.database())
        .await
        .context("failed to connect to database")?;
    run_migrations(&pool).await.context("failed to run migrations")?;

    let events = Arc::new(BroadcastPublisher::new(config.sync.event_channel_capacity));
    let state = AppState::from_ports(
        Arc::new(PostgresOrderAdapter::new(pool.clone())),
        Arc::new(PostgresLedgerAdapter::new(pool.clone())),
        Arc::new(PostgresSyncJournal::new(pool)),
        events,
        config.clone(),
    );

    if config.sync.recover_on_startup {
        recover(&state).await;
    }

    let app = create_router(state);
    let addr: SocketAddr = config.server_addr().parse().context("invalid server address")?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber; `RUST_LOG` wins over the configured level
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Replays sync intents left pending by a previous run
///
/// Failures are logged and left pending for the next pass; they never
/// prevent the server from starting.
async fn recover(state: &AppState) {
    match state.service.recover_pending(None).await {
        Ok(report) if report.examined == 0 => {
            tracing::info!("No pending sync intents");
        }
        Ok(report) => {
            tracing::info!(
                examined = report.examined,
                resynced = report.resynced.len(),
                purged = report.purged.len(),
                failed = report.failed.len(),
                "Startup recovery finished"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Startup recovery could not list pending intents");
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
