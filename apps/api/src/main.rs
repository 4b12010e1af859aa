//! # Till API server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Till API Server                                │
//! │                                                                         │
//! │  Client ───► HTTP (8080) ───► handlers ───► SQLite (WAL)               │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │                            webhook (optional)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use till_api::config::ApiConfig;
use till_api::{build_router, notify, AppState};
use till_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,till_api=debug,till_db=debug")),
        )
        .with_target(true)
        .init();

    info!("Starting Till API server...");

    let config = ApiConfig::load().context("loading configuration")?;
    info!(
        port = config.http_port,
        database = %config.database_path,
        tax_rate_bps = config.tax_rate_bps,
        allow_underpayment = config.allow_underpayment,
        "Configuration loaded"
    );

    let db = Database::new(DbConfig::new(&config.database_path).max_connections(config.max_db_connections))
        .await
        .with_context(|| format!("opening {}", config.database_path))?;
    info!("Database ready");

    match db.users().purge_expired_revocations(chrono::Utc::now()).await {
        Ok(purged) if purged > 0 => info!(purged, "Purged expired token revocations"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Could not purge expired token revocations"),
    }

    let notifier = notify::from_config(&config);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = AppState::new(db.clone(), config, notifier);
    let app = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
