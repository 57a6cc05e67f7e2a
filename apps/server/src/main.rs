//! # TechStore Server
//!
//! Starts the HTTP server over the store database.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. tracing (RUST_LOG or debug for the techstore crates)                │
//! │  2. config/techstore.toml + TECHSTORE__* env vars                       │
//! │  3. SQLite pool + embedded migrations                                   │
//! │  4. bootstrap administrator (only when no user exists)                  │
//! │  5. expired-session sweeper (session.sweep_interval_secs)               │
//! │  6. axum::serve until Ctrl+C / SIGTERM                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use techstore_db::{Database, DbConfig};
use techstore_server::config::ServerConfig;
use techstore_server::{app, spawn_session_sweeper, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,techstore_server=debug,techstore_db=debug,sqlx=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("Starting TechStore server...");

    let config = ServerConfig::load().context("Failed to load configuration")?;
    let addr = config.bind_addr()?;
    info!(
        %addr,
        database = %config.database.path,
        idle_timeout_secs = config.session.idle_timeout_secs,
        "Configuration loaded"
    );

    let db = Database::new(
        DbConfig::new(&config.database.path).max_connections(config.database.max_connections),
    )
    .await
    .context("Failed to open database")?;

    let state = AppState::new(db.clone(), config.clone());

    match (&config.bootstrap.admin_username, &config.bootstrap.admin_password) {
        (Some(username), Some(password)) => {
            if state.auth().ensure_admin(username, password).await?.is_none() {
                info!("Users already present, bootstrap administrator skipped");
            }
        }
        _ => {
            if db.users().count().await? == 0 {
                warn!("No users exist; set TECHSTORE__BOOTSTRAP__ADMIN_USERNAME and _PASSWORD or run the seed binary");
            }
        }
    }

    let sweeper = spawn_session_sweeper(
        state.clone(),
        Duration::from_secs(config.session.sweep_interval_secs),
    );

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(
        listener,
        app(state.clone()).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.abort();
    state.purge_expired_sessions().await;
    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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

    info!("Shutdown signal received, starting graceful shutdown...");
}
