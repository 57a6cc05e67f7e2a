//! # TechStore Server
//!
//! HTTP front of the store: login and menu pages, report pages and PDFs,
//! and a JSON API over the catalog, sales and credits.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Request Flow                                    │
//! │                                                                         │
//! │  Browser ──► TraceLayer ──► public routes (/login, /health, ...)        │
//! │                  │                                                      │
//! │                  └─────► require_session (SESSION_ID cookie)            │
//! │                              │  missing/expired: /login or 401 JSON     │
//! │                              ▼                                          │
//! │                         handlers ──► services ──► techstore-db          │
//! │                              │                                          │
//! │                              ▼                                          │
//! │                   HTML page │ PDF bytes │ JSON                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Access Levels
//! Reads are open to every level, writes need Level2 and user or session log
//! administration needs Level1. See [`auth::require`].

pub mod auth;
pub mod config;
pub mod error;
pub mod render;
pub mod routes;
pub mod services;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use techstore_db::Database;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::services::{AuthService, ReportService, SaleService};
use crate::session::{ExpiredSession, InMemorySessionStore, SessionPolicy, SessionStore};

pub use routes::app;


/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub sessions: Arc<dyn SessionStore>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// State with an in-memory session store built from the session settings.
    pub fn new(db: Database, config: ServerConfig) -> Self {
        let policy = SessionPolicy::new(
            Duration::from_secs(config.session.idle_timeout_secs),
            Duration::from_secs(config.session.absolute_timeout_secs),
        );
        Self::with_sessions(db, config, Arc::new(InMemorySessionStore::new(policy)))
    }

    pub fn with_sessions(db: Database, config: ServerConfig, sessions: Arc<dyn SessionStore>) -> Self {
        AppState {
            db,
            sessions,
            config: Arc::new(config),
        }
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.db.clone())
    }

    pub fn sales(&self) -> SaleService {
        SaleService::new(self.db.clone())
    }

    pub fn reports(&self) -> ReportService {
        ReportService::new(self.db.clone(), self.config.reports.clone())
    }

    /// Closes the session log rows of sessions dropped for inactivity.
    ///
    /// Failures are logged; the sessions are gone from the store either way.
    pub async fn close_expired(&self, expired: Vec<ExpiredSession>) {
        let auth = self.auth();
        for entry in expired {
            let id = entry.session.session_log_id;
            if let Err(e) = auth.record_expiry(id, entry.expired_at).await {
                warn!(session_log_id = id, error = %e, "Failed to close expired session log");
            }
        }
    }

    /// Drops every expired session and closes its log row.
    pub async fn purge_expired_sessions(&self) -> usize {
        let expired = self.sessions.purge_expired();
        let count = expired.len();
        self.close_expired(expired).await;
        count
    }
}

/// Periodically purges expired sessions so abandoned logins get a logout
/// time even when nobody touches them again.
pub fn spawn_session_sweeper(state: AppState, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let purged = state.purge_expired_sessions().await;
            if purged > 0 {
                debug!(purged, remaining = state.sessions.len(), "Expired sessions swept");
            }
        }
    })
}
