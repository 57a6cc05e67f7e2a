//! HTTP routes.
//!
//! ## Layout
//! ```text
//! public      /health  /  /login  /api/login  POST /logout
//! protected   /menu  /reports/*            (HTML pages and PDFs)
//!             /api/clients  /api/categories  /api/suppliers  /api/products
//!             /api/users  /api/me/password  /api/session-logs
//!             /api/sales  /api/credits
//! ```
//!
//! Protected routes sit behind [`require_session`]. Level checks happen
//! inside each handler through [`CurrentSession::require`].
//!
//! [`CurrentSession::require`]: crate::auth::CurrentSession::require

pub mod auth;
pub mod catalog;
pub mod pages;
pub mod sales;
pub mod users;

use std::fmt::Display;
use std::str::FromStr;

use axum::{
    extract::State,
    http::header,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use tower_http::trace::TraceLayer;

use crate::auth::require_session;
use crate::AppState;

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .merge(pages::router())
        .merge(catalog::router())
        .merge(users::router())
        .merge(sales::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = if state.db.health_check().await {
        "ok"
    } else {
        "unavailable"
    };

    Json(HealthResponse {
        status: "ok",
        database,
    })
}

/// Inline PDF download.
pub(crate) fn pdf_response(filename: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Reads an optional query value, treating an empty field as absent.
///
/// HTML forms submit untouched inputs as `name=`, which a plain
/// `Option<T>` would reject.
pub(crate) fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
