//! Login and logout.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts, State},
    http::{request::Parts, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use techstore_core::AccessLevel;

use crate::auth::{clear_session_cookie, session_cookie, SESSION_COOKIE};
use crate::error::ApiResult;
use crate::render::html::{self, HtmlError};
use crate::services::LoginOutcome;
use crate::session::{Session, SessionLookup};
use crate::AppState;

const LOGIN_FAILED: &str = "Invalid username or password";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(login_page))
        .route("/login", get(login_page).post(login_form))
        .route("/api/login", post(login_json))
        .route("/logout", post(logout))
}

/// Where a login came from, recorded on the session log.
///
/// The peer address, unless the peer is a configured trusted proxy that
/// sent `X-Forwarded-For`; then its first entry. `"web"` when neither is
/// known.
#[derive(Debug, Clone)]
pub struct ClientOrigin(pub String);

impl FromRequestParts<AppState> for ClientOrigin {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let forwarded = peer
            .filter(|ip| state.config.server.trusts(*ip))
            .and_then(|_| parts.headers.get("x-forwarded-for"))
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let origin = forwarded
            .or_else(|| peer.map(|ip| ip.to_string()))
            .unwrap_or_else(|| "web".to_string());

        Ok(ClientOrigin(origin))
    }
}

async fn has_live_session(state: &AppState, jar: &CookieJar) -> bool {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return false;
    };
    match state.sessions.get(cookie.value()) {
        SessionLookup::Live(_) => true,
        SessionLookup::Expired(expired) => {
            state.close_expired(vec![expired]).await;
            false
        }
        SessionLookup::Missing => false,
    }
}

/// Opens a server-side session for a successful login.
async fn start_session(state: &AppState, outcome: &LoginOutcome) -> String {
    state.purge_expired_sessions().await;
    state.sessions.create(Session::new(
        outcome.user.id,
        outcome.user.username.clone(),
        outcome.user.full_name(),
        outcome.session_log_id,
        outcome.level,
    ))
}

async fn login_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    if has_live_session(&state, &jar).await {
        return Redirect::to("/menu").into_response();
    }
    Html(html::login_page(None, "")).into_response()
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

async fn login_form(
    State(state): State<AppState>,
    ClientOrigin(origin): ClientOrigin,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, HtmlError> {
    let Some(outcome) = state
        .auth()
        .login(&form.username, &form.password, &origin, None)
        .await?
    else {
        let page = html::login_page(Some(LOGIN_FAILED), &form.username);
        return Ok((StatusCode::UNAUTHORIZED, Html(page)).into_response());
    };

    let token = start_session(&state, &outcome).await;
    let jar = jar.add(session_cookie(token, state.config.session.cookie_secure));
    Ok((jar, Redirect::to("/menu")).into_response())
}

/// JSON login body. The Spanish field names of older clients are accepted.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "correo")]
    pub username: String,
    #[serde(alias = "contrasena")]
    pub password: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoggedInUser {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub level: AccessLevel,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<LoggedInUser>,
}

async fn login_json(
    State(state): State<AppState>,
    ClientOrigin(origin): ClientOrigin,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Response> {
    let Some(outcome) = state
        .auth()
        .login(&request.username, &request.password, &origin, request.note.as_deref())
        .await?
    else {
        let body = LoginResponse {
            success: false,
            message: LOGIN_FAILED.to_string(),
            user: None,
        };
        return Ok((StatusCode::UNAUTHORIZED, Json(body)).into_response());
    };

    let token = start_session(&state, &outcome).await;
    let jar = jar.add(session_cookie(token, state.config.session.cookie_secure));
    let body = LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        user: Some(LoggedInUser {
            id: outcome.user.id,
            username: outcome.user.username.clone(),
            display_name: outcome.user.full_name(),
            level: outcome.level,
        }),
    };

    Ok((jar, Json(body)).into_response())
}

/// Ends the session, closes its log row and expires the cookie.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> Result<Response, HtmlError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        match state.sessions.destroy(cookie.value()) {
            SessionLookup::Live(session) => {
                state.auth().logout(session.session_log_id).await?;
            }
            SessionLookup::Expired(expired) => state.close_expired(vec![expired]).await,
            SessionLookup::Missing => {}
        }
    }

    Ok((clear_session_cookie(jar), Redirect::to("/login")).into_response())
}
