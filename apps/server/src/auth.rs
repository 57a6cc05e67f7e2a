//! Cookie session authentication.
//!
//! [`require_session`] resolves the `SESSION_ID` cookie through the
//! session store and stores a [`CurrentSession`] in the request extensions.
//! Handlers then take `CurrentSession` as an extractor and call
//! [`CurrentSession::require`] for level checks.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use techstore_core::AccessLevel;

use crate::error::{ApiError, ApiResult};
use crate::session::{Session, SessionLookup};
use crate::AppState;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "SESSION_ID";

/// The logged-in caller of the current request.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub token: String,
    pub session: Session,
}

impl CurrentSession {
    /// Fails with `FORBIDDEN` unless the caller holds at least `level`.
    pub fn require(&self, level: AccessLevel) -> ApiResult<()> {
        if self.session.level.at_least(level) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = self.session.user_id,
                level = %self.session.level,
                required = %level,
                "Access denied"
            );
            Err(ApiError::forbidden(format!("{level} or higher required")))
        }
    }

    pub fn user_id(&self) -> i64 {
        self.session.user_id
    }

    pub fn level(&self) -> AccessLevel {
        self.session.level
    }
}

/// Rejects requests without a live session.
///
/// A session found expired has its log row closed before the rejection.
/// Pages are redirected to `/login`; `/api/*` requests get 401 JSON.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let mut current = None;
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let token = cookie.value().to_string();
        match state.sessions.get(&token) {
            SessionLookup::Live(session) => current = Some(CurrentSession { token, session }),
            SessionLookup::Expired(expired) => state.close_expired(vec![expired]).await,
            SessionLookup::Missing => {}
        }
    }

    match current {
        Some(current) => {
            request.extensions_mut().insert(current);
            next.run(request).await
        }
        None if request.uri().path().starts_with("/api/") => {
            ApiError::unauthorized("Authentication required").into_response()
        }
        None => Redirect::to("/login").into_response(),
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Session cookie for a fresh login.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Expires the session cookie in the browser.
pub fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current(level: AccessLevel) -> CurrentSession {
        CurrentSession {
            token: "t".to_string(),
            session: Session::new(1, "olga", "Olga", 1, level),
        }
    }

    #[test]
    fn test_require_levels() {
        assert!(current(AccessLevel::Level1).require(AccessLevel::Level1).is_ok());
        assert!(current(AccessLevel::Level1).require(AccessLevel::Level3).is_ok());
        assert!(current(AccessLevel::Level2).require(AccessLevel::Level2).is_ok());

        let err = current(AccessLevel::Level3).require(AccessLevel::Level2).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_session_cookie_flags() {
        let cookie = session_cookie("abc".to_string(), true);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }
}
