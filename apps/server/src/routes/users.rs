//! Staff accounts and the session log.
//!
//! Everything here needs Level1 except `PUT /api/me/password`, which any
//! logged-in user may call for their own account.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use techstore_core::{AccessLevel, NewUser, SessionLogEntryRow, User, UserStatus};

use super::pages::LimitQuery;
use crate::auth::CurrentSession;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/api/users/{id}/password", put(set_password))
        .route("/api/users/{id}/status", put(set_status))
        .route("/api/me/password", put(change_own_password))
        .route("/api/session-logs", get(session_logs))
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(flatten)]
    pub user: NewUser,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: UserStatus,
}

async fn list_users(State(state): State<AppState>, current: CurrentSession) -> ApiResult<Json<Vec<User>>> {
    current.require(AccessLevel::Level1)?;
    Ok(Json(state.db.users().list().await?))
}

async fn get_user(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<i64>,
) -> ApiResult<Json<User>> {
    current.require(AccessLevel::Level1)?;
    state
        .db
        .users()
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User", id))
}

async fn create_user(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    current.require(AccessLevel::Level1)?;
    let user = state.auth().create_user(&request.user, &request.password).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update_user(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<i64>,
    Json(user): Json<NewUser>,
) -> ApiResult<Json<User>> {
    current.require(AccessLevel::Level1)?;
    Ok(Json(state.auth().update_user(id, &user).await?))
}

async fn delete_user(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    current.require(AccessLevel::Level1)?;
    state.auth().delete_user(current.user_id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_password(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<i64>,
    Json(request): Json<PasswordRequest>,
) -> ApiResult<StatusCode> {
    current.require(AccessLevel::Level1)?;
    state.auth().change_password(id, &request.password).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_status(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<i64>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<Json<User>> {
    current.require(AccessLevel::Level1)?;
    if id == current.user_id() && request.status == UserStatus::Inactive {
        return Err(ApiError::validation("You cannot deactivate your own account"));
    }
    Ok(Json(state.auth().set_status(id, request.status).await?))
}

async fn change_own_password(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(request): Json<PasswordRequest>,
) -> ApiResult<StatusCode> {
    state.auth().change_password(current.user_id(), &request.password).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn session_logs(
    State(state): State<AppState>,
    current: CurrentSession,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<SessionLogEntryRow>>> {
    current.require(AccessLevel::Level1)?;
    Ok(Json(state.reports().session_log(query.limit).await?))
}
