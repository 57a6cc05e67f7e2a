//! Sales, credits and payments.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use techstore_core::sale::LineRequest;
use techstore_core::{AccessLevel, Credit, CreditDetail, CreditStatus, Money, Sale, SaleDetail};

use super::empty_as_none;
use crate::auth::CurrentSession;
use crate::error::ApiResult;
use crate::AppState;

/// Rows returned by `GET /api/sales` when no limit is given.
const DEFAULT_SALE_LIST_LIMIT: u32 = 100;
const MAX_SALE_LIST_LIMIT: u32 = 1_000;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sales", get(list_sales))
        .route("/api/sales/cash", post(register_cash_sale))
        .route("/api/sales/credit", post(register_credit_sale))
        .route("/api/sales/{id}", get(get_sale).delete(delete_sale))
        .route("/api/credits/pending", get(pending_credits))
        .route("/api/credits/mark-overdue", post(mark_overdue))
        .route("/api/credits/{id}", get(get_credit).delete(delete_credit))
        .route("/api/credits/{id}/payments", post(register_payment))
}

// =============================================================================
// Request / Response Bodies
// =============================================================================

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CashSaleRequest {
    pub client_id: i64,
    pub lines: Vec<LineRequest>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreditSaleRequest {
    pub client_id: i64,
    pub lines: Vec<LineRequest>,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct SaleCreated {
    pub sale_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct PaymentRequest {
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct PaymentResponse {
    pub payment_id: i64,
    pub remaining_cents: i64,
    pub status: CreditStatus,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct OverdueMarked {
    pub marked: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct SaleListQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<u32>,
}

// =============================================================================
// Sales
// =============================================================================

async fn register_cash_sale(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(request): Json<CashSaleRequest>,
) -> ApiResult<(StatusCode, Json<SaleCreated>)> {
    current.require(AccessLevel::Level2)?;

    let sale_id = state
        .sales()
        .register_cash_sale(current.user_id(), request.client_id, &request.lines)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SaleCreated {
            sale_id,
            credit_id: None,
        }),
    ))
}

async fn register_credit_sale(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(request): Json<CreditSaleRequest>,
) -> ApiResult<(StatusCode, Json<SaleCreated>)> {
    current.require(AccessLevel::Level2)?;

    let (sale_id, credit_id) = state
        .sales()
        .register_credit_sale(
            current.user_id(),
            request.client_id,
            &request.lines,
            request.due_date,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SaleCreated {
            sale_id,
            credit_id: Some(credit_id),
        }),
    ))
}

/// Newest sales first.
async fn list_sales(
    State(state): State<AppState>,
    Query(query): Query<SaleListQuery>,
) -> ApiResult<Json<Vec<Sale>>> {
    let limit = query
        .limit
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_SALE_LIST_LIMIT)
        .min(MAX_SALE_LIST_LIMIT);
    Ok(Json(state.sales().list_sales(limit).await?))
}

async fn get_sale(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<SaleDetail>> {
    Ok(Json(state.sales().sale_detail(id).await?))
}

async fn delete_sale(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    current.require(AccessLevel::Level1)?;
    state.sales().delete_sale(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Credits
// =============================================================================

async fn pending_credits(State(state): State<AppState>) -> ApiResult<Json<Vec<Credit>>> {
    Ok(Json(state.sales().pending_credits().await?))
}

async fn get_credit(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<CreditDetail>> {
    Ok(Json(state.sales().credit_detail(id).await?))
}

async fn register_payment(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<i64>,
    Json(request): Json<PaymentRequest>,
) -> ApiResult<(StatusCode, Json<PaymentResponse>)> {
    current.require(AccessLevel::Level2)?;

    let receipt = state
        .sales()
        .register_payment(id, Money::from_cents(request.amount_cents))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse {
            payment_id: receipt.payment_id,
            remaining_cents: receipt.remaining.cents(),
            status: receipt.status,
        }),
    ))
}

async fn delete_credit(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    current.require(AccessLevel::Level1)?;
    state.sales().delete_credit(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn mark_overdue(State(state): State<AppState>, current: CurrentSession) -> ApiResult<Json<OverdueMarked>> {
    current.require(AccessLevel::Level1)?;
    let marked = state.sales().mark_overdue_credits(Utc::now().date_naive()).await?;
    Ok(Json(OverdueMarked { marked }))
}
