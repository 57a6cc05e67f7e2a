//! Menu, report pages and PDF downloads.

use axum::{
    extract::{Query, State},
    response::{Html, Response},
    routing::get,
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use techstore_core::AccessLevel;

use super::{empty_as_none, pdf_response};
use crate::auth::CurrentSession;
use crate::render::html::{self, HtmlError};
use crate::render::{pdf, tables, TableReport};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/menu", get(menu))
        .route("/reports", get(reports))
        .route("/reports/daily-sales", get(daily_sales_page))
        .route("/reports/daily-sales.pdf", get(daily_sales_pdf))
        .route("/reports/outstanding-credits", get(outstanding_credits_page))
        .route("/reports/outstanding-credits.pdf", get(outstanding_credits_pdf))
        .route("/reports/session-log", get(session_log_page))
        .route("/reports/session-log.pdf", get(session_log_pdf))
        .route("/reports/invoice", get(invoice_pdf))
        .route("/reports/monthly-sales", get(monthly_sales_pdf))
        .route("/reports/vat-quarter", get(vat_quarter_pdf))
        .route("/reports/sales-by-type", get(sales_by_type_pdf))
        .route("/reports/inventory-by-category", get(inventory_by_category_pdf))
        .route("/reports/overdue-clients", get(overdue_clients_pdf))
}

type PageResult = Result<Html<String>, HtmlError>;
type PdfResult = Result<Response, HtmlError>;

#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceQuery {
    pub sale_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Deserialize)]
pub struct QuarterQuery {
    pub quarter: u32,
    pub year: i32,
}

fn table_pdf(report: &TableReport, filename: &str) -> PdfResult {
    let bytes = pdf::table_document(report).map_err(crate::error::ApiError::from)?;
    Ok(pdf_response(filename, bytes))
}

async fn menu(current: CurrentSession) -> Html<String> {
    Html(html::menu_page(&current.session))
}

async fn reports(current: CurrentSession) -> Html<String> {
    Html(html::reports_page(&current.session))
}

// =============================================================================
// Daily sales
// =============================================================================

async fn daily_sales_report(state: &AppState, range: &DateRangeQuery) -> Result<TableReport, HtmlError> {
    let rows = state.reports().daily_sales(range.from, range.to).await?;
    Ok(tables::daily_sales(&rows, range.from, range.to))
}

async fn daily_sales_page(
    State(state): State<AppState>,
    current: CurrentSession,
    Query(range): Query<DateRangeQuery>,
) -> PageResult {
    let report = daily_sales_report(&state, &range).await?;

    let mut pdf_href = String::from("/reports/daily-sales.pdf");
    let params: Vec<String> = [("from", range.from), ("to", range.to)]
        .into_iter()
        .filter_map(|(name, date)| date.map(|d| format!("{name}={d}")))
        .collect();
    if !params.is_empty() {
        pdf_href.push('?');
        pdf_href.push_str(&params.join("&"));
    }

    Ok(Html(html::table_page(&report, &current.session, Some(&pdf_href))))
}

async fn daily_sales_pdf(
    State(state): State<AppState>,
    _current: CurrentSession,
    Query(range): Query<DateRangeQuery>,
) -> PdfResult {
    let report = daily_sales_report(&state, &range).await?;
    table_pdf(&report, "daily-sales.pdf")
}

// =============================================================================
// Outstanding credits
// =============================================================================

async fn outstanding_credits_page(State(state): State<AppState>, current: CurrentSession) -> PageResult {
    let rows = state.reports().outstanding_credits().await?;
    let report = tables::outstanding_credits(&rows);
    Ok(Html(html::table_page(
        &report,
        &current.session,
        Some("/reports/outstanding-credits.pdf"),
    )))
}

async fn outstanding_credits_pdf(State(state): State<AppState>, _current: CurrentSession) -> PdfResult {
    let rows = state.reports().outstanding_credits().await?;
    table_pdf(&tables::outstanding_credits(&rows), "outstanding-credits.pdf")
}

// =============================================================================
// Session log (Level1)
// =============================================================================

async fn session_log_report(
    state: &AppState,
    current: &CurrentSession,
    query: &LimitQuery,
) -> Result<TableReport, HtmlError> {
    current.require(AccessLevel::Level1)?;

    let reports = state.reports();
    let limit = reports.session_log_limit(query.limit);
    let rows = reports.session_log(Some(limit)).await?;
    Ok(tables::session_log(&rows, limit))
}

async fn session_log_page(
    State(state): State<AppState>,
    current: CurrentSession,
    Query(query): Query<LimitQuery>,
) -> PageResult {
    let report = session_log_report(&state, &current, &query).await?;
    let pdf_href = match query.limit {
        Some(limit) => format!("/reports/session-log.pdf?limit={limit}"),
        None => "/reports/session-log.pdf".to_string(),
    };
    Ok(Html(html::table_page(&report, &current.session, Some(&pdf_href))))
}

async fn session_log_pdf(
    State(state): State<AppState>,
    current: CurrentSession,
    Query(query): Query<LimitQuery>,
) -> PdfResult {
    let report = session_log_report(&state, &current, &query).await?;
    table_pdf(&report, "session-log.pdf")
}

// =============================================================================
// PDF-only reports
// =============================================================================

async fn invoice_pdf(
    State(state): State<AppState>,
    _current: CurrentSession,
    Query(query): Query<InvoiceQuery>,
) -> PdfResult {
    let detail = state.reports().invoice(query.sale_id).await?;
    let bytes = pdf::invoice_document(&detail).map_err(crate::error::ApiError::from)?;
    Ok(pdf_response(&format!("invoice-{}.pdf", query.sale_id), bytes))
}

async fn monthly_sales_pdf(
    State(state): State<AppState>,
    _current: CurrentSession,
    Query(query): Query<MonthQuery>,
) -> PdfResult {
    let rows = state.reports().monthly_sales(query.month, query.year).await?;
    table_pdf(
        &tables::monthly_sales(&rows, query.month, query.year),
        &format!("sales-{}-{:02}.pdf", query.year, query.month),
    )
}

async fn vat_quarter_pdf(
    State(state): State<AppState>,
    _current: CurrentSession,
    Query(query): Query<QuarterQuery>,
) -> PdfResult {
    let summary = state.reports().vat_quarter(query.quarter, query.year).await?;
    table_pdf(
        &tables::vat_quarter(&summary),
        &format!("vat-{}-q{}.pdf", query.year, query.quarter),
    )
}

async fn sales_by_type_pdf(
    State(state): State<AppState>,
    _current: CurrentSession,
    Query(range): Query<DateRangeQuery>,
) -> PdfResult {
    let rows = state.reports().sales_by_type(range.from, range.to).await?;
    table_pdf(&tables::sales_by_type(&rows, range.from, range.to), "sales-by-type.pdf")
}

async fn inventory_by_category_pdf(State(state): State<AppState>, _current: CurrentSession) -> PdfResult {
    let rows = state.reports().inventory_by_category().await?;
    table_pdf(&tables::inventory_by_category(&rows), "inventory-by-category.pdf")
}

async fn overdue_clients_pdf(State(state): State<AppState>, _current: CurrentSession) -> PdfResult {
    let today = Utc::now().date_naive();
    let rows = state.reports().overdue_clients(today).await?;
    table_pdf(&tables::overdue_clients(&rows, today), "overdue-clients.pdf")
}
