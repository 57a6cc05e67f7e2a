//! Clients, categories, suppliers and products.
//!
//! Reads are open to every level; creating, editing and deleting need
//! Level2.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use techstore_core::validation::{
    validate_new_category, validate_new_client, validate_new_product, validate_new_supplier,
};
use techstore_core::{
    AccessLevel, Category, Client, NewCategory, NewClient, NewProduct, NewSupplier, Product, Supplier,
};

use crate::auth::CurrentSession;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/clients", get(list_clients).post(create_client))
        .route(
            "/api/clients/{id}",
            get(get_client).put(update_client).delete(delete_client),
        )
        .route("/api/clients/by-document/{document}", get(client_by_document))
        .route("/api/categories", get(list_categories).post(create_category))
        .route(
            "/api/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/api/suppliers", get(list_suppliers).post(create_supplier))
        .route(
            "/api/suppliers/{id}",
            get(get_supplier).put(update_supplier).delete(delete_supplier),
        )
        .route("/api/products", get(list_products).post(create_product))
        .route("/api/products/available", get(available_products))
        .route(
            "/api/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

// =============================================================================
// Clients
// =============================================================================

async fn list_clients(State(state): State<AppState>) -> ApiResult<Json<Vec<Client>>> {
    Ok(Json(state.db.clients().list().await?))
}

async fn get_client(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Client>> {
    state
        .db
        .clients()
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Client", id))
}

async fn client_by_document(
    State(state): State<AppState>,
    Path(document): Path<String>,
) -> ApiResult<Json<Client>> {
    state
        .db
        .clients()
        .find_by_document(&document)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Client with document", document.trim()))
}

async fn create_client(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(client): Json<NewClient>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    current.require(AccessLevel::Level2)?;
    validate_new_client(&client)?;

    let created = state.db.clients().insert(&client).await?;
    tracing::info!(client_id = created.id, "Client created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_client(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<i64>,
    Json(client): Json<NewClient>,
) -> ApiResult<Json<Client>> {
    current.require(AccessLevel::Level2)?;
    validate_new_client(&client)?;

    Ok(Json(state.db.clients().update(id, &client).await?))
}

async fn delete_client(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    current.require(AccessLevel::Level2)?;
    state.db.clients().delete(id).await?;
    tracing::info!(client_id = id, "Client deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Categories
// =============================================================================

async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.db.categories().list().await?))
}

async fn get_category(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Category>> {
    state
        .db
        .categories()
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Category", id))
}

async fn create_category(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(category): Json<NewCategory>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    current.require(AccessLevel::Level2)?;
    validate_new_category(&category)?;

    let created = state.db.categories().insert(&category).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_category(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<i64>,
    Json(category): Json<NewCategory>,
) -> ApiResult<Json<Category>> {
    current.require(AccessLevel::Level2)?;
    validate_new_category(&category)?;

    Ok(Json(state.db.categories().update(id, &category).await?))
}

async fn delete_category(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    current.require(AccessLevel::Level2)?;
    state.db.categories().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Suppliers
// =============================================================================

async fn list_suppliers(State(state): State<AppState>) -> ApiResult<Json<Vec<Supplier>>> {
    Ok(Json(state.db.suppliers().list().await?))
}

async fn get_supplier(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Supplier>> {
    state
        .db
        .suppliers()
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Supplier", id))
}

async fn create_supplier(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(supplier): Json<NewSupplier>,
) -> ApiResult<(StatusCode, Json<Supplier>)> {
    current.require(AccessLevel::Level2)?;
    validate_new_supplier(&supplier)?;

    let created = state.db.suppliers().insert(&supplier).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_supplier(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<i64>,
    Json(supplier): Json<NewSupplier>,
) -> ApiResult<Json<Supplier>> {
    current.require(AccessLevel::Level2)?;
    validate_new_supplier(&supplier)?;

    Ok(Json(state.db.suppliers().update(id, &supplier).await?))
}

async fn delete_supplier(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    current.require(AccessLevel::Level2)?;
    state.db.suppliers().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Products
// =============================================================================

async fn list_products(State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.products().list().await?))
}

/// Products with stock left, the ones a sale can use.
async fn available_products(State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.products().list_available().await?))
}

async fn get_product(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Product>> {
    state
        .db
        .products()
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Product", id))
}

async fn create_product(
    State(state): State<AppState>,
    current: CurrentSession,
    Json(product): Json<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    current.require(AccessLevel::Level2)?;
    validate_new_product(&product)?;

    let created = state.db.products().insert(&product).await?;
    tracing::info!(product_id = created.id, stock = created.stock, "Product created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_product(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<i64>,
    Json(product): Json<NewProduct>,
) -> ApiResult<Json<Product>> {
    current.require(AccessLevel::Level2)?;
    validate_new_product(&product)?;

    Ok(Json(state.db.products().update(id, &product).await?))
}

async fn delete_product(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    current.require(AccessLevel::Level2)?;
    state.db.products().delete(id).await?;
    tracing::info!(product_id = id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}
