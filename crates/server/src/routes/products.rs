//! Product catalog routes. Writes are admin-only.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use minimart_core::ProductId;

use crate::db::products::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::AdminUser;
use crate::models::product::{NewProduct, Product, ProductPatch};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

const fn default_page() -> u32 {
    1
}

const fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// GET /products
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Product>>> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);

    let products = ProductRepository::new(state.pool()).list(page, limit).await?;
    Ok(Json(products))
}

/// GET /products/categories
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let categories = ProductRepository::new(state.pool()).categories().await?;
    Ok(Json(categories))
}

/// GET /products/{id}
///
/// # Errors
///
/// 404 if the product doesn't exist.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(Json(product))
}

/// POST /products (admin)
pub async fn create(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Json(new): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = ProductRepository::new(state.pool()).create(&new).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /products/{id} (admin)
///
/// # Errors
///
/// 400 for an empty patch, 404 if the product doesn't exist.
pub async fn update(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<ProductId>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<Product>> {
    if patch.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_owned()));
    }

    let product = ProductRepository::new(state.pool()).update(id, &patch).await?;
    Ok(Json(product))
}

/// DELETE /products/{id} (admin)
///
/// # Errors
///
/// 404 if the product doesn't exist.
pub async fn remove(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    let deleted = ProductRepository::new(state.pool()).delete(id).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("product {id}")));
    }

    Ok(StatusCode::NO_CONTENT)
}
