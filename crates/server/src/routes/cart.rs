//! Cart routes. Every endpoint operates on the authenticated user's cart.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use minimart_core::ProductId;

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::cart::Cart;
use crate::services::cart::CartService;
use crate::state::AppState;

/// One cart line in a request body.
#[derive(Debug, Deserialize)]
pub struct CartLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// GET /cart
pub async fn show(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Cart>> {
    let cart = CartService::new(state.pool()).view(&user.email).await?;
    Ok(Json(cart))
}

/// POST /cart/add
///
/// # Errors
///
/// 400 for a zero quantity.
pub async fn add(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(line): Json<CartLineRequest>,
) -> Result<Json<Cart>> {
    let cart = CartService::new(state.pool())
        .add(&user.email, line.product_id, line.quantity)
        .await?;

    Ok(Json(cart))
}

/// PUT /cart/update
///
/// Sets a line's quantity; zero removes the line.
///
/// # Errors
///
/// 404 if the product isn't in the cart.
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(line): Json<CartLineRequest>,
) -> Result<Json<Cart>> {
    let cart = CartService::new(state.pool())
        .update(&user.email, line.product_id, line.quantity)
        .await?;

    Ok(Json(cart))
}

/// DELETE /cart/{product_id}
///
/// # Errors
///
/// 404 if the product isn't in the cart.
pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Cart>> {
    let cart = CartService::new(state.pool())
        .remove(&user.email, product_id)
        .await?;

    Ok(Json(cart))
}

/// DELETE /cart
pub async fn clear(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Cart>> {
    let cart = CartService::new(state.pool()).clear(&user.email).await?;
    Ok(Json(cart))
}
