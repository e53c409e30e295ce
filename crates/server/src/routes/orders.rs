//! Order routes: checkout, history, and admin status transitions.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use minimart_core::{OrderId, OrderStatus};

use crate::error::{AppError, Result};
use crate::middleware::{AdminUser, CurrentUser};
use crate::models::order::Order;
use crate::services::order::OrderService;
use crate::state::AppState;

/// Request body for a status transition.
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

/// POST /orders
///
/// Converts the user's cart into a new `pending` order.
///
/// # Errors
///
/// 400 for an empty cart, 404 for a vanished product (cart preserved).
pub async fn checkout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<(StatusCode, Json<Order>)> {
    let order = OrderService::new(state.pool(), state.registry())
        .checkout(&user.email)
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders
pub async fn index(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderService::new(state.pool(), state.registry())
        .list_for_user(&user.email)
        .await?;

    Ok(Json(orders))
}

/// GET /orders/all (admin)
pub async fn index_all(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderService::new(state.pool(), state.registry())
        .list_all()
        .await?;

    Ok(Json(orders))
}

/// PUT /orders/{id}/status (admin)
///
/// Sets the order's status, appends to its history, and pushes a live
/// notification to the owner's channels.
///
/// # Errors
///
/// 400 for an unknown status value, 404 for an unknown order.
pub async fn set_status(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<OrderId>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<Order>> {
    let status: OrderStatus = req
        .status
        .parse()
        .map_err(|_| AppError::InvalidStatus(req.status.clone()))?;

    let order = OrderService::new(state.pool(), state.registry())
        .set_status(id, status)
        .await?;

    Ok(Json(order))
}
