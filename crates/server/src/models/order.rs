//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use minimart_core::{Email, OrderId, OrderStatus, ProductId};

/// A frozen order line.
///
/// `price_at_purchase` is stamped at checkout and never recomputed, so later
/// catalog price changes cannot retroactively alter an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price_at_purchase: Decimal,
}

impl OrderItem {
    /// The line total: `price_at_purchase * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price_at_purchase * Decimal::from(self.quantity)
    }
}

/// One entry in an order's status history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: OrderStatus,
    pub at: DateTime<Utc>,
}

/// An order.
///
/// Core fields (owner, items, total, creation time) are immutable after
/// creation. Only `status` and the append-only `status_history` ever change.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_email: Email,
    pub items: Vec<OrderItem>,
    /// Sum of line totals, computed exactly once at creation.
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub status_history: Vec<StatusEntry>,
    pub created_at: DateTime<Utc>,
}
