//! Product catalog domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use minimart_core::ProductId;

/// A catalog product.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Current catalog price. Orders freeze their own copy at checkout,
    /// so changing this never affects past orders.
    pub price: Decimal,
    pub category: Option<String>,
    pub in_stock: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub category: Option<String>,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

const fn default_in_stock() -> bool {
    true
}

/// Partial update to a product. Present fields are applied, absent fields
/// are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub in_stock: Option<bool>,
}

impl ProductPatch {
    /// Whether the patch carries no changes at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.category.is_none()
            && self.in_stock.is_none()
    }
}
