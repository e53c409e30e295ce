//! Shopping cart domain types.

use serde::{Deserialize, Serialize};

use minimart_core::{Email, ProductId};

/// A single line in a cart: a product reference and a quantity.
///
/// Quantity is always positive; a quantity of zero removes the line instead
/// of being stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A user's shopping cart.
///
/// Exactly one cart exists per user identity. An absent cart row and a cart
/// with an empty item list are equivalent from the API's point of view.
#[derive(Debug, Clone, Serialize)]
pub struct Cart {
    pub user_email: Email,
    pub items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart for a user with no cart row yet.
    #[must_use]
    pub const fn empty(user_email: Email) -> Self {
        Self {
            user_email,
            items: Vec::new(),
        }
    }
}
