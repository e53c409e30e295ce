//! Integration tests for Minimart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p minimart-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `order_lifecycle` - Checkout pricing and status history scenarios
//! - `live_notifications` - Notification registry fan-out scenarios
//! - `api_contracts` - Error-to-status mapping and wire shapes
//!
//! The scenarios here run against the service and registry logic directly,
//! without a live database or HTTP server. Fixture builders shared across
//! the test files live in [`fixtures`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod fixtures {
    //! Shared builders for scenario tests.

    use chrono::Utc;
    use rust_decimal::Decimal;

    use minimart_core::{Email, OrderId, OrderStatus, ProductId};
    use minimart_server::models::cart::CartItem;
    use minimart_server::models::order::{Order, OrderItem, StatusEntry};

    /// Parse a decimal literal.
    ///
    /// # Panics
    ///
    /// Panics if the literal is not a valid decimal.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    /// Parse an email literal.
    ///
    /// # Panics
    ///
    /// Panics if the literal is not a valid email.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    /// A cart line.
    #[must_use]
    pub const fn cart_line(product_id: ProductId, quantity: u32) -> CartItem {
        CartItem {
            product_id,
            quantity,
        }
    }

    /// A freshly placed order with a single-entry `pending` history.
    #[must_use]
    pub fn pending_order(owner: &Email, items: Vec<OrderItem>, total_price: Decimal) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::generate(),
            user_email: owner.clone(),
            items,
            total_price,
            status: OrderStatus::Pending,
            status_history: vec![StatusEntry {
                status: OrderStatus::Pending,
                at: now,
            }],
            created_at: now,
        }
    }
}
