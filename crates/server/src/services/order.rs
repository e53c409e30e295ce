//! Order service: checkout and status transitions.
//!
//! Checkout converts a cart into an immutable-price order in one database
//! transaction: cart row locked, prices resolved, order inserted, cart
//! emptied. Any failure before commit leaves both the order store and the
//! cart exactly as they were.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;

use minimart_core::{Email, OrderId, OrderStatus, ProductId};

use crate::db::{RepositoryError, carts, orders, products};
use crate::models::cart::CartItem;
use crate::models::order::{Order, OrderItem, StatusEntry};
use crate::notify::{NotificationRegistry, PushEvent};

/// Errors from the checkout operation.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// The user has no cart, or the cart has no items.
    #[error("cart is empty")]
    EmptyCart,

    /// A cart line references a product that no longer exists.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Underlying repository error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Errors from the status-transition operation.
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    /// No order with the given ID exists.
    #[error("order not found")]
    OrderNotFound,

    /// Underlying repository error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Order lifecycle service.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    registry: &'a NotificationRegistry,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, registry: &'a NotificationRegistry) -> Self {
        Self { pool, registry }
    }

    /// Convert the user's cart into a new `pending` order.
    ///
    /// All-or-nothing: a missing product aborts before anything is
    /// persisted and before the cart is cleared. On success the cart is
    /// emptied (not deleted) in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if there is nothing to check out.
    /// Returns `CheckoutError::ProductNotFound` naming the first vanished
    /// product reference.
    pub async fn checkout(&self, email: &Email) -> Result<Order, CheckoutError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        // The row lock serializes this checkout against concurrent cart
        // mutations and concurrent checkouts for the same user.
        let cart_items = take_items(carts::lock_in_tx(&mut tx, email).await?)?;

        let mut prices = HashMap::with_capacity(cart_items.len());
        for item in &cart_items {
            match products::price_in_tx(&mut tx, item.product_id).await? {
                Some(price) => {
                    prices.insert(item.product_id, price);
                }
                None => return Err(CheckoutError::ProductNotFound(item.product_id)),
            }
        }

        let (items, total_price) = freeze_lines(&cart_items, &prices)?;

        let now = Utc::now();
        let order = Order {
            id: OrderId::generate(),
            user_email: email.clone(),
            items,
            total_price,
            status: OrderStatus::Pending,
            status_history: vec![StatusEntry {
                status: OrderStatus::Pending,
                at: now,
            }],
            created_at: now,
        };

        orders::insert_in_tx(&mut tx, &order).await?;
        carts::clear_in_tx(&mut tx, email).await?;
        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(order_id = %order.id, user = %email, total = %order.total_price, "order placed");
        Ok(order)
    }

    /// Set an order's status, appending to its history, and notify the
    /// owner's live channels.
    ///
    /// The transition graph is deliberately unrestricted (see
    /// [`OrderStatus`]); callers are responsible for authorization. A
    /// notification failure never fails the status update.
    ///
    /// # Errors
    ///
    /// Returns `StatusError::OrderNotFound` if the order doesn't exist.
    pub async fn set_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, StatusError> {
        let order = orders::OrderRepository::new(self.pool)
            .update_status(order_id, status, Utc::now())
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => StatusError::OrderNotFound,
                other => StatusError::Repository(other),
            })?;

        // Best-effort push, after the update is durable. Failures are
        // handled inside the registry (dead channels get disconnected).
        self.registry.push(
            &order.user_email,
            &PushEvent::OrderUpdate {
                order_id: order.id,
                new_status: order.status,
            },
        );

        tracing::info!(order_id = %order.id, status = %order.status, "order status updated");
        Ok(order)
    }

    /// List the orders placed by one user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, email: &Email) -> Result<Vec<Order>, RepositoryError> {
        orders::OrderRepository::new(self.pool).list_for_user(email).await
    }

    /// List every order in the store, newest first (admin view).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        orders::OrderRepository::new(self.pool).list_all().await
    }
}

/// Pull the item list out of a loaded cart row.
///
/// An absent row and a row with an empty item list look the same to
/// checkout: there is nothing to buy.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` when no items are present.
pub fn take_items(record: Option<carts::CartRecord>) -> Result<Vec<CartItem>, CheckoutError> {
    match record {
        Some(record) if !record.items.is_empty() => Ok(record.items),
        _ => Err(CheckoutError::EmptyCart),
    }
}

/// Freeze cart lines against a resolved price map.
///
/// Each produced line carries `price_at_purchase` copied from the map, and
/// the returned total is the exact sum of `price * quantity` over all lines.
///
/// # Errors
///
/// Returns `CheckoutError::ProductNotFound` for the first line whose
/// product is missing from the map.
pub fn freeze_lines(
    cart_items: &[CartItem],
    prices: &HashMap<ProductId, Decimal>,
) -> Result<(Vec<OrderItem>, Decimal), CheckoutError> {
    let mut items = Vec::with_capacity(cart_items.len());
    let mut total = Decimal::ZERO;

    for line in cart_items {
        let price = *prices
            .get(&line.product_id)
            .ok_or(CheckoutError::ProductNotFound(line.product_id))?;

        let item = OrderItem {
            product_id: line.product_id,
            quantity: line.quantity,
            price_at_purchase: price,
        };
        total += item.line_total();
        items.push(item);
    }

    Ok((items, total))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn cart_line(product_id: ProductId, quantity: u32) -> CartItem {
        CartItem {
            product_id,
            quantity,
        }
    }

    #[test]
    fn test_freeze_lines_totals_exactly() {
        let a = ProductId::generate();
        let b = ProductId::generate();
        let cart = vec![cart_line(a, 2), cart_line(b, 3)];
        let prices = HashMap::from([(a, dec("10.00")), (b, dec("0.10"))]);

        let (items, total) = freeze_lines(&cart, &prices).unwrap();

        assert_eq!(items.len(), 2);
        // 2 * 10.00 + 3 * 0.10, exact decimal arithmetic.
        assert_eq!(total, dec("20.30"));
        assert_eq!(
            total,
            items.iter().map(OrderItem::line_total).sum::<Decimal>()
        );
    }

    #[test]
    fn test_freeze_lines_stamps_current_price() {
        let a = ProductId::generate();
        let cart = vec![cart_line(a, 2)];

        let (items, total) = freeze_lines(&cart, &HashMap::from([(a, dec("10.0"))])).unwrap();
        assert_eq!(items.first().unwrap().price_at_purchase, dec("10.0"));
        assert_eq!(total, dec("20.0"));

        // A later catalog price change means a later checkout freezes a
        // different price - but the earlier snapshot is untouched.
        let (later_items, later_total) =
            freeze_lines(&cart, &HashMap::from([(a, dec("15.0"))])).unwrap();
        assert_eq!(later_items.first().unwrap().price_at_purchase, dec("15.0"));
        assert_eq!(later_total, dec("30.0"));
        assert_eq!(items.first().unwrap().price_at_purchase, dec("10.0"));
    }

    #[test]
    fn test_freeze_lines_missing_product() {
        let present = ProductId::generate();
        let missing = ProductId::generate();
        let cart = vec![cart_line(present, 1), cart_line(missing, 1)];
        let prices = HashMap::from([(present, dec("5.00"))]);

        match freeze_lines(&cart, &prices).unwrap_err() {
            CheckoutError::ProductNotFound(id) => assert_eq!(id, missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_freeze_lines_empty_cart_is_zero() {
        let (items, total) = freeze_lines(&[], &HashMap::new()).unwrap();
        assert!(items.is_empty());
        assert_eq!(total, Decimal::ZERO);
    }

    #[test]
    fn test_take_items_rejects_absent_cart() {
        assert!(matches!(take_items(None), Err(CheckoutError::EmptyCart)));
    }

    #[test]
    fn test_take_items_rejects_empty_cart() {
        let record = carts::CartRecord {
            items: Vec::new(),
            version: 3,
        };
        assert!(matches!(
            take_items(Some(record)),
            Err(CheckoutError::EmptyCart)
        ));
    }

    #[test]
    fn test_take_items_returns_the_lines() {
        let p = ProductId::generate();
        let record = carts::CartRecord {
            items: vec![cart_line(p, 2)],
            version: 1,
        };
        assert_eq!(take_items(Some(record)).unwrap(), vec![cart_line(p, 2)]);
    }

    #[test]
    fn test_failed_pricing_leaves_cart_lines_intact() {
        // The checkout pipeline is guard -> price -> freeze -> write. A
        // pricing failure happens before any write, so the lines loaded
        // from the cart are exactly what the cart still holds.
        let kept = ProductId::generate();
        let vanished = ProductId::generate();
        let record = carts::CartRecord {
            items: vec![cart_line(kept, 1), cart_line(vanished, 2)],
            version: 1,
        };

        let items = take_items(Some(record)).unwrap();
        let prices = HashMap::from([(kept, dec("5.00"))]);
        assert!(matches!(
            freeze_lines(&items, &prices),
            Err(CheckoutError::ProductNotFound(_))
        ));
        assert_eq!(items, vec![cart_line(kept, 1), cart_line(vanished, 2)]);
    }
}
