//! Scenario tests for the order lifecycle: checkout pricing and the
//! append-only status history.
//!
//! These run against the pricing and history logic directly; the
//! database-bound plumbing around them is exercised by the repository
//! layer against a live Postgres.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;

use minimart_core::{OrderStatus, ProductId};
use minimart_integration_tests::fixtures::{cart_line, dec, email, pending_order};
use minimart_server::db::carts::CartRecord;
use minimart_server::models::order::{OrderItem, StatusEntry};
use minimart_server::services::order::{CheckoutError, freeze_lines, take_items};

// =============================================================================
// Checkout Pricing
// =============================================================================

#[test]
fn test_checkout_freezes_catalog_prices() {
    let coffee = ProductId::generate();
    let beans = ProductId::generate();
    let cart = vec![cart_line(coffee, 1), cart_line(beans, 2)];

    let today = HashMap::from([(coffee, dec("4.50")), (beans, dec("12.00"))]);
    let (items, total) = freeze_lines(&cart, &today).unwrap();

    assert_eq!(total, dec("28.50"));

    // The shop raises prices tomorrow. The frozen order is unaffected.
    let tomorrow = HashMap::from([(coffee, dec("5.50")), (beans, dec("14.00"))]);
    let (later_items, later_total) = freeze_lines(&cart, &tomorrow).unwrap();

    assert_eq!(later_total, dec("33.50"));
    assert_eq!(items[0].price_at_purchase, dec("4.50"));
    assert_ne!(items[0].price_at_purchase, later_items[0].price_at_purchase);
}

#[test]
fn test_total_is_exact_sum_of_line_totals() {
    let a = ProductId::generate();
    let b = ProductId::generate();
    let c = ProductId::generate();
    let cart = vec![cart_line(a, 3), cart_line(b, 1), cart_line(c, 7)];
    let prices = HashMap::from([(a, dec("0.10")), (b, dec("99.99")), (c, dec("1.01"))]);

    let (items, total) = freeze_lines(&cart, &prices).unwrap();

    let expected: Decimal = items.iter().map(OrderItem::line_total).sum();
    assert_eq!(total, expected);
    assert_eq!(total, dec("107.36"));
}

#[test]
fn test_checkout_rejects_a_shopper_with_nothing_to_buy() {
    // Never visited the cart: no row at all.
    assert!(matches!(take_items(None), Err(CheckoutError::EmptyCart)));

    // Added and then removed everything: a row with no lines.
    let emptied = CartRecord {
        items: Vec::new(),
        version: 4,
    };
    assert!(matches!(
        take_items(Some(emptied)),
        Err(CheckoutError::EmptyCart)
    ));
}

#[test]
fn test_cart_lines_survive_a_failed_checkout() {
    let kept = ProductId::generate();
    let vanished = ProductId::generate();
    let record = CartRecord {
        items: vec![cart_line(kept, 1), cart_line(vanished, 2)],
        version: 1,
    };

    // Pricing fails after the cart is loaded but before anything is
    // written or cleared, so the loaded lines are untouched.
    let items = take_items(Some(record)).unwrap();
    let prices = HashMap::from([(kept, dec("5.00"))]);
    assert!(freeze_lines(&items, &prices).is_err());
    assert_eq!(items, vec![cart_line(kept, 1), cart_line(vanished, 2)]);
}

#[test]
fn test_vanished_product_rejects_whole_checkout() {
    let kept = ProductId::generate();
    let vanished = ProductId::generate();
    let cart = vec![cart_line(kept, 1), cart_line(vanished, 1)];
    let prices = HashMap::from([(kept, dec("5.00"))]);

    let err = freeze_lines(&cart, &prices).unwrap_err();
    match err {
        CheckoutError::ProductNotFound(id) => assert_eq!(id, vanished),
        other => panic!("expected ProductNotFound, got {other}"),
    }
}

// =============================================================================
// Status History
// =============================================================================

#[test]
fn test_new_order_starts_pending_with_one_history_entry() {
    let owner = email("shopper@example.com");
    let order = pending_order(&owner, Vec::new(), Decimal::ZERO);

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.status_history.len(), 1);
    assert_eq!(order.status_history[0].status, OrderStatus::Pending);
}

#[test]
fn test_each_transition_appends_exactly_one_entry() {
    let owner = email("shopper@example.com");
    let mut order = pending_order(&owner, Vec::new(), Decimal::ZERO);
    let original_first = order.status_history[0];

    for (i, status) in [OrderStatus::Shipped, OrderStatus::Delivered]
        .into_iter()
        .enumerate()
    {
        let before = order.status_history.len();
        order.status = status;
        order.status_history.push(StatusEntry {
            status,
            at: Utc::now(),
        });

        assert_eq!(order.status_history.len(), before + 1);
        assert_eq!(order.status_history.len(), i + 2);
        // Prior entries are untouched.
        assert_eq!(order.status_history[0], original_first);
    }

    assert_eq!(
        order
            .status_history
            .iter()
            .map(|e| e.status)
            .collect::<Vec<_>>(),
        vec![
            OrderStatus::Pending,
            OrderStatus::Shipped,
            OrderStatus::Delivered
        ]
    );
}

#[test]
fn test_order_wire_shape() {
    let owner = email("shopper@example.com");
    let item = OrderItem {
        product_id: ProductId::generate(),
        quantity: 2,
        price_at_purchase: dec("4.50"),
    };
    let order = pending_order(&owner, vec![item], dec("9.00"));

    let value = serde_json::to_value(&order).unwrap();
    assert_eq!(value["user_email"], "shopper@example.com");
    assert_eq!(value["status"], "pending");
    // Money travels as strings, never floats.
    assert_eq!(value["total_price"], "9.00");
    assert_eq!(value["items"][0]["price_at_purchase"], "4.50");
    assert_eq!(value["status_history"][0]["status"], "pending");
}
