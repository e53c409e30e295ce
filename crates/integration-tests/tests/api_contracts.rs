//! Contract tests for the API surface: error-to-status-code mapping,
//! token handling, and request/response wire shapes.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use secrecy::SecretString;

use minimart_core::{OrderStatus, ProductId};
use minimart_integration_tests::fixtures::email;
use minimart_server::error::AppError;
use minimart_server::routes::auth::TokenResponse;
use minimart_server::services::auth::{AuthError, JwtKeys};
use minimart_server::services::cart::CartError;
use minimart_server::services::order::{CheckoutError, StatusError};

fn status_of(err: AppError) -> StatusCode {
    err.into_response().status()
}

// =============================================================================
// Status Code Mapping
// =============================================================================

#[test]
fn test_checkout_failure_codes() {
    assert_eq!(
        status_of(AppError::Checkout(CheckoutError::EmptyCart)),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        status_of(AppError::Checkout(CheckoutError::ProductNotFound(
            ProductId::generate()
        ))),
        StatusCode::NOT_FOUND
    );
}

#[test]
fn test_order_failure_codes() {
    assert_eq!(
        status_of(AppError::Status(StatusError::OrderNotFound)),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        status_of(AppError::InvalidStatus("misplaced".to_owned())),
        StatusCode::BAD_REQUEST
    );
}

#[test]
fn test_cart_failure_codes() {
    assert_eq!(
        status_of(AppError::Cart(CartError::ItemNotFound)),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        status_of(AppError::Cart(CartError::InvalidQuantity)),
        StatusCode::BAD_REQUEST
    );
}

#[test]
fn test_auth_failure_codes() {
    for err in [
        AuthError::InvalidCredentials,
        AuthError::MissingToken,
        AuthError::TokenMalformed,
        AuthError::TokenExpired,
        AuthError::UnknownSubject,
    ] {
        assert_eq!(status_of(AppError::Auth(err)), StatusCode::UNAUTHORIZED);
    }

    assert_eq!(
        status_of(AppError::Auth(AuthError::UserAlreadyExists)),
        StatusCode::CONFLICT
    );
    assert_eq!(status_of(AppError::Forbidden), StatusCode::FORBIDDEN);
}

// =============================================================================
// Tokens
// =============================================================================

fn test_keys() -> JwtKeys {
    JwtKeys::new(
        &SecretString::from("integration-signing-key-0123456789abcdef"),
        Duration::from_secs(3600),
    )
}

#[test]
fn test_issued_token_round_trips_to_subject() {
    let keys = test_keys();
    let shopper = email("shopper@example.com");

    let token = keys.issue(&shopper).unwrap();
    assert_eq!(keys.verify(&token).unwrap(), shopper);
}

#[test]
fn test_foreign_token_rejected() {
    let shopper = email("shopper@example.com");
    let token = test_keys().issue(&shopper).unwrap();

    let other = JwtKeys::new(
        &SecretString::from("a-completely-unrelated-signing-key!!"),
        Duration::from_secs(3600),
    );
    assert!(matches!(
        other.verify(&token),
        Err(AuthError::TokenMalformed)
    ));
}

#[test]
fn test_token_response_wire_shape() {
    let body = TokenResponse {
        access_token: "abc.def.ghi".to_owned(),
        token_type: "bearer",
    };

    let value = serde_json::to_value(&body).unwrap();
    assert_eq!(value["access_token"], "abc.def.ghi");
    assert_eq!(value["token_type"], "bearer");
}

// =============================================================================
// Status Values
// =============================================================================

#[test]
fn test_known_status_values_parse() {
    for (text, expected) in [
        ("pending", OrderStatus::Pending),
        ("shipped", OrderStatus::Shipped),
        ("delivered", OrderStatus::Delivered),
        ("cancelled", OrderStatus::Cancelled),
    ] {
        assert_eq!(text.parse::<OrderStatus>().unwrap(), expected);
    }
}

#[test]
fn test_unknown_status_values_rejected() {
    assert!("misplaced".parse::<OrderStatus>().is_err());
    assert!("SHIPPED".parse::<OrderStatus>().is_err());
    assert!(String::new().parse::<OrderStatus>().is_err());
}
