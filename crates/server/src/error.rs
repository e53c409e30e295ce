//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-class errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::order::{CheckoutError, StatusError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout failed.
    #[error("checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Status transition failed.
    #[error("status error: {0}")]
    Status(#[from] StatusError),

    /// Target status is not one of the known values.
    #[error("invalid status value: {0}")]
    InvalidStatus(String),

    /// Acting identity lacks the required privilege.
    #[error("forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Repository(err) => repository_status(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials
                | AuthError::MissingToken
                | AuthError::TokenMalformed
                | AuthError::TokenExpired
                | AuthError::UnknownSubject => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                AuthError::Repository(err) => repository_status(err),
                AuthError::PasswordHash | AuthError::TokenSigning => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Cart(err) => match err {
                CartError::ItemNotFound => StatusCode::NOT_FOUND,
                CartError::InvalidQuantity => StatusCode::BAD_REQUEST,
                CartError::Repository(err) => repository_status(err),
            },
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart => StatusCode::BAD_REQUEST,
                CheckoutError::ProductNotFound(_) => StatusCode::NOT_FOUND,
                CheckoutError::Repository(err) => repository_status(err),
            },
            Self::Status(err) => match err {
                StatusError::OrderNotFound => StatusCode::NOT_FOUND,
                StatusError::Repository(err) => repository_status(err),
            },
            Self::InvalidStatus(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Client-facing message. Internal failure detail never leaks.
    fn message(&self) -> String {
        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid credentials".to_owned(),
                AuthError::UserAlreadyExists => "Email already registered".to_owned(),
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_owned(),
                AuthError::MissingToken => "Missing credentials".to_owned(),
                AuthError::TokenMalformed | AuthError::TokenExpired | AuthError::UnknownSubject => {
                    "Could not validate credentials".to_owned()
                }
                _ => "Internal server error".to_owned(),
            },
            Self::Cart(CartError::ItemNotFound) => "Item not found in cart".to_owned(),
            Self::Cart(CartError::InvalidQuantity) => {
                "Quantity must be greater than zero".to_owned()
            }
            Self::Checkout(CheckoutError::EmptyCart) => "Cart is empty".to_owned(),
            Self::Checkout(CheckoutError::ProductNotFound(id)) => {
                format!("Product {id} not found")
            }
            Self::Status(StatusError::OrderNotFound) => "Order not found".to_owned(),
            Self::InvalidStatus(value) => format!("Invalid status value: {value}"),
            Self::Forbidden => "Forbidden".to_owned(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::BadRequest(msg) => msg.clone(),
            Self::Repository(err)
            | Self::Cart(CartError::Repository(err))
            | Self::Checkout(CheckoutError::Repository(err))
            | Self::Status(StatusError::Repository(err)) => match err {
                RepositoryError::Conflict(_) => "Conflict, please retry".to_owned(),
                RepositoryError::NotFound => "Not found".to_owned(),
                _ => "Internal server error".to_owned(),
            },
        }
    }
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, self.message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use minimart_core::ProductId;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_checkout_errors_map_to_client_codes() {
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::EmptyCart)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::ProductNotFound(
                ProductId::generate()
            ))),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_product_not_found_names_the_reference() {
        let id = ProductId::generate();
        let err = AppError::Checkout(CheckoutError::ProductNotFound(id));
        assert!(err.message().contains(&id.to_string()));
    }

    #[test]
    fn test_auth_errors_do_not_distinguish_cause() {
        // Expired, malformed, and unknown-subject all read the same to the
        // client over HTTP (the WebSocket handshake uses distinct close
        // codes instead).
        let expired = AppError::Auth(AuthError::TokenExpired).message();
        let malformed = AppError::Auth(AuthError::TokenMalformed).message();
        assert_eq!(expired, malformed);
        assert_eq!(get_status(AppError::Auth(AuthError::TokenExpired)), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            get_status(AppError::Status(StatusError::OrderNotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::InvalidStatus("lost".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(AppError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(AppError::Auth(AuthError::UserAlreadyExists)),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_internal_detail_never_leaks() {
        let err = AppError::Repository(RepositoryError::DataCorruption(
            "users.email row 42 unparseable".to_owned(),
        ));
        assert_eq!(err.message(), "Internal server error");
    }
}
