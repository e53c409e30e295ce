//! Authentication error types.

use minimart_core::EmailError;

use crate::db::RepositoryError;

/// Errors from authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Wrong email/password combination. Deliberately does not say which.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Signup attempted with an email that is already registered.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password fails the strength requirements.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// Email failed validation.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// No bearer credential was presented.
    #[error("missing credential")]
    MissingToken,

    /// The bearer token's signature or structure is invalid.
    #[error("malformed credential")]
    TokenMalformed,

    /// The bearer token has expired.
    #[error("expired credential")]
    TokenExpired,

    /// The token verified but its subject matches no user record.
    #[error("unknown subject")]
    UnknownSubject,

    /// Password hashing failed.
    #[error("password hashing failed")]
    PasswordHash,

    /// Token signing failed.
    #[error("token signing failed")]
    TokenSigning,

    /// Underlying repository error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
