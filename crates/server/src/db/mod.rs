//! Database operations for the minimart backend.
//!
//! # Tables
//!
//! - `users` - Accounts and password hashes
//! - `products` - Catalog entries
//! - `carts` - One JSONB item document per user, with an OCC version column
//! - `orders` - Immutable order documents plus mutable status fields
//!
//! Queries use the runtime sqlx API (no compile-time macro verification) so
//! the crate builds without a live database. Repositories borrow the shared
//! [`PgPool`]; the handful of operations that must share a transaction take
//! a `&mut PgConnection` instead.
//!
//! # Migrations
//!
//! Migrations live in `crates/server/migrations/` and run on startup via
//! `sqlx::migrate!`.

pub mod carts;
pub mod orders;
pub mod products;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Errors from repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email) or a lost optimistic
    /// concurrency race (cart version mismatch).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run pending migrations against the given pool.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
