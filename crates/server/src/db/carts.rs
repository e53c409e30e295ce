//! Cart repository for database operations.
//!
//! A cart is a single JSONB document per user plus a version counter. Every
//! read returns the version it saw; every write states the version it read,
//! so two interleaved read-modify-write sequences cannot silently drop one
//! mutation - the later write fails with a conflict and the caller retries.

use sqlx::{PgConnection, PgPool, Row, types::Json};

use minimart_core::Email;

use super::RepositoryError;
use crate::models::cart::CartItem;

/// A cart document as read from the store: its items and the version the
/// read observed.
#[derive(Debug, Clone)]
pub struct CartRecord {
    pub items: Vec<CartItem>,
    pub version: i64,
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user's cart document, or `None` if no cart row exists yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, email: &Email) -> Result<Option<CartRecord>, RepositoryError> {
        let row = sqlx::query("SELECT items, version FROM carts WHERE user_email = $1")
            .bind(email.as_str())
            .fetch_optional(self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(CartRecord {
            items: row.try_get::<Json<Vec<CartItem>>, _>("items")?.0,
            version: row.try_get("version")?,
        }))
    }

    /// Write a cart document, guarded by the version the caller read.
    ///
    /// Pass `expected_version = None` when no cart row existed at read time;
    /// the write then inserts a fresh row and conflicts if someone else
    /// created one in the meantime.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the version moved underneath
    /// the caller (retry the whole read-modify-write sequence).
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn save(
        &self,
        email: &Email,
        items: &[CartItem],
        expected_version: Option<i64>,
    ) -> Result<(), RepositoryError> {
        let result = match expected_version {
            Some(version) => {
                sqlx::query(
                    r"
                    UPDATE carts
                    SET items = $2, version = version + 1
                    WHERE user_email = $1 AND version = $3
                    ",
                )
                .bind(email.as_str())
                .bind(Json(items))
                .bind(version)
                .execute(self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r"
                    INSERT INTO carts (user_email, items)
                    VALUES ($1, $2)
                    ON CONFLICT (user_email) DO NOTHING
                    ",
                )
                .bind(email.as_str())
                .bind(Json(items))
                .execute(self.pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(
                "cart modified concurrently".to_owned(),
            ));
        }

        Ok(())
    }

    /// Empty a user's cart unconditionally (the cart row survives).
    ///
    /// A no-op if the user has no cart row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, email: &Email) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE carts
            SET items = '[]'::jsonb, version = version + 1
            WHERE user_email = $1
            ",
        )
        .bind(email.as_str())
        .execute(self.pool)
        .await?;

        Ok(())
    }
}

/// Read a cart row inside an open transaction, taking a row lock.
///
/// Checkout uses this so that concurrent cart mutations and concurrent
/// checkouts for the same user serialize against each other.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_in_tx(
    conn: &mut PgConnection,
    email: &Email,
) -> Result<Option<CartRecord>, RepositoryError> {
    let row = sqlx::query("SELECT items, version FROM carts WHERE user_email = $1 FOR UPDATE")
        .bind(email.as_str())
        .fetch_optional(conn)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(Some(CartRecord {
        items: row.try_get::<Json<Vec<CartItem>>, _>("items")?.0,
        version: row.try_get("version")?,
    }))
}

/// Empty a cart inside an open transaction (the row lock is already held).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn clear_in_tx(conn: &mut PgConnection, email: &Email) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE carts
        SET items = '[]'::jsonb, version = version + 1
        WHERE user_email = $1
        ",
    )
    .bind(email.as_str())
    .execute(conn)
    .await?;

    Ok(())
}
