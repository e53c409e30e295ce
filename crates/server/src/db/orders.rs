//! Order repository for database operations.
//!
//! Order rows are structurally immutable after insertion: only `status` and
//! the append-only `status_history` JSONB array ever change, and both change
//! together in a single atomic UPDATE.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow, types::Json};

use minimart_core::{Email, OrderId, OrderStatus};

use super::RepositoryError;
use crate::models::order::{Order, OrderItem, StatusEntry};

fn order_from_row(row: &PgRow) -> Result<Order, RepositoryError> {
    let email: String = row.try_get("user_email")?;
    let email = Email::parse(&email).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
    })?;

    let status: String = row.try_get("status")?;
    let status: OrderStatus = status.parse().map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid status in database: {e}"))
    })?;

    Ok(Order {
        id: row.try_get::<OrderId, _>("id")?,
        user_email: email,
        items: row.try_get::<Json<Vec<OrderItem>>, _>("items")?.0,
        total_price: row.try_get::<Decimal, _>("total_price")?,
        status,
        status_history: row.try_get::<Json<Vec<StatusEntry>>, _>("status_history")?.0,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

const ORDER_COLUMNS: &str =
    "id, user_email, items, total_price, status, status_history, created_at";

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.as_ref().map(order_from_row).transpose()
    }

    /// List all orders placed by one user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, email: &Email) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE user_email = $1
            ORDER BY created_at DESC
            ",
        ))
        .bind(email.as_str())
        .fetch_all(self.pool)
        .await?;

        rows.iter().map(order_from_row).collect()
    }

    /// List every order in the store, newest first (admin view).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.iter().map(order_from_row).collect()
    }

    /// Atomically set an order's status and append the matching history
    /// entry, returning the updated order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Order, RepositoryError> {
        let entry = StatusEntry { status, at };
        let row = sqlx::query(&format!(
            r"
            UPDATE orders
            SET status = $2, status_history = status_history || $3::jsonb
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            ",
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(Json([entry]))
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Err(RepositoryError::NotFound);
        };

        order_from_row(&row)
    }
}

/// Insert a freshly built order inside an open checkout transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_in_tx(conn: &mut PgConnection, order: &Order) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO orders (id, user_email, items, total_price, status, status_history, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ",
    )
    .bind(order.id)
    .bind(order.user_email.as_str())
    .bind(Json(&order.items))
    .bind(order.total_price)
    .bind(order.status.as_str())
    .bind(Json(&order.status_history))
    .bind(order.created_at)
    .execute(conn)
    .await?;

    Ok(())
}
