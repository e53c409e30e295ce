//! Product repository for database operations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};

use minimart_core::ProductId;

use super::RepositoryError;
use crate::models::product::{NewProduct, Product, ProductPatch};

fn product_from_row(row: &PgRow) -> Result<Product, RepositoryError> {
    Ok(Product {
        id: row.try_get::<ProductId, _>("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get::<Decimal, _>("price")?,
        category: row.try_get("category")?,
        in_stock: row.try_get("in_stock")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

const PRODUCT_COLUMNS: &str = "id, name, description, price, category, in_stock, created_at";

/// Repository for catalog database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new catalog product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query(&format!(
            r"
            INSERT INTO products (id, name, description, price, category, in_stock)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            ",
        ))
        .bind(ProductId::generate())
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price)
        .bind(&new.category)
        .bind(new.in_stock)
        .fetch_one(self.pool)
        .await?;

        product_from_row(&row)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.as_ref().map(product_from_row).transpose()
    }

    /// List products, newest first, with simple page/limit pagination.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, page: u32, limit: u32) -> Result<Vec<Product>, RepositoryError> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);

        let rows = sqlx::query(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            ",
        ))
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    /// List the distinct non-empty categories in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query(
            r"
            SELECT DISTINCT category
            FROM products
            WHERE category IS NOT NULL AND category <> ''
            ORDER BY category
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("category").map_err(Into::into))
            .collect()
    }

    /// Apply a patch: only non-NULL arguments overwrite the stored values.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query(&format!(
            r"
            UPDATE products
            SET name        = COALESCE($2, name),
                description = COALESCE($3, description),
                price       = COALESCE($4, price),
                category    = COALESCE($5, category),
                in_stock    = COALESCE($6, in_stock)
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            ",
        ))
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(patch.price)
        .bind(&patch.category)
        .bind(patch.in_stock)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Err(RepositoryError::NotFound);
        };

        product_from_row(&row)
    }

    /// Delete a product.
    ///
    /// Returns `true` if a row was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Resolve a product's current price inside an open transaction.
///
/// Used by checkout so that price resolution and order insertion observe a
/// consistent snapshot.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn price_in_tx(
    conn: &mut PgConnection,
    id: ProductId,
) -> Result<Option<Decimal>, RepositoryError> {
    let row = sqlx::query("SELECT price FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.map(|r| r.try_get::<Decimal, _>("price").map_err(Into::into))
        .transpose()
}
