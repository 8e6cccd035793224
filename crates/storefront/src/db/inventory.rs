//! Inventory repository.
//!
//! Reservations use a conditional increment per line inside one
//! transaction, so either every line is held or none is. A paid checkout
//! never held stock, so it lowers `quantity` only and leaves every
//! shopper's hold in place.

use sqlx::{PgConnection, PgPool};

use raze_core::inventory::SeedStock;

use super::RepositoryError;
use crate::models::inventory::{InventoryItem, ReserveOutcome, StockRequest};

const COLUMNS: &str =
    "id, product_id, product_name, color, size, quantity, reserved, low_stock_threshold, updated_at";

/// Repository for `inventory`.
pub struct InventoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InventoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every row ordered by product, color, size.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<InventoryItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {COLUMNS} FROM inventory ORDER BY product_id, color, size"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Rows for one product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_product(&self, product_id: i32) -> Result<Vec<InventoryItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {COLUMNS} FROM inventory WHERE product_id = $1 ORDER BY color, size"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// One variant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        product_id: i32,
        color: &str,
        size: &str,
    ) -> Result<Option<InventoryItem>, RepositoryError> {
        let row = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {COLUMNS} FROM inventory WHERE product_id = $1 AND color = $2 AND size = $3"
        ))
        .bind(product_id)
        .bind(color)
        .bind(size)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Hold stock for every line, or for none of them.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn reserve(&self, items: &[StockRequest]) -> Result<ReserveOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut reserved = 0;

        for item in items {
            let held: Option<i32> = sqlx::query_scalar(
                "UPDATE inventory SET reserved = reserved + $4, updated_at = NOW() \
                 WHERE product_id = $1 AND color = $2 AND size = $3 \
                   AND $4 > 0 AND quantity - reserved >= $4 \
                 RETURNING id",
            )
            .bind(item.product_id)
            .bind(&item.color)
            .bind(&item.size)
            .bind(item.quantity)
            .fetch_optional(&mut *tx)
            .await?;

            if held.is_none() {
                tx.rollback().await?;
                let product_name: Option<String> = sqlx::query_scalar(
                    "SELECT product_name FROM inventory WHERE product_id = $1 LIMIT 1",
                )
                .bind(item.product_id)
                .fetch_optional(self.pool)
                .await?;

                return Ok(ReserveOutcome::Insufficient {
                    product_name: product_name
                        .unwrap_or_else(|| format!("product {}", item.product_id)),
                    color: item.color.clone(),
                    size: item.size.clone(),
                });
            }
            reserved += item.quantity;
        }

        tx.commit().await?;
        Ok(ReserveOutcome::Reserved(reserved))
    }

    /// Return held stock to sale.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn release(&self, items: &[StockRequest]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for item in items {
            sqlx::query(
                "UPDATE inventory SET reserved = GREATEST(reserved - $4, 0), updated_at = NOW() \
                 WHERE product_id = $1 AND color = $2 AND size = $3",
            )
            .bind(item.product_id)
            .bind(&item.color)
            .bind(&item.size)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Remove sold units from stock, along with any hold on them.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn commit(&self, items: &[StockRequest]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for item in items {
            sqlx::query(
                "UPDATE inventory SET quantity = GREATEST(quantity - $4, 0), \
                     reserved = GREATEST(reserved - $4, 0), updated_at = NOW() \
                 WHERE product_id = $1 AND color = $2 AND size = $3",
            )
            .bind(item.product_id)
            .bind(&item.color)
            .bind(&item.size)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Set the on-hand quantity (and optionally the threshold) of a variant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant doesn't exist.
    pub async fn update(
        &self,
        product_id: i32,
        color: &str,
        size: &str,
        quantity: i32,
        low_stock_threshold: Option<i32>,
    ) -> Result<InventoryItem, RepositoryError> {
        let row = sqlx::query_as::<_, InventoryItem>(&format!(
            "UPDATE inventory SET quantity = $4, \
                 low_stock_threshold = COALESCE($5, low_stock_threshold), updated_at = NOW() \
             WHERE product_id = $1 AND color = $2 AND size = $3 \
             RETURNING {COLUMNS}"
        ))
        .bind(product_id)
        .bind(color)
        .bind(size)
        .bind(quantity)
        .bind(low_stock_threshold)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row)
    }

    /// Insert a starting row unless the variant already exists.
    ///
    /// Returns `true` if a row was inserted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_seed(&self, seed: &SeedStock, threshold: i32) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO inventory (product_id, product_name, color, size, quantity, low_stock_threshold) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (product_id, color, size) DO NOTHING",
        )
        .bind(seed.product_id)
        .bind(seed.product_name)
        .bind(seed.color)
        .bind(seed.size)
        .bind(seed.quantity)
        .bind(threshold)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Take sold units out of on-hand stock without touching holds.
///
/// Runs on the caller's connection so a checkout can deduct stock in the
/// same transaction that creates its order.
pub(super) async fn deduct_stock(
    conn: &mut PgConnection,
    items: &[StockRequest],
) -> Result<(), RepositoryError> {
    for item in items {
        sqlx::query(
            "UPDATE inventory SET quantity = GREATEST(quantity - $4, 0), updated_at = NOW() \
             WHERE product_id = $1 AND color = $2 AND size = $3",
        )
        .bind(item.product_id)
        .bind(&item.color)
        .bind(&item.size)
        .bind(item.quantity)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
