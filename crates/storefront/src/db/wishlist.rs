//! Saved products per account.

use sqlx::PgPool;

use raze_core::{ProductId, UserId};

use super::RepositoryError;

/// Repository for `wishlist_items`.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Saved product ids, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_ids(&self, user: UserId) -> Result<Vec<ProductId>, RepositoryError> {
        let ids = sqlx::query_scalar(
            "SELECT product_id FROM wishlist_items WHERE user_id = $1 \
             ORDER BY created_at DESC, product_id",
        )
        .bind(user)
        .fetch_all(self.pool)
        .await?;

        Ok(ids)
    }

    /// Save a product. Saving it again is a no-op.
    ///
    /// Returns whether the product was newly saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn add(&self, user: UserId, product: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO wishlist_items (user_id, product_id) \
             SELECT $1, id FROM products WHERE id = $2 \
             ON CONFLICT (user_id, product_id) DO NOTHING",
        )
        .bind(user)
        .bind(product)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }
        let saved: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM wishlist_items WHERE user_id = $1 AND product_id = $2)",
        )
        .bind(user)
        .bind(product)
        .fetch_one(self.pool)
        .await?;

        if saved { Ok(false) } else { Err(RepositoryError::NotFound) }
    }

    /// Remove a saved product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if it wasn't saved.
    pub async fn remove(&self, user: UserId, product: ProductId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
                .bind(user)
                .bind(product)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
