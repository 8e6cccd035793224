//! Product catalog repository.

use sqlx::PgPool;

use raze_core::ProductId;
use raze_core::catalog::SeedProduct;

use super::RepositoryError;
use crate::models::product::Product;

const COLUMNS: &str =
    "id, name, slug, description, price, colors, sizes, image, is_active, created_at";

/// Repository for `products`.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active products in id order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, Product>(&format!(
            "SELECT {COLUMNS} FROM products WHERE is_active ORDER BY id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Active products among `ids`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_by_ids(&self, ids: &[i32]) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, Product>(&format!(
            "SELECT {COLUMNS} FROM products WHERE is_active AND id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// A product by id, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, Product>(&format!(
            "SELECT {COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Insert or refresh a seeded product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert_seed(&self, seed: &SeedProduct) -> Result<(), RepositoryError> {
        let colors: Vec<&str> = seed.colors.to_vec();
        let sizes: Vec<&str> = seed.sizes.to_vec();

        sqlx::query(
            "INSERT INTO products (id, name, slug, description, price, colors, sizes, image) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (id) DO UPDATE SET \
                 name = EXCLUDED.name, slug = EXCLUDED.slug, \
                 description = EXCLUDED.description, price = EXCLUDED.price, \
                 colors = EXCLUDED.colors, sizes = EXCLUDED.sizes, image = EXCLUDED.image",
        )
        .bind(seed.id)
        .bind(seed.name)
        .bind(seed.slug)
        .bind(seed.description)
        .bind(seed.price)
        .bind(colors)
        .bind(sizes)
        .bind(seed.image)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
