//! Product catalog with stock, cached briefly.
//!
//! Stock changes on every reservation, so entries live for a minute and are
//! dropped whenever this process changes inventory.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, instrument};

use raze_core::ProductId;
use raze_core::inventory::group_by_color;

use crate::db::RepositoryError;
use crate::db::inventory::InventoryRepository;
use crate::db::products::ProductRepository;
use crate::models::inventory::InventoryItem;
use crate::models::product::{Product, ProductWithStock};

/// Cache key.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CatalogKey {
    All,
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CatalogValue {
    All(Arc<Vec<ProductWithStock>>),
    Product(Arc<ProductWithStock>),
}

/// Catalog reads backed by the database.
#[derive(Clone)]
pub struct CatalogService {
    cache: Cache<CatalogKey, CatalogValue>,
}

impl Default for CatalogService {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogService {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(256)
            .time_to_live(Duration::from_secs(60))
            .build();
        Self { cache }
    }

    /// All active products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self, pool))]
    pub async fn list(&self, pool: &PgPool) -> Result<Arc<Vec<ProductWithStock>>, RepositoryError> {
        if let Some(CatalogValue::All(products)) = self.cache.get(&CatalogKey::All).await {
            debug!("Cache hit for catalog");
            return Ok(products);
        }

        let products = ProductRepository::new(pool).list_active().await?;
        let inventory = InventoryRepository::new(pool).list().await?;

        let listed: Vec<ProductWithStock> = products
            .into_iter()
            .map(|product| with_stock(product, &inventory))
            .collect();
        let listed = Arc::new(listed);

        self.cache
            .insert(CatalogKey::All, CatalogValue::All(Arc::clone(&listed)))
            .await;

        Ok(listed)
    }

    /// One product, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self, pool))]
    pub async fn get(
        &self,
        pool: &PgPool,
        id: ProductId,
    ) -> Result<Option<Arc<ProductWithStock>>, RepositoryError> {
        let key = CatalogKey::Product(id);
        if let Some(CatalogValue::Product(product)) = self.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(Some(product));
        }

        let Some(product) = ProductRepository::new(pool).get(id).await? else {
            return Ok(None);
        };
        let inventory = InventoryRepository::new(pool)
            .for_product(id.as_i32())
            .await?;

        let product = Arc::new(with_stock(product, &inventory));
        self.cache
            .insert(key, CatalogValue::Product(Arc::clone(&product)))
            .await;

        Ok(Some(product))
    }

    /// Drop cached stock after inventory changes.
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }
}

fn with_stock(product: Product, inventory: &[InventoryItem]) -> ProductWithStock {
    let pid = product.id.as_i32();
    let stock = group_by_color(
        inventory
            .iter()
            .filter(|item| item.product_id == pid)
            .map(|item| (item.color.as_str(), item.size.as_str(), item.level())),
    );
    ProductWithStock::new(product, stock)
}
