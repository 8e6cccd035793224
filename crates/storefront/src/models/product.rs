//! Catalog types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use raze_core::cart::ListedProduct;
use raze_core::inventory::ProductStock;
use raze_core::{Money, ProductId};

/// A catalog product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Money,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Product> for ListedProduct {
    fn from(product: Product) -> Self {
        Self {
            name: product.name,
            price: product.price,
            colors: product.colors,
            sizes: product.sizes,
            image: product.image,
        }
    }
}

/// A product with its per-variant stock.
#[derive(Debug, Clone, Serialize)]
pub struct ProductWithStock {
    #[serde(flatten)]
    pub product: Product,
    pub stock: ProductStock,
    pub in_stock: bool,
}

impl ProductWithStock {
    #[must_use]
    pub fn new(product: Product, stock: ProductStock) -> Self {
        let in_stock = stock
            .values()
            .flat_map(|sizes| sizes.values())
            .any(|size| size.available > 0);
        Self {
            product,
            stock,
            in_stock,
        }
    }
}
