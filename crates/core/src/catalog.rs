//! Launch catalog.
//!
//! The storefront prices carts from the `products` table; these rows are
//! what the seeder writes there.

use serde::Serialize;

use crate::types::Money;

/// A product as seeded into the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedProduct {
    pub id: i32,
    pub name: &'static str,
    pub slug: &'static str,
    pub description: &'static str,
    pub price: Money,
    pub colors: &'static [&'static str],
    pub sizes: &'static [&'static str],
    pub image: &'static str,
}

/// The three launch products.
#[must_use]
pub fn seed_products() -> Vec<SeedProduct> {
    vec![
        SeedProduct {
            id: 1,
            name: "Performance T-Shirt",
            slug: "performance-t-shirt",
            description: "Lightweight training tee built for the gym floor.",
            price: Money::from_dollars(55),
            colors: &["Black", "White"],
            sizes: &["XS", "S", "M", "L"],
            image: "/images/products/performance-tee-black.webp",
        },
        SeedProduct {
            id: 2,
            name: "Performance Shorts (Men)",
            slug: "performance-shorts-men",
            description: "Four-way stretch training shorts.",
            price: Money::from_dollars(65),
            colors: &["Black"],
            sizes: &["XS", "S", "M", "L"],
            image: "/images/products/performance-shorts-men.webp",
        },
        SeedProduct {
            id: 3,
            name: "Performance Shorts (Women)",
            slug: "performance-shorts-women",
            description: "High-waisted training shorts with a secure fit.",
            price: Money::from_dollars(65),
            colors: &["Black"],
            sizes: &["XS", "S", "M", "L"],
            image: "/images/products/performance-shorts-women.webp",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::seed_stock;

    #[test]
    fn test_every_seeded_stock_row_has_a_product() {
        let products = seed_products();
        for row in seed_stock() {
            let product = products.iter().find(|p| p.id == row.product_id);
            assert!(product.is_some(), "no product {}", row.product_id);
            let product = product.into_iter().next();
            assert!(product.is_some_and(|p| p.colors.contains(&row.color)));
            assert!(product.is_some_and(|p| p.sizes.contains(&row.size)));
        }
    }

    #[test]
    fn test_prices() {
        let products = seed_products();
        assert_eq!(products.len(), 3);
        assert!(products.iter().all(|p| p.price > Money::ZERO));
    }
}
