//! Stock availability.
//!
//! Stock is tracked per (product, color, size). `reserved` counts units held
//! by open checkouts; they are still on the shelf but not for sale.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default low-stock threshold for new inventory rows.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

/// Quantities for one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub quantity: i32,
    pub reserved: i32,
    pub low_stock_threshold: i32,
}

impl StockLevel {
    /// Units that can still be sold. Never negative.
    #[must_use]
    pub fn available(&self) -> i32 {
        (self.quantity - self.reserved).max(0)
    }

    /// At or below the threshold (includes sold out).
    #[must_use]
    pub fn is_low_stock(&self) -> bool {
        self.quantity - self.reserved <= self.low_stock_threshold
    }

    /// Nothing left to sell.
    #[must_use]
    pub fn is_out_of_stock(&self) -> bool {
        self.quantity - self.reserved <= 0
    }

    /// Whether `requested` units can be sold.
    #[must_use]
    pub fn can_fulfill(&self, requested: i32) -> bool {
        requested > 0 && self.available() >= requested
    }
}

/// Identifies one sellable variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantKey {
    pub product_id: i32,
    pub color: String,
    pub size: String,
}

/// Message shown when a reservation cannot be satisfied.
#[must_use]
pub fn insufficient_stock_message(product_name: &str, color: &str, size: &str) -> String {
    format!("Insufficient stock for {product_name} ({color}, {size})")
}

/// Per-size summary inside [`ProductStock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeStock {
    pub total: i32,
    pub available: i32,
    pub low_stock: bool,
}

/// Stock for one product grouped as color → size.
pub type ProductStock = BTreeMap<String, BTreeMap<String, SizeStock>>;

/// Group variant rows into the nested per-product view.
#[must_use]
pub fn group_by_color<'a>(
    rows: impl IntoIterator<Item = (&'a str, &'a str, StockLevel)>,
) -> ProductStock {
    let mut grouped = ProductStock::new();
    for (color, size, level) in rows {
        grouped.entry(color.to_string()).or_default().insert(
            size.to_string(),
            SizeStock {
                total: level.quantity,
                available: level.available(),
                low_stock: level.is_low_stock(),
            },
        );
    }
    grouped
}

/// A starting inventory row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedStock {
    pub product_id: i32,
    pub product_name: &'static str,
    pub color: &'static str,
    pub size: &'static str,
    pub quantity: i32,
}

const SIZES: [&str; 4] = ["XS", "S", "M", "L"];

/// Starting stock for the launch catalog.
#[must_use]
pub fn seed_stock() -> Vec<SeedStock> {
    let tee_quantities = [15, 20, 25, 20];
    let mut rows = Vec::new();

    for color in ["Black", "White"] {
        for (size, quantity) in SIZES.iter().zip(tee_quantities) {
            rows.push(SeedStock {
                product_id: 1,
                product_name: "Performance T-Shirt",
                color,
                size,
                quantity,
            });
        }
    }

    for (product_id, product_name) in [
        (2, "Performance Shorts (Men)"),
        (3, "Performance Shorts (Women)"),
    ] {
        for size in SIZES {
            rows.push(SeedStock {
                product_id,
                product_name,
                color: "Black",
                size,
                quantity: 0,
            });
        }
    }

    rows
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const fn level(quantity: i32, reserved: i32) -> StockLevel {
        StockLevel {
            quantity,
            reserved,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }

    #[test]
    fn test_available_never_negative() {
        assert_eq!(level(10, 3).available(), 7);
        assert_eq!(level(2, 5).available(), 0);
    }

    #[test]
    fn test_low_and_out_of_stock() {
        assert!(!level(20, 0).is_low_stock());
        assert!(level(8, 3).is_low_stock());
        assert!(level(3, 3).is_low_stock());
        assert!(level(3, 3).is_out_of_stock());
        assert!(!level(4, 3).is_out_of_stock());
    }

    #[test]
    fn test_can_fulfill() {
        assert!(level(10, 8).can_fulfill(2));
        assert!(!level(10, 8).can_fulfill(3));
        assert!(!level(10, 0).can_fulfill(0));
    }

    #[test]
    fn test_group_by_color() {
        let grouped = group_by_color([
            ("Black", "M", level(10, 2)),
            ("Black", "L", level(4, 0)),
            ("White", "M", level(0, 0)),
        ]);
        let black = grouped.get("Black").unwrap();
        assert_eq!(black.get("M").unwrap().available, 8);
        assert!(black.get("L").unwrap().low_stock);
        assert_eq!(grouped.get("White").unwrap().get("M").unwrap().available, 0);
    }

    #[test]
    fn test_seed_stock() {
        let rows = seed_stock();
        assert_eq!(rows.len(), 16);
        let tee_total: i32 = rows
            .iter()
            .filter(|r| r.product_id == 1)
            .map(|r| r.quantity)
            .sum();
        assert_eq!(tee_total, 160);
        assert!(rows.iter().filter(|r| r.product_id != 1).all(|r| r.quantity == 0));
    }

    #[test]
    fn test_insufficient_message() {
        assert_eq!(
            insufficient_stock_message("Performance T-Shirt", "Black", "M"),
            "Insufficient stock for Performance T-Shirt (Black, M)"
        );
    }
}
