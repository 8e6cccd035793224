//! Inventory types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use raze_core::InventoryId;
use raze_core::cart::CartLine;
use raze_core::inventory::StockLevel;

/// Stock for one (product, color, size).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InventoryItem {
    pub id: InventoryId,
    pub product_id: i32,
    pub product_name: String,
    pub color: String,
    pub size: String,
    pub quantity: i32,
    pub reserved: i32,
    pub low_stock_threshold: i32,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    #[must_use]
    pub const fn level(&self) -> StockLevel {
        StockLevel {
            quantity: self.quantity,
            reserved: self.reserved,
            low_stock_threshold: self.low_stock_threshold,
        }
    }
}

/// An inventory row with derived availability, as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryView {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub available: i32,
    pub is_low_stock: bool,
    pub is_out_of_stock: bool,
}

impl From<InventoryItem> for InventoryView {
    fn from(item: InventoryItem) -> Self {
        let level = item.level();
        Self {
            available: level.available(),
            is_low_stock: level.is_low_stock(),
            is_out_of_stock: level.is_out_of_stock(),
            item,
        }
    }
}

/// Units of one variant requested by a cart or checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRequest {
    pub product_id: i32,
    pub color: String,
    pub size: String,
    pub quantity: i32,
}

impl From<&CartLine> for StockRequest {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            color: line.color.clone(),
            size: line.size.clone(),
            quantity: i32::try_from(line.quantity).unwrap_or(i32::MAX),
        }
    }
}

/// Result of a reservation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Every line was reserved; total units held.
    Reserved(i32),
    /// A line could not be satisfied; nothing was held.
    Insufficient {
        product_name: String,
        color: String,
        size: String,
    },
}
