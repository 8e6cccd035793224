//! Stock levels.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use raze_storefront::db::RepositoryError;
use raze_storefront::db::inventory::InventoryRepository;
use raze_storefront::models::inventory::{InventoryItem, InventoryView};

use super::record_activity;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdminAuth, RequireWriteAccess};
use crate::models::Action;
use crate::state::AppState;

/// How many low-stock variants the stats include.
const LOW_STOCK_LIST_SIZE: usize = 10;

/// Build the inventory router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/inventory", get(index).put(update))
        .route("/inventory/stats", get(stats))
        .route("/inventory/bulk", post(bulk_update))
}

/// New stock for one variant.
#[derive(Debug, Clone, Deserialize)]
pub struct StockUpdate {
    pub product_id: i32,
    pub color: String,
    pub size: String,
    pub quantity: i32,
    pub low_stock_threshold: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct BulkUpdate {
    pub items: Vec<StockUpdate>,
}

#[derive(Debug, Serialize)]
pub struct InventoryStats {
    pub total_items: i64,
    pub total_reserved: i64,
    pub total_available: i64,
    pub low_stock_count: usize,
    pub out_of_stock_count: usize,
    /// First few variants at or below their threshold.
    pub low_stock_items: Vec<InventoryView>,
    pub out_of_stock_items: Vec<InventoryView>,
}

impl InventoryStats {
    /// Roll up every variant.
    #[must_use]
    pub fn from_items(items: Vec<InventoryItem>) -> Self {
        let total_items: i64 = items.iter().map(|i| i64::from(i.quantity)).sum();
        let total_reserved: i64 = items.iter().map(|i| i64::from(i.reserved)).sum();

        let (low, _): (Vec<InventoryView>, Vec<InventoryView>) = items
            .into_iter()
            .map(InventoryView::from)
            .partition(|view| view.is_low_stock);
        let out_of_stock_items: Vec<InventoryView> =
            low.iter().filter(|view| view.is_out_of_stock).cloned().collect();

        Self {
            total_items,
            total_reserved,
            total_available: total_items - total_reserved,
            low_stock_count: low.len(),
            out_of_stock_count: out_of_stock_items.len(),
            low_stock_items: low.into_iter().take(LOW_STOCK_LIST_SIZE).collect(),
            out_of_stock_items,
        }
    }
}

fn validate(update: &StockUpdate) -> Result<()> {
    if update.quantity < 0 {
        return Err(AppError::BadRequest("Quantity cannot be negative".to_string()));
    }
    if update.low_stock_threshold.is_some_and(|t| t < 0) {
        return Err(AppError::BadRequest(
            "Low stock threshold cannot be negative".to_string(),
        ));
    }
    Ok(())
}

/// Every variant with availability.
///
/// GET /api/admin/inventory
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state, _admin))]
async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<serde_json::Value>> {
    let items: Vec<InventoryView> = InventoryRepository::new(state.shop_pool())
        .list()
        .await?
        .into_iter()
        .map(InventoryView::from)
        .collect();

    Ok(Json(json!({ "inventory": items })))
}

/// Totals and low-stock lists.
///
/// GET /api/admin/inventory/stats
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state, _admin))]
async fn stats(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<InventoryStats>> {
    let items = InventoryRepository::new(state.shop_pool()).list().await?;
    Ok(Json(InventoryStats::from_items(items)))
}

/// Set stock for one variant.
///
/// PUT /api/admin/inventory
///
/// # Errors
///
/// Returns 400 for negative numbers, 404 if the variant doesn't exist.
#[instrument(skip(state, admin))]
async fn update(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Json(req): Json<StockUpdate>,
) -> Result<Json<InventoryView>> {
    validate(&req)?;

    let item = InventoryRepository::new(state.shop_pool())
        .update(
            req.product_id,
            &req.color,
            &req.size,
            req.quantity,
            req.low_stock_threshold,
        )
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Inventory item not found".to_string()),
            other => other.into(),
        })?;

    record_activity(
        &state,
        &admin,
        Action::InventoryUpdated,
        Some(&format!("{}/{}/{}", req.product_id, req.color, req.size)),
        json!({ "quantity": req.quantity, "low_stock_threshold": req.low_stock_threshold }),
    )
    .await;

    Ok(Json(InventoryView::from(item)))
}

/// Set stock for many variants; unknown variants are skipped.
///
/// POST /api/admin/inventory/bulk
///
/// # Errors
///
/// Returns 400 if any update has negative numbers.
#[instrument(skip(state, admin, req), fields(count = req.items.len()))]
async fn bulk_update(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Json(req): Json<BulkUpdate>,
) -> Result<Json<serde_json::Value>> {
    for item in &req.items {
        validate(item)?;
    }

    let repo = InventoryRepository::new(state.shop_pool());
    let mut updated = 0_usize;
    for item in &req.items {
        match repo
            .update(
                item.product_id,
                &item.color,
                &item.size,
                item.quantity,
                item.low_stock_threshold,
            )
            .await
        {
            Ok(_) => updated += 1,
            Err(RepositoryError::NotFound) => {
                tracing::debug!(product_id = item.product_id, "Skipping unknown variant");
            }
            Err(e) => return Err(e.into()),
        }
    }

    record_activity(
        &state,
        &admin,
        Action::InventoryBulkUpdated,
        None,
        json!({ "requested": req.items.len(), "updated": updated }),
    )
    .await;

    Ok(Json(json!({ "success": true, "updated": updated })))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use raze_core::InventoryId;

    use super::*;

    fn item(id: i32, quantity: i32, reserved: i32) -> InventoryItem {
        InventoryItem {
            id: InventoryId::new(id),
            product_id: 1,
            product_name: "Competition Leo".to_string(),
            color: "Black".to_string(),
            size: format!("S{id}"),
            quantity,
            reserved,
            low_stock_threshold: 5,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_stats_totals() {
        let stats = InventoryStats::from_items(vec![item(1, 20, 2), item(2, 4, 0), item(3, 3, 3)]);
        assert_eq!(stats.total_items, 27);
        assert_eq!(stats.total_reserved, 5);
        assert_eq!(stats.total_available, 22);
        assert_eq!(stats.low_stock_count, 2);
        assert_eq!(stats.out_of_stock_count, 1);
        assert_eq!(stats.out_of_stock_items[0].item.size, "S3");
    }

    #[test]
    fn test_low_stock_list_is_capped() {
        let items = (1..=15).map(|id| item(id, 1, 0)).collect();
        let stats = InventoryStats::from_items(items);
        assert_eq!(stats.low_stock_count, 15);
        assert_eq!(stats.low_stock_items.len(), LOW_STOCK_LIST_SIZE);
    }

    #[test]
    fn test_validate_rejects_negative() {
        let update = StockUpdate {
            product_id: 1,
            color: "Black".to_string(),
            size: "M".to_string(),
            quantity: -1,
            low_stock_threshold: None,
        };
        assert!(validate(&update).is_err());
    }
}
