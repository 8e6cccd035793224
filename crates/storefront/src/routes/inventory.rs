//! Inventory endpoints.
//!
//! Reservations hold stock between checkout start and payment; commit
//! turns a hold into a sale. Any change drops the cached catalog.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use raze_core::inventory::{ProductStock, group_by_color, insufficient_stock_message};

use crate::db::inventory::InventoryRepository;
use crate::error::{AppError, Result};
use crate::models::inventory::{InventoryView, ReserveOutcome, StockRequest};
use crate::state::AppState;

/// Every variant with derived availability.
///
/// GET /api/inventory
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<InventoryView>>> {
    let items = InventoryRepository::new(state.pool()).list().await?;
    Ok(Json(items.into_iter().map(InventoryView::from).collect()))
}

/// Stock for one product.
#[derive(Debug, Serialize)]
pub struct ProductInventoryResponse {
    pub product_id: i32,
    pub inventory: ProductStock,
}

/// Stock for one product as color, then size.
///
/// GET /api/inventory/product/{id}
///
/// # Errors
///
/// Returns 404 if the product has no inventory.
#[instrument(skip(state))]
pub async fn product(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
) -> Result<Json<ProductInventoryResponse>> {
    let items = InventoryRepository::new(state.pool())
        .for_product(product_id)
        .await?;
    if items.is_empty() {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    let inventory = group_by_color(
        items
            .iter()
            .map(|item| (item.color.as_str(), item.size.as_str(), item.level())),
    );

    Ok(Json(ProductInventoryResponse {
        product_id,
        inventory,
    }))
}

/// Availability of one variant.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub in_stock: bool,
    pub available: i32,
    pub low_stock: bool,
}

/// Whether a variant can cover a quantity.
///
/// POST /api/inventory/check
///
/// # Errors
///
/// Returns 404 if the variant doesn't exist.
#[instrument(skip(state))]
pub async fn check(
    State(state): State<AppState>,
    Json(req): Json<StockRequest>,
) -> Result<Json<CheckResponse>> {
    let item = InventoryRepository::new(state.pool())
        .get(req.product_id, &req.color, &req.size)
        .await?
        .ok_or_else(|| AppError::NotFound("Variant not found".to_string()))?;

    let level = item.level();
    Ok(Json(CheckResponse {
        in_stock: level.can_fulfill(req.quantity),
        available: level.available(),
        low_stock: level.is_low_stock(),
    }))
}

/// Lines to reserve, release or commit.
#[derive(Debug, Deserialize)]
pub struct StockBatch {
    pub items: Vec<StockRequest>,
}

/// Reservation result.
#[derive(Debug, Serialize)]
pub struct ReserveResponse {
    pub success: bool,
    pub reserved: i32,
}

/// Hold stock for every line, or none.
///
/// POST /api/inventory/reserve
///
/// # Errors
///
/// Returns 400 naming the first variant without enough stock.
#[instrument(skip(state, req), fields(items = req.items.len()))]
pub async fn reserve(
    State(state): State<AppState>,
    Json(req): Json<StockBatch>,
) -> Result<Json<ReserveResponse>> {
    if req.items.is_empty() {
        return Err(AppError::BadRequest("No items to reserve".to_string()));
    }

    let outcome = InventoryRepository::new(state.pool())
        .reserve(&req.items)
        .await?;

    match outcome {
        ReserveOutcome::Reserved(reserved) => {
            state.catalog().invalidate();
            Ok(Json(ReserveResponse {
                success: true,
                reserved,
            }))
        }
        ReserveOutcome::Insufficient {
            product_name,
            color,
            size,
        } => {
            tracing::info!(%product_name, %color, %size, "Reservation refused");
            Err(AppError::BadRequest(insufficient_stock_message(
                &product_name,
                &color,
                &size,
            )))
        }
    }
}

/// Release held stock.
///
/// POST /api/inventory/release
///
/// # Errors
///
/// Returns 500 if the update fails.
#[instrument(skip(state, req), fields(items = req.items.len()))]
pub async fn release(
    State(state): State<AppState>,
    Json(req): Json<StockBatch>,
) -> Result<Json<serde_json::Value>> {
    InventoryRepository::new(state.pool())
        .release(&req.items)
        .await?;
    state.catalog().invalidate();
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Turn held stock into a sale.
///
/// POST /api/inventory/commit
///
/// # Errors
///
/// Returns 500 if the update fails.
#[instrument(skip(state, req), fields(items = req.items.len()))]
pub async fn commit(
    State(state): State<AppState>,
    Json(req): Json<StockBatch>,
) -> Result<Json<serde_json::Value>> {
    InventoryRepository::new(state.pool())
        .commit(&req.items)
        .await?;
    state.catalog().invalidate();
    Ok(Json(serde_json::json!({ "success": true })))
}
