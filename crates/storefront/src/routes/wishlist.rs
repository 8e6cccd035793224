//! Saved products for signed-in shoppers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use raze_core::ProductId;

use crate::db::wishlist::WishlistRepository;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::product::ProductWithStock;
use crate::state::AppState;

/// Saved products that are still in the catalog.
#[derive(Debug, Serialize)]
pub struct WishlistResponse {
    pub items: Vec<ProductWithStock>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub product_id: ProductId,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub success: bool,
    pub added: bool,
}

/// The shopper's saved products, most recent first.
///
/// GET /api/wishlist
///
/// # Errors
///
/// Returns 401 without a session.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<WishlistResponse>> {
    let ids = WishlistRepository::new(state.pool())
        .product_ids(user.id)
        .await?;
    let catalog = state.catalog().list(state.pool()).await?;

    let items: Vec<ProductWithStock> = ids
        .iter()
        .filter_map(|id| catalog.iter().find(|p| p.product.id == *id).cloned())
        .collect();

    Ok(Json(WishlistResponse {
        count: items.len(),
        items,
    }))
}

/// Save a product.
///
/// POST /api/wishlist
///
/// # Errors
///
/// Returns 401 without a session, 404 if the product doesn't exist.
#[instrument(skip(state, user, req), fields(user_id = %user.id, product_id = %req.product_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(req): Json<SaveRequest>,
) -> Result<Json<SaveResponse>> {
    let added = WishlistRepository::new(state.pool())
        .add(user.id, req.product_id)
        .await?;

    Ok(Json(SaveResponse {
        success: true,
        added,
    }))
}

/// Forget a saved product.
///
/// DELETE /api/wishlist/{product_id}
///
/// # Errors
///
/// Returns 401 without a session, 404 if it wasn't saved.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<serde_json::Value>> {
    WishlistRepository::new(state.pool())
        .remove(user.id, product_id)
        .await?;

    Ok(Json(serde_json::json!({ "success": true })))
}
