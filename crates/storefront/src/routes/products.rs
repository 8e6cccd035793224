//! Product catalog route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use raze_core::ProductId;

use crate::error::{AppError, Result};
use crate::models::product::ProductWithStock;
use crate::state::AppState;

/// Active products with stock.
///
/// GET /api/products
///
/// # Errors
///
/// Returns 500 if the catalog cannot be loaded.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<ProductWithStock>>> {
    let products = state.catalog().list(state.pool()).await?;
    Ok(Json(products.as_ref().clone()))
}

/// One product with stock.
///
/// GET /api/products/{id}
///
/// # Errors
///
/// Returns 404 if the product doesn't exist.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProductWithStock>> {
    let product = state
        .catalog()
        .get(state.pool(), ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(product.as_ref().clone()))
}
