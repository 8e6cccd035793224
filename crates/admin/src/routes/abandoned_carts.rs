//! Abandoned carts and reminder runs.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use raze_core::abandoned_cart::ProcessSummary;
use raze_storefront::db::abandoned_carts::AbandonedCartRepository;
use raze_storefront::models::abandoned_cart::AbandonedCart;
use raze_storefront::services::abandoned_carts::process_abandoned_carts;

use super::{Pagination, record_activity};
use crate::error::Result;
use crate::middleware::{RequireAdminAuth, RequireWriteAccess};
use crate::models::Action;
use crate::state::AppState;

/// Build the abandoned carts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/abandoned-carts", get(index))
        .route("/abandoned-carts/process", post(process))
}

#[derive(Debug, Deserialize)]
pub struct CartsQuery {
    #[serde(default)]
    pub include_recovered: bool,
    #[serde(default)]
    pub skip: i64,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CartsResponse {
    pub carts: Vec<AbandonedCart>,
    pub skip: i64,
    pub limit: i64,
}

/// Saved carts, newest first.
///
/// GET /api/admin/abandoned-carts?include_recovered=false
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state, _admin))]
async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<CartsQuery>,
) -> Result<Json<CartsResponse>> {
    let mut page = Pagination {
        skip: query.skip,
        ..Pagination::default()
    };
    if let Some(limit) = query.limit {
        page.limit = limit;
    }

    let carts = AbandonedCartRepository::new(state.shop_pool())
        .list(query.include_recovered, page.offset(), page.limit())
        .await?;

    Ok(Json(CartsResponse {
        carts,
        skip: page.offset(),
        limit: page.limit(),
    }))
}

/// Send every reminder that is due now.
///
/// POST /api/admin/abandoned-carts/process
///
/// # Errors
///
/// Returns 500 if carts cannot be read or updated.
#[instrument(skip(state, admin))]
async fn process(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
) -> Result<Json<ProcessSummary>> {
    let summary =
        process_abandoned_carts(state.shop_pool(), state.webhooks(), Utc::now()).await?;

    record_activity(
        &state,
        &admin,
        Action::AbandonedCartsProcessed,
        None,
        json!(summary),
    )
    .await;

    Ok(Json(summary))
}
