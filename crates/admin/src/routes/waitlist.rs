//! Waitlist entries.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Serialize;
use tracing::instrument;

use raze_storefront::db::waitlist::WaitlistRepository;
use raze_storefront::models::waitlist::WaitlistEntry;

use super::Pagination;
use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

/// Build the waitlist router.
pub fn router() -> Router<AppState> {
    Router::new().route("/waitlist", get(index))
}

#[derive(Debug, Serialize)]
pub struct WaitlistResponse {
    pub waitlist: Vec<WaitlistEntry>,
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
}

/// Entries in position order.
///
/// GET /api/admin/waitlist?skip=&limit=
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state, _admin))]
async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(page): Query<Pagination>,
) -> Result<Json<WaitlistResponse>> {
    let repo = WaitlistRepository::new(state.shop_pool());
    let waitlist = repo.list(page.offset(), page.limit()).await?;
    let total = repo.count(None).await?;

    Ok(Json(WaitlistResponse {
        waitlist,
        total,
        skip: page.offset(),
        limit: page.limit(),
    }))
}
