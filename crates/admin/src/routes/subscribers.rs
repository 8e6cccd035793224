//! Email subscriptions.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use raze_core::{SubscriptionId, SubscriptionSource};
use raze_storefront::db::subscriptions::{SourceCount, SubscriptionRepository};
use raze_storefront::models::subscription::Subscription;

use super::{Pagination, record_activity};
use crate::error::Result;
use crate::middleware::{RequireAdminAuth, RequireWriteAccess};
use crate::models::Action;
use crate::state::AppState;

/// Build the subscribers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscribers", get(index))
        .route("/subscribers/stats", get(stats))
        .route("/subscribers/{id}", delete(destroy))
}

#[derive(Debug, Deserialize)]
pub struct SubscribersQuery {
    pub source: Option<SubscriptionSource>,
    #[serde(default)]
    pub skip: i64,
    pub limit: Option<i64>,
}

impl SubscribersQuery {
    fn page(&self) -> Pagination {
        let mut page = Pagination {
            skip: self.skip,
            ..Pagination::default()
        };
        if let Some(limit) = self.limit {
            page.limit = limit;
        }
        page
    }
}

#[derive(Debug, Serialize)]
pub struct SubscribersResponse {
    pub subscribers: Vec<Subscription>,
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct SubscriberStats {
    pub total: i64,
    pub by_source: Vec<SourceCount>,
}

/// Subscriptions, newest first, optionally for one source.
///
/// GET /api/admin/subscribers?source=&skip=&limit=
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state, _admin))]
async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<SubscribersQuery>,
) -> Result<Json<SubscribersResponse>> {
    let repo = SubscriptionRepository::new(state.shop_pool());
    let page = query.page();
    let subscribers = repo.list(query.source, page.offset(), page.limit()).await?;
    let total = repo.count(query.source, None).await?;

    Ok(Json(SubscribersResponse {
        subscribers,
        total,
        skip: page.offset(),
        limit: page.limit(),
    }))
}

/// Subscription count per source.
///
/// GET /api/admin/subscribers/stats
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state, _admin))]
async fn stats(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<SubscriberStats>> {
    let by_source = SubscriptionRepository::new(state.shop_pool())
        .count_by_source(None)
        .await?;
    let total = by_source.iter().map(|c| c.count).sum();

    Ok(Json(SubscriberStats { total, by_source }))
}

/// Remove a subscription.
///
/// DELETE /api/admin/subscribers/{id}
///
/// # Errors
///
/// Returns 404 if the subscription doesn't exist.
#[instrument(skip(state, admin))]
async fn destroy(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(id): Path<SubscriptionId>,
) -> Result<Json<serde_json::Value>> {
    SubscriptionRepository::new(state.shop_pool()).delete(id).await?;

    record_activity(
        &state,
        &admin,
        Action::SubscriberDeleted,
        Some(&id.to_string()),
        json!({}),
    )
    .await;

    Ok(Json(json!({ "success": true })))
}
