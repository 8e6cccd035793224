//! Dashboard totals.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use raze_core::analytics::Timeframe;
use raze_core::{Money, SubscriptionSource};
use raze_storefront::db::orders::OrderRepository;
use raze_storefront::db::stats::{DisciplineCount, StatsRepository};
use raze_storefront::db::subscriptions::{SourceCount, SubscriptionRepository};
use raze_storefront::db::waitlist::WaitlistRepository;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

/// Build the stats router.
pub fn router() -> Router<AppState> {
    Router::new().route("/stats", get(index))
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub timeframe: Option<String>,
}

/// Dashboard totals.
///
/// `total_*` counts fall inside the timeframe; `recent_*_7d` always cover
/// the last seven days.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub timeframe: Timeframe,
    pub total_users: i64,
    pub total_subscribers: i64,
    pub total_giveaway: i64,
    pub total_waitlist: i64,
    pub total_orders: i64,
    pub total_revenue: Money,
    pub subscribers_by_source: Vec<SourceCount>,
    pub disciplines: Vec<DisciplineCount>,
    pub recent_users_7d: i64,
    pub recent_subscribers_7d: i64,
    pub recent_giveaway_7d: i64,
    pub recent_waitlist_7d: i64,
    pub recent_orders_7d: i64,
}

/// Parse `?timeframe=`, defaulting to 30 days.
///
/// # Errors
///
/// Returns 400 for an unknown timeframe.
pub(crate) fn parse_timeframe(input: Option<&str>) -> Result<Timeframe> {
    input.map_or(Ok(Timeframe::default()), |value| {
        value
            .parse()
            .map_err(|e: raze_core::ParseStatusError| AppError::BadRequest(e.to_string()))
    })
}

/// Totals, discipline breakdown and last-week counts.
///
/// GET /api/admin/stats?timeframe=today|7d|30d|90d|all
///
/// # Errors
///
/// Returns 400 for an unknown timeframe, 500 if a count fails.
#[instrument(skip(state, _admin))]
async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>> {
    let timeframe = parse_timeframe(query.timeframe.as_deref())?;
    let now = Utc::now();
    let since = timeframe.start(now);
    let week_ago = Some(now - Duration::days(7));

    let pool = state.shop_pool();
    let stats = StatsRepository::new(pool);
    let subscriptions = SubscriptionRepository::new(pool);
    let waitlist = WaitlistRepository::new(pool);
    let orders = OrderRepository::new(pool);
    let giveaway = Some(SubscriptionSource::GiveawayPopup);

    Ok(Json(StatsResponse {
        timeframe,
        total_users: stats.user_count(since).await?,
        total_subscribers: subscriptions.count(None, since).await?,
        total_giveaway: subscriptions.count(giveaway, since).await?,
        total_waitlist: waitlist.count(since).await?,
        total_orders: orders.count(since).await?,
        total_revenue: orders.revenue(since).await?,
        subscribers_by_source: subscriptions.count_by_source(since).await?,
        disciplines: stats.disciplines().await?,
        recent_users_7d: stats.user_count(week_ago).await?,
        recent_subscribers_7d: subscriptions.count(None, week_ago).await?,
        recent_giveaway_7d: subscriptions.count(giveaway, week_ago).await?,
        recent_waitlist_7d: waitlist.count(week_ago).await?,
        recent_orders_7d: orders.count(week_ago).await?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timeframe() {
        assert_eq!(parse_timeframe(None).ok(), Some(Timeframe::Month));
        assert_eq!(parse_timeframe(Some("7d")).ok(), Some(Timeframe::Week));
        assert_eq!(parse_timeframe(Some("all")).ok(), Some(Timeframe::All));
        assert!(parse_timeframe(Some("fortnight")).is_err());
    }
}
