//! Visitor analytics dashboards.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use raze_core::analytics::{ConversionFunnel, LocationFilter, daily_counts};
use raze_storefront::db::stats::StatsRepository;
use raze_storefront::db::visitors::{
    CountryCount, LocationCount, PageCount, SourceCount, VisitorRepository,
};
use raze_storefront::models::visitor::{AnalyticsEvent, VisitorSession};

use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

const MAX_DAYS: i64 = 365;
const TOP_LIMIT: i64 = 10;
const LOCATION_LIMIT: i64 = 100;
const RECENT_EVENT_LIMIT: i64 = 20;

/// Build the analytics router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analytics/overview", get(overview))
        .route("/analytics/locations", get(locations))
        .route("/analytics/realtime", get(realtime))
        .route("/analytics/daily", get(daily))
}

/// `?days=` window.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DaysQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LocationsQuery {
    #[serde(default)]
    pub filter: LocationFilter,
    pub days: Option<i64>,
}

/// Clamp a requested window to `1..=MAX_DAYS`.
fn window(days: Option<i64>, default: i64) -> i64 {
    days.unwrap_or(default).clamp(1, MAX_DAYS)
}

fn since(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now - Duration::days(days)
}

#[derive(Debug, Serialize)]
pub struct Overview {
    pub days: i64,
    pub total_visitors: i64,
    pub unique_visitors: i64,
    pub registered_users: i64,
    pub guest_visitors: i64,
    pub active_sessions: i64,
    pub total_page_views: i64,
    pub avg_session_duration: f64,
    pub top_pages: Vec<PageCount>,
    pub top_countries: Vec<CountryCount>,
    pub traffic_sources: Vec<SourceCount>,
    pub conversion_funnel: ConversionFunnel,
}

#[derive(Debug, Serialize)]
pub struct Locations {
    pub locations: Vec<LocationCount>,
    pub total: i64,
    pub filter: LocationFilter,
}

#[derive(Debug, Serialize)]
pub struct Realtime {
    pub active_count: i64,
    pub active_visitors: Vec<VisitorSession>,
    pub recent_events: Vec<AnalyticsEvent>,
}

/// Counts for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCounts {
    pub date: NaiveDate,
    pub visitors: i64,
    pub signups: i64,
    pub orders: i64,
}

#[derive(Debug, Serialize)]
pub struct Daily {
    pub days: Vec<DayCounts>,
}

/// Zip per-day series that share the same day range.
fn merge_days(
    visitors: &[(NaiveDate, i64)],
    signups: &[(NaiveDate, i64)],
    orders: &[(NaiveDate, i64)],
) -> Vec<DayCounts> {
    visitors
        .iter()
        .zip(signups)
        .zip(orders)
        .map(|((&(date, visitors), &(_, signups)), &(_, orders))| DayCounts {
            date,
            visitors,
            signups,
            orders,
        })
        .collect()
}

/// Traffic, top lists and conversion funnel.
///
/// GET /api/admin/analytics/overview?days=7
///
/// # Errors
///
/// Returns 500 if a query fails.
#[instrument(skip(state, _admin))]
async fn overview(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Overview>> {
    let days = window(query.days, 7);
    let now = Utc::now();
    let since = since(now, days);
    let visitors = VisitorRepository::new(state.shop_pool());

    let totals = visitors.totals(since).await?;
    let funnel = visitors.funnel_counts(since).await?;

    Ok(Json(Overview {
        days,
        total_visitors: totals.total_visitors,
        unique_visitors: totals.unique_visitors,
        registered_users: totals.registered_users,
        guest_visitors: totals.guest_visitors,
        active_sessions: visitors.active_count(now).await?,
        total_page_views: visitors.page_view_count(since).await?,
        avg_session_duration: totals.avg_session_duration,
        top_pages: visitors.top_pages(since, TOP_LIMIT).await?,
        top_countries: visitors.top_countries(since, TOP_LIMIT).await?,
        traffic_sources: visitors.traffic_sources(since, TOP_LIMIT).await?,
        conversion_funnel: ConversionFunnel::new(
            totals.unique_visitors,
            funnel.add_to_cart,
            funnel.begin_checkout,
            funnel.purchase,
        ),
    }))
}

/// Visitors grouped by city.
///
/// GET /api/admin/analytics/locations?filter=all|registered|guest|signup&days=30
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state, _admin))]
async fn locations(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<LocationsQuery>,
) -> Result<Json<Locations>> {
    let since = since(Utc::now(), window(query.days, 30));
    let locations = VisitorRepository::new(state.shop_pool())
        .locations(query.filter, since, LOCATION_LIMIT)
        .await?;
    let total = locations.iter().map(|l| l.visitors).sum();

    Ok(Json(Locations {
        locations,
        total,
        filter: query.filter,
    }))
}

/// Who is on the site right now.
///
/// GET /api/admin/analytics/realtime
///
/// # Errors
///
/// Returns 500 if a query fails.
#[instrument(skip(state, _admin))]
async fn realtime(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<Realtime>> {
    let now = Utc::now();
    let visitors = VisitorRepository::new(state.shop_pool());
    let active_visitors = visitors.active_sessions(now).await?;

    Ok(Json(Realtime {
        active_count: i64::try_from(active_visitors.len()).unwrap_or(i64::MAX),
        active_visitors,
        recent_events: visitors.recent_events(RECENT_EVENT_LIMIT).await?,
    }))
}

/// Visitors, signups and orders per day, zero-filled.
///
/// GET /api/admin/analytics/daily?days=30
///
/// # Errors
///
/// Returns 500 if a query fails.
#[instrument(skip(state, _admin))]
async fn daily(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Daily>> {
    let days = window(query.days, 30);
    let now = Utc::now();
    let end = now.date_naive();
    let start = end - Duration::days(days - 1);
    let since = start.and_time(chrono::NaiveTime::MIN).and_utc();

    let pool = state.shop_pool();
    let stats = StatsRepository::new(pool);
    let visits = VisitorRepository::new(pool).visit_times(since).await?;
    let signups = stats.signup_times(since).await?;
    let orders = stats.order_times(since).await?;

    Ok(Json(Daily {
        days: merge_days(
            &daily_counts(visits, start, end),
            &daily_counts(signups, start, end),
            &daily_counts(orders, start, end),
        ),
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_window_clamps() {
        assert_eq!(window(None, 7), 7);
        assert_eq!(window(Some(0), 7), 1);
        assert_eq!(window(Some(10_000), 7), MAX_DAYS);
    }

    #[test]
    fn test_merge_days_lines_up_series() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let at = |d: u32| {
            NaiveDate::from_ymd_opt(2025, 3, d)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
                .and_utc()
        };

        let merged = merge_days(
            &daily_counts([at(1), at(1), at(3)], start, end),
            &daily_counts([at(2)], start, end),
            &daily_counts(Vec::new(), start, end),
        );

        assert_eq!(merged.len(), 3);
        assert_eq!(
            merged[0],
            DayCounts {
                date: start,
                visitors: 2,
                signups: 0,
                orders: 0
            }
        );
        assert_eq!(merged[1].signups, 1);
        assert_eq!(merged[2].visitors, 1);
    }
}
