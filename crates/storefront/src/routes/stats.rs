//! Public signup counters.

use axum::{Json, extract::State};
use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;
use tracing::instrument;

use crate::db::orders::OrderRepository;
use crate::db::stats::{SignupCounts, StatsRepository};
use crate::error::Result;
use crate::state::AppState;

/// Counters for the landing page.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub counts: SignupCounts,
    pub total_orders: i64,
    pub updated_at: DateTime<Utc>,
}

/// Signup, waitlist, giveaway and order counts.
///
/// GET /api/stats
///
/// # Errors
///
/// Returns 500 if a count fails.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let now = Utc::now();
    let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();

    let counts = StatsRepository::new(state.pool()).signup_counts(today).await?;
    let total_orders = OrderRepository::new(state.pool()).count(None).await?;

    Ok(Json(StatsResponse {
        counts,
        total_orders,
        updated_at: now,
    }))
}
