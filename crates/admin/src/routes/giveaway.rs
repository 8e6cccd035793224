//! Giveaway draws.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use raze_core::SubscriptionSource;
use raze_storefront::db::subscriptions::SubscriptionRepository;
use raze_storefront::models::subscription::Subscription;
use raze_storefront::services::webhooks::{Delivery, WebhookKind, giveaway_winner_payload};

use super::{parse_email, record_activity};
use crate::db::GiveawayRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdminAuth, RequireWriteAccess};
use crate::models::{Action, GiveawayWinner, NewGiveawayWinner};
use crate::state::AppState;

/// Prize named when the request leaves it out.
pub const DEFAULT_PRIZE: &str = "Performance T-Shirt Bundle";
const WINNER_HISTORY_LIMIT: i64 = 100;

/// Build the giveaway router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/giveaway/pick", post(pick))
        .route("/giveaway/winner", post(select_winner))
        .route("/giveaway/winners", get(winners))
}

#[derive(Debug, Serialize)]
pub struct PickResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Subscription>,
    pub total_entries: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WinnerRequest {
    pub email: String,
    pub entry_id: Option<String>,
    pub prize: Option<String>,
    pub winner_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WinnerSummary {
    pub email: String,
    pub entry_id: String,
    pub prize: String,
    pub webhook_sent: bool,
}

#[derive(Debug, Serialize)]
pub struct WinnerResponse {
    pub success: bool,
    pub message: String,
    pub winner: WinnerSummary,
}

/// Draw a random subscribed giveaway entrant. Nothing is recorded until a
/// winner is confirmed.
///
/// POST /api/admin/giveaway/pick
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state, _admin))]
async fn pick(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<PickResponse>> {
    let repo = SubscriptionRepository::new(state.shop_pool());
    let total_entries = repo
        .count(Some(SubscriptionSource::GiveawayPopup), None)
        .await?;

    let Some(winner) = repo.random_giveaway_entrant().await? else {
        return Ok(Json(PickResponse {
            success: false,
            winner: None,
            total_entries,
            message: Some("No giveaway entries found".to_string()),
        }));
    };

    Ok(Json(PickResponse {
        success: true,
        winner: Some(winner),
        total_entries,
        message: None,
    }))
}

/// Confirm a winner, notify them and record the result.
///
/// POST /api/admin/giveaway/winner
///
/// The winner notification is sent even if the address has unsubscribed
/// from marketing.
///
/// # Errors
///
/// Returns 404 if the address has no giveaway entry.
#[instrument(skip(state, admin, req))]
async fn select_winner(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Json(req): Json<WinnerRequest>,
) -> Result<Json<WinnerResponse>> {
    let email = parse_email(&req.email)?;

    let entry = SubscriptionRepository::new(state.shop_pool())
        .find(&email, SubscriptionSource::GiveawayPopup, None)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No giveaway entry found for {email}")))?;

    let entry_id = req
        .entry_id
        .filter(|id| !id.trim().is_empty())
        .or(entry.entry_id)
        .unwrap_or_default();
    let prize = req
        .prize
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PRIZE.to_string());
    let winner_name = req.winner_name.or(entry.name);

    let webhooks = state.webhooks();
    let payload = giveaway_winner_payload(
        webhooks.asset_base(),
        email.as_str(),
        &entry_id,
        &prize,
        winner_name.as_deref(),
    );
    let webhook_sent = webhooks
        .send(WebhookKind::GiveawayWinner, email.as_str(), &payload)
        .await
        == Delivery::Sent;

    GiveawayRepository::new(state.pool())
        .record(&NewGiveawayWinner {
            email: email.as_str(),
            entry_id: &entry_id,
            prize: &prize,
            winner_name: winner_name.as_deref(),
            selected_by: admin.email.as_str(),
            webhook_sent,
        })
        .await?;

    tracing::info!(webhook_sent, "Giveaway winner selected");
    record_activity(
        &state,
        &admin,
        Action::GiveawayWinnerSelected,
        Some(email.as_str()),
        json!({ "entry_id": entry_id, "prize": prize, "webhook_sent": webhook_sent }),
    )
    .await;

    let message = if webhook_sent {
        format!("Winner notification sent to {email}")
    } else {
        format!("Winner recorded for {email}; notification not sent")
    };

    Ok(Json(WinnerResponse {
        success: true,
        message,
        winner: WinnerSummary {
            email: email.to_string(),
            entry_id,
            prize,
            webhook_sent,
        },
    }))
}

/// Past winners, newest first.
///
/// GET /api/admin/giveaway/winners
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state, _admin))]
async fn winners(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<Vec<GiveawayWinner>>> {
    let winners = GiveawayRepository::new(state.pool())
        .list(WINNER_HISTORY_LIMIT)
        .await?;
    Ok(Json(winners))
}
