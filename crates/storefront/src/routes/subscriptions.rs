//! Email subscription endpoints.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use raze_core::SubscriptionSource;

use super::parse_email;
use crate::db::RepositoryError;
use crate::db::subscriptions::SubscriptionRepository;
use crate::db::users::UserRepository;
use crate::db::waitlist::WaitlistRepository;
use crate::error::{Result, add_breadcrumb};
use crate::models::subscription::{DEFAULT_DROP, NewSubscription, Subscription, giveaway_entry_id};
use crate::services::webhooks::{WebhookKind, giveaway_payload};
use crate::state::AppState;

/// Subscription form.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
    pub name: Option<String>,
    pub source: SubscriptionSource,
    pub drop: Option<String>,
    pub product_id: Option<i32>,
    pub product_name: Option<String>,
    pub size: Option<String>,
}

/// Subscription result.
#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub already_subscribed: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
    pub subscription: Subscription,
}

/// Subscribe an email address.
///
/// POST /api/subscriptions
///
/// Subscribing twice with the same key returns the existing subscription.
///
/// # Errors
///
/// Returns 400 for an invalid email.
#[instrument(skip(state, req), fields(source = %req.source))]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(req): Json<SubscribeRequest>,
) -> Result<Json<SubscribeResponse>> {
    let email = parse_email(&req.email)?;
    let product_id = match req.source {
        SubscriptionSource::NotifyMe => req.product_id,
        SubscriptionSource::GiveawayPopup | SubscriptionSource::EarlyAccess => None,
    };

    let repo = SubscriptionRepository::new(state.pool());
    if let Some(existing) = repo.find(&email, req.source, product_id).await? {
        return Ok(Json(already_subscribed(existing)));
    }

    let entry_id =
        (req.source == SubscriptionSource::GiveawayPopup).then(giveaway_entry_id);
    let new = NewSubscription {
        email: &email,
        name: req.name.as_deref().map(str::trim).filter(|n| !n.is_empty()),
        source: req.source,
        drop_name: req.drop.as_deref().unwrap_or(DEFAULT_DROP),
        product_id,
        product_name: req.product_name.as_deref(),
        size: req.size.as_deref(),
        entry_id: entry_id.as_deref(),
    };

    let subscription = match repo.create(&new).await {
        Ok(subscription) => subscription,
        Err(RepositoryError::Conflict(_)) => {
            let existing = repo
                .find(&email, req.source, product_id)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            return Ok(Json(already_subscribed(existing)));
        }
        Err(e) => return Err(e.into()),
    };

    add_breadcrumb("subscriptions", "Subscribed", Some(&[("source", req.source.as_str())]));

    if let Some(entry_id) = &entry_id {
        let webhooks = state.webhooks();
        webhooks.spawn(
            WebhookKind::Giveaway,
            email.to_string(),
            giveaway_payload(webhooks.asset_base(), email.as_str(), entry_id),
        );
    }

    Ok(Json(SubscribeResponse {
        success: true,
        already_subscribed: false,
        message: "Successfully subscribed!".to_string(),
        entry_id,
        subscription,
    }))
}

fn already_subscribed(existing: Subscription) -> SubscribeResponse {
    SubscribeResponse {
        success: true,
        already_subscribed: true,
        message: "You're already subscribed!".to_string(),
        entry_id: existing.entry_id.clone(),
        subscription: existing,
    }
}

/// Address to opt out.
#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub email: String,
}

/// Unsubscribe result.
#[derive(Debug, Serialize)]
pub struct UnsubscribeResponse {
    pub success: bool,
    pub records_updated: u64,
}

/// Opt an address out of all marketing email.
///
/// POST /api/subscriptions/unsubscribe
///
/// # Errors
///
/// Returns 400 for an invalid email.
#[instrument(skip(state, req))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    Json(req): Json<UnsubscribeRequest>,
) -> Result<Json<UnsubscribeResponse>> {
    let email = parse_email(&req.email)?;

    let users = UserRepository::new(state.pool()).unsubscribe(email.as_str()).await?;
    let subscriptions = SubscriptionRepository::new(state.pool())
        .unsubscribe(email.as_str())
        .await?;
    let waitlist = WaitlistRepository::new(state.pool())
        .unsubscribe(email.as_str())
        .await?;

    tracing::info!(records = users + subscriptions + waitlist, "Unsubscribed");

    Ok(Json(UnsubscribeResponse {
        success: true,
        records_updated: users + subscriptions + waitlist,
    }))
}

/// Query for [`check`].
#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub email: String,
}

/// Subscription state for an address.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub subscribed: bool,
    pub sources: Vec<SubscriptionSource>,
    pub subscriptions: Vec<Subscription>,
}

/// Look up an address's subscriptions.
///
/// GET /api/subscriptions/check?email=
///
/// # Errors
///
/// Returns 400 for an invalid email.
#[instrument(skip(state, query))]
pub async fn check(
    State(state): State<AppState>,
    Query(query): Query<CheckQuery>,
) -> Result<Json<CheckResponse>> {
    let email = parse_email(&query.email)?;
    let subscriptions = SubscriptionRepository::new(state.pool())
        .for_email(&email)
        .await?;

    let mut sources: Vec<SubscriptionSource> = subscriptions
        .iter()
        .filter(|s| s.email_subscribed)
        .map(|s| s.source)
        .collect();
    sources.dedup();

    Ok(Json(CheckResponse {
        subscribed: !sources.is_empty(),
        sources,
        subscriptions,
    }))
}
