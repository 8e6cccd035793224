//! Waitlist endpoints.
//!
//! An entry is keyed by (email, product, variant). Joining again with
//! `force_add` merges the new sizes into the existing entry and keeps its
//! position.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use raze_core::waitlist::{PublicCounter, SizeSelection, SizeSelections, WaitlistStatus, access_code};

use super::parse_email;
use crate::db::RepositoryError;
use crate::db::waitlist::{JoinOutcome, WaitlistRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::waitlist::{NewWaitlistEntry, WaitlistEntry};
use crate::services::webhooks::{WaitlistNotice, WebhookKind, waitlist_payload};
use crate::state::AppState;

const FULL_MESSAGE: &str = "Sorry, the waitlist is full! Follow us on Instagram for future drops.";

/// Sizes as sent by the shop: either the compact text form or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SizesInput {
    Text(String),
    List(Vec<SizeSelection>),
}

impl SizesInput {
    fn into_selections(self) -> SizeSelections {
        match self {
            Self::Text(text) => SizeSelections::parse(&text),
            Self::List(list) => SizeSelections::from_selections(list),
        }
    }
}

/// Waitlist form.
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub email: String,
    pub name: Option<String>,
    pub product_id: i32,
    pub product_name: String,
    pub variant: String,
    pub sizes: SizesInput,
    pub image: Option<String>,
    #[serde(default)]
    pub force_add: bool,
}

/// Result of joining.
#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub success: bool,
    pub message: String,
    pub is_update: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<WaitlistEntry>,
}

impl JoinResponse {
    fn with_entry(message: String, is_update: bool, entry: WaitlistEntry) -> Self {
        Self {
            success: true,
            message,
            is_update,
            entry: Some(entry),
        }
    }
}

/// Join the waitlist for a product variant.
///
/// POST /api/waitlist/join
///
/// # Errors
///
/// Returns 400 for an invalid email or an empty size list.
#[instrument(skip(state, req), fields(product_id = req.product_id))]
pub async fn join(
    State(state): State<AppState>,
    Json(req): Json<JoinRequest>,
) -> Result<Json<JoinResponse>> {
    let email = parse_email(&req.email)?;
    let sizes = req.sizes.into_selections();
    if sizes.is_empty() {
        return Err(AppError::BadRequest("Select at least one size".to_string()));
    }

    let repo = WaitlistRepository::new(state.pool());

    if let Some(existing) = repo.find(&email, req.product_id, &req.variant).await? {
        if !req.force_add {
            return Ok(Json(JoinResponse::with_entry(
                "You're already on the waitlist for this item!".to_string(),
                false,
                existing,
            )));
        }
        let entry = update_entry(&state, &existing, &sizes, req.image.as_deref()).await?;
        return Ok(Json(JoinResponse::with_entry(
            format!("Your waitlist updated! Total items: {}", entry.sizes.total_units()),
            true,
            entry,
        )));
    }

    let code = access_code();
    let created = repo
        .create(
            &NewWaitlistEntry {
                email: &email,
                name: req.name.as_deref().map(str::trim).filter(|n| !n.is_empty()),
                product_id: req.product_id,
                product_name: &req.product_name,
                variant: &req.variant,
                sizes: &sizes,
                image: req.image.as_deref(),
                access_code: &code,
            },
            state.config().waitlist_limit,
        )
        .await;

    let entry = match created {
        Ok(JoinOutcome::Joined(entry)) => entry,
        Ok(JoinOutcome::Full) => {
            return Ok(Json(JoinResponse {
                success: false,
                message: FULL_MESSAGE.to_string(),
                is_update: false,
                entry: None,
            }));
        }
        // Lost a race with a concurrent join for the same key.
        Err(RepositoryError::Conflict(_)) => {
            let existing = repo
                .find(&email, req.product_id, &req.variant)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            return Ok(Json(JoinResponse::with_entry(
                "You're already on the waitlist for this item!".to_string(),
                false,
                existing,
            )));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(position = entry.position, "Joined waitlist");
    add_breadcrumb("waitlist", "Joined waitlist", None);
    notify(&state, &entry, false);

    Ok(Json(JoinResponse::with_entry(
        format!("You've joined the waitlist! Items: {}", entry.sizes.total_units()),
        false,
        entry,
    )))
}

async fn update_entry(
    state: &AppState,
    existing: &WaitlistEntry,
    sizes: &SizeSelections,
    image: Option<&str>,
) -> Result<WaitlistEntry> {
    let entry = WaitlistRepository::new(state.pool())
        .merge_sizes(existing.id, sizes, image)
        .await?;

    tracing::info!(position = entry.position, "Waitlist entry updated");
    notify(state, &entry, true);
    Ok(entry)
}

fn notify(state: &AppState, entry: &WaitlistEntry, is_update: bool) {
    let webhooks = state.webhooks();
    let payload = waitlist_payload(
        webhooks.asset_base(),
        &WaitlistNotice {
            email: &entry.email,
            product_name: &entry.product_name,
            variant: &entry.variant,
            image: entry.image.as_deref(),
            sizes: &entry.sizes,
            access_code: &entry.access_code,
            is_update,
        },
    );
    webhooks.spawn(WebhookKind::Waitlist, entry.email.clone(), payload);
}

/// Query for [`check`].
#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub email: String,
    pub product_id: i32,
    pub variant: String,
}

/// Whether an address is already waiting for a variant.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub on_waitlist: bool,
    pub entry: Option<WaitlistEntry>,
}

/// Look up an address's entry for a variant.
///
/// GET /api/waitlist/check
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
    let entry = WaitlistRepository::new(state.pool())
        .find(&email, query.product_id, &query.variant)
        .await?;

    Ok(Json(CheckResponse {
        on_waitlist: entry.is_some(),
        entry,
    }))
}

/// Spots taken and remaining.
///
/// GET /api/waitlist/status
///
/// # Errors
///
/// Returns 500 if the count fails.
#[instrument(skip(state))]
pub async fn status(State(state): State<AppState>) -> Result<Json<WaitlistStatus>> {
    let taken = WaitlistRepository::new(state.pool()).count(None).await?;
    Ok(Json(WaitlistStatus::new(state.config().waitlist_limit, taken)))
}

/// Public counter for the landing page.
///
/// GET /api/waitlist/stats
///
/// # Errors
///
/// Returns 500 if the count fails.
#[instrument(skip(state))]
pub async fn stats(State(state): State<AppState>) -> Result<Json<PublicCounter>> {
    let total = WaitlistRepository::new(state.pool()).count(None).await?;
    Ok(Json(PublicCounter::from_total(total)))
}

/// Access code to check.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub access_code: String,
}

/// What an access code unlocks.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub email: String,
    pub product_id: i32,
    pub product_name: String,
    pub variant: String,
    pub sizes: SizeSelections,
}

/// Verify a purchase access code.
///
/// POST /api/waitlist/verify
///
/// # Errors
///
/// Returns 400 for an unknown or already used code.
#[instrument(skip(state, req))]
pub async fn verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>> {
    let code = req.access_code.trim().to_uppercase();
    let entry = WaitlistRepository::new(state.pool())
        .by_access_code(&code)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid access code".to_string()))?;

    if entry.has_purchased {
        return Err(AppError::BadRequest(
            "This code has already been used".to_string(),
        ));
    }

    Ok(Json(VerifyResponse {
        valid: true,
        email: entry.email,
        product_id: entry.product_id,
        product_name: entry.product_name,
        variant: entry.variant,
        sizes: entry.sizes,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_accept_text_or_list() {
        let text: SizesInput = serde_json::from_str(r#""M x2, L""#).unwrap();
        assert_eq!(text.into_selections().total_units(), 3);

        let list: SizesInput =
            serde_json::from_str(r#"[{"size": "S", "quantity": 1}, {"size": "S", "quantity": 2}]"#)
                .unwrap();
        let sizes = list.into_selections();
        assert_eq!(sizes.as_slice().len(), 1);
        assert_eq!(sizes.total_units(), 3);
    }
}
