//! Cart pricing and abandonment tracking.
//!
//! The shop keeps the cart client-side; the server prices it so totals
//! and discounts never come from the browser. Any price sent with a line is
//! replaced by the `products` row before totalling.

use std::collections::HashMap;

use axum::{Json, extract::State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use raze_core::cart::{self, CartLine, CartQuote, ListedProduct};
use raze_core::credits::{first_order_code_matches, first_order_rule, tier_for};
use raze_core::promo::{self, AppliedDiscount, normalize_code};
use raze_core::{Money, UserId};

use super::parse_email;
use crate::db::abandoned_carts::AbandonedCartRepository;
use crate::db::products::ProductRepository;
use crate::db::promo::PromoRepository;
use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::state::AppState;

/// Validate a cart and reprice every line from the catalog.
///
/// # Errors
///
/// Returns `AppError::Cart` for an invalid cart or a product or variant
/// that isn't for sale.
pub(super) async fn price_cart(state: &AppState, lines: &[CartLine]) -> Result<Vec<CartLine>> {
    cart::validate(lines)?;

    let mut ids: Vec<i32> = lines.iter().map(|l| l.product_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let listed: HashMap<i32, ListedProduct> = ProductRepository::new(state.pool())
        .active_by_ids(&ids)
        .await?
        .into_iter()
        .map(|p| (p.id.as_i32(), ListedProduct::from(p)))
        .collect();

    Ok(cart::price_lines(lines, |id| listed.get(&id))?)
}

/// Resolve a customer-entered code against a subtotal.
///
/// A signed-in customer's own unused first-order code is honored alongside
/// the stored promo codes.
///
/// # Errors
///
/// Returns `AppError::Promo` when the code cannot be applied.
pub(super) async fn apply_promo(
    state: &AppState,
    code: &str,
    subtotal: Money,
    user_id: Option<UserId>,
) -> Result<AppliedDiscount> {
    let now = Utc::now();

    if let Some(user_id) = user_id
        && let Some(user) = UserRepository::new(state.pool()).get_by_id(user_id).await?
        && let Some(issued) = user.first_order_discount_code.as_deref()
        && first_order_code_matches(issued, code)
    {
        if user.has_used_first_order_discount {
            return Err(AppError::BadRequest(
                "You have already used your first order discount".to_string(),
            ));
        }
        return Ok(first_order_rule(issued).evaluate(subtotal, now)?);
    }

    let stored = PromoRepository::new(state.pool())
        .get(&normalize_code(code))
        .await?;
    Ok(promo::evaluate(stored.map(|p| p.rule()).as_ref(), subtotal, now)?)
}

/// Cart to price.
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub items: Vec<CartLine>,
    pub promo_code: Option<String>,
    pub credits_to_use: Option<i32>,
}

/// Price a cart with an optional promo code and credit tier.
///
/// POST /api/cart/quote
///
/// `credits_to_use` previews a credit tier; credits are only spent by
/// redeeming them for a code.
///
/// # Errors
///
/// Returns 400 for an invalid cart, a rejected code or an unaffordable tier,
/// and 401 when credits are requested without a session.
#[instrument(skip(state, user, req), fields(items = req.items.len()))]
pub async fn quote(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Json(req): Json<QuoteRequest>,
) -> Result<Json<CartQuote>> {
    cart::validate(&req.items)?;
    let user_id = user.as_ref().map(|u| u.id);

    let tier = match req.credits_to_use.filter(|c| *c > 0) {
        None => None,
        Some(credits) => {
            let tier = tier_for(credits)
                .ok_or_else(|| AppError::BadRequest("Invalid redemption tier".to_string()))?;
            let user_id = user_id
                .ok_or_else(|| AppError::Unauthorized("Sign in to use credits".to_string()))?;
            Some((tier, user_id))
        }
    };

    let items = price_cart(&state, &req.items).await?;
    let subtotal = cart::subtotal(&items).round_cents();

    let promo = match req.promo_code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => Some(apply_promo(&state, code, subtotal, user_id).await?),
        _ => None,
    };

    let credit_discount = match tier {
        None => Money::ZERO,
        Some((tier, user_id)) => {
            let balance = UserRepository::new(state.pool())
                .get_by_id(user_id)
                .await?
                .map_or(0, |u| u.raze_credits);
            if balance < tier.credits {
                return Err(AppError::BadRequest(format!(
                    "Insufficient credits. You have {balance}, need {}",
                    tier.credits
                )));
            }
            tier.discount
        }
    };

    Ok(Json(CartQuote::build(&items, promo.as_ref(), credit_discount)))
}

/// Cart left at checkout.
#[derive(Debug, Deserialize)]
pub struct AbandonedRequest {
    pub email: String,
    pub items: Vec<CartLine>,
}

/// Acknowledgement for the cart tracking endpoints.
#[derive(Debug, Serialize)]
pub struct CartTrackResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_total: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovered: Option<u64>,
}

/// Save the open cart for an address.
///
/// POST /api/cart/abandoned
///
/// Lines are repriced from the catalog before the cart and its total are
/// stored.
///
/// # Errors
///
/// Returns 400 for an invalid email or cart.
#[instrument(skip(state, user, req))]
pub async fn abandoned(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Json(req): Json<AbandonedRequest>,
) -> Result<Json<CartTrackResponse>> {
    let email = parse_email(&req.email)?;
    let items = price_cart(&state, &req.items).await?;
    let total = cart::subtotal(&items).round_cents();

    let saved = AbandonedCartRepository::new(state.pool())
        .save(&email, user.map(|u| u.id), &items, total)
        .await?;

    tracing::debug!(cart_id = %saved.id, "Abandoned cart saved");

    Ok(Json(CartTrackResponse {
        success: true,
        cart_total: Some(saved.cart_total),
        recovered: None,
    }))
}

/// Address whose cart was completed.
#[derive(Debug, Deserialize)]
pub struct RecoveredRequest {
    pub email: String,
}

/// Stop reminders for an address.
///
/// POST /api/cart/recovered
///
/// # Errors
///
/// Returns 400 for an invalid email.
#[instrument(skip(state, req))]
pub async fn recovered(
    State(state): State<AppState>,
    Json(req): Json<RecoveredRequest>,
) -> Result<Json<CartTrackResponse>> {
    let email = parse_email(&req.email)?;
    let updated = AbandonedCartRepository::new(state.pool())
        .mark_recovered(&email)
        .await?;

    Ok(Json(CartTrackResponse {
        success: true,
        cart_total: None,
        recovered: Some(updated),
    }))
}
