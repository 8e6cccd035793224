//! Promo code endpoints.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use raze_core::promo::PromoRejection;
use raze_core::{DiscountType, Money};

use super::cart::apply_promo;
use crate::db::promo::PromoRepository;
use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::state::AppState;

/// Code and the subtotal it should apply to.
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub code: String,
    pub subtotal: Money,
}

/// An accepted code with its discount.
#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub discount_amount: Money,
    pub discount_display: String,
    pub min_order: Money,
    pub message: String,
}

/// Check a code against a subtotal.
///
/// POST /api/promo/validate
///
/// # Errors
///
/// Returns 400 with the reason the code cannot be applied.
#[instrument(skip(state, user, req))]
pub async fn validate(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>> {
    let applied = apply_promo(&state, &req.code, req.subtotal, user.map(|u| u.id)).await?;

    Ok(Json(ValidateResponse {
        valid: true,
        message: format!("Promo code applied: {}", applied.display),
        code: applied.code,
        discount_type: applied.discount_type,
        discount_value: applied.discount_value,
        discount_amount: applied.amount,
        discount_display: applied.display,
        min_order: applied.min_order,
    }))
}

/// Code being used.
#[derive(Debug, Deserialize)]
pub struct UseRequest {
    pub code: String,
}

/// Count one use of a code.
///
/// POST /api/promo/use
///
/// # Errors
///
/// Returns 400 if the code is unknown or used up.
#[instrument(skip(state, req))]
pub async fn use_code(
    State(state): State<AppState>,
    Json(req): Json<UseRequest>,
) -> Result<Json<serde_json::Value>> {
    let repo = PromoRepository::new(state.pool());
    if !repo.record_use(&req.code).await? {
        let rejection = if repo.get(&req.code).await?.is_some() {
            PromoRejection::UsageLimitReached
        } else {
            PromoRejection::NotFound
        };
        return Err(rejection.into());
    }

    Ok(Json(serde_json::json!({ "success": true })))
}
