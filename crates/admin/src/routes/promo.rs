//! Promo code management.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use raze_core::promo::{PromoRule, normalize_code};
use raze_core::{DiscountType, Money};
use raze_storefront::db::promo::PromoRepository;
use raze_storefront::models::promo::PromoCode;

use super::record_activity;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdminAuth, RequireWriteAccess};
use crate::models::Action;
use crate::state::AppState;

/// Build the promo router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/promo", get(index).post(create))
        .route("/promo/{code}", patch(toggle).delete(destroy))
}

/// A new promo code.
#[derive(Debug, Deserialize)]
pub struct CreatePromo {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    #[serde(default)]
    pub min_order: Money,
    pub max_uses: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

impl CreatePromo {
    /// Check the request and build the stored rule.
    ///
    /// # Errors
    ///
    /// Returns 400 for a blank code or an out-of-range discount.
    fn into_rule(self) -> Result<PromoRule> {
        let code = normalize_code(&self.code);
        if code.is_empty() {
            return Err(AppError::BadRequest("Promo code is required".to_string()));
        }
        if self.discount_value <= Decimal::ZERO {
            return Err(AppError::BadRequest(
                "Discount must be greater than zero".to_string(),
            ));
        }
        if self.discount_type == DiscountType::Percentage
            && self.discount_value > Decimal::ONE_HUNDRED
        {
            return Err(AppError::BadRequest(
                "Percentage discount cannot exceed 100".to_string(),
            ));
        }
        if self.min_order < Money::ZERO {
            return Err(AppError::BadRequest(
                "Minimum order cannot be negative".to_string(),
            ));
        }

        Ok(PromoRule {
            code,
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            min_order: self.min_order,
            max_uses: self.max_uses,
            current_uses: 0,
            is_active: true,
            expires_at: self.expires_at,
            description: self.description,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TogglePromo {
    pub is_active: bool,
}

/// Every code.
///
/// GET /api/admin/promo
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(state, _admin))]
async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
) -> Result<Json<serde_json::Value>> {
    let codes = PromoRepository::new(state.shop_pool()).list().await?;
    Ok(Json(json!({ "codes": codes })))
}

/// Create a code. Codes are stored uppercase.
///
/// POST /api/admin/promo
///
/// # Errors
///
/// Returns 400 for an invalid rule, 409 if the code already exists.
#[instrument(skip(state, admin, req), fields(code = %req.code))]
async fn create(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Json(req): Json<CreatePromo>,
) -> Result<Json<PromoCode>> {
    let rule = req.into_rule()?;
    let code = PromoRepository::new(state.shop_pool()).create(&rule).await?;

    record_activity(
        &state,
        &admin,
        Action::PromoCreated,
        Some(&code.code),
        json!({
            "discount_type": code.discount_type,
            "discount_value": code.discount_value,
        }),
    )
    .await;

    Ok(Json(code))
}

/// Enable or disable a code.
///
/// PATCH /api/admin/promo/{code}
///
/// # Errors
///
/// Returns 404 if the code doesn't exist.
#[instrument(skip(state, admin))]
async fn toggle(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(code): Path<String>,
    Json(req): Json<TogglePromo>,
) -> Result<Json<serde_json::Value>> {
    let code = normalize_code(&code);
    PromoRepository::new(state.shop_pool())
        .set_active(&code, req.is_active)
        .await?;

    record_activity(
        &state,
        &admin,
        Action::PromoToggled,
        Some(&code),
        json!({ "is_active": req.is_active }),
    )
    .await;

    Ok(Json(json!({ "success": true, "code": code, "is_active": req.is_active })))
}

/// Remove a code.
///
/// DELETE /api/admin/promo/{code}
///
/// # Errors
///
/// Returns 404 if the code doesn't exist.
#[instrument(skip(state, admin))]
async fn destroy(
    State(state): State<AppState>,
    RequireWriteAccess(admin): RequireWriteAccess,
    Path(code): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let code = normalize_code(&code);
    PromoRepository::new(state.shop_pool()).delete(&code).await?;

    record_activity(&state, &admin, Action::PromoDeleted, Some(&code), json!({})).await;

    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(discount_type: DiscountType, value: i64) -> CreatePromo {
        CreatePromo {
            code: " summer20 ".to_string(),
            discount_type,
            discount_value: Decimal::from(value),
            min_order: Money::ZERO,
            max_uses: Some(100),
            expires_at: None,
            description: None,
        }
    }

    #[test]
    fn test_codes_are_uppercased() {
        let rule = request(DiscountType::Percentage, 20).into_rule();
        assert_eq!(rule.map(|r| r.code).ok().as_deref(), Some("SUMMER20"));
    }

    #[test]
    fn test_new_codes_start_active_and_unused() {
        let rule = request(DiscountType::Fixed, 10).into_rule().ok();
        assert!(rule.as_ref().is_some_and(|r| r.is_active && r.current_uses == 0));
    }

    #[test]
    fn test_rejects_out_of_range_discounts() {
        assert!(request(DiscountType::Percentage, 150).into_rule().is_err());
        assert!(request(DiscountType::Fixed, 0).into_rule().is_err());
        assert!(request(DiscountType::Fixed, 150).into_rule().is_ok());
    }
}
