//! Stored promo codes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use raze_core::promo::PromoRule;
use raze_core::{DiscountType, Money, PromoCodeId};

/// A row of `promo_codes`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PromoCode {
    pub id: PromoCodeId,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_order: Money,
    pub max_uses: Option<i32>,
    pub current_uses: i32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PromoCode {
    /// The rule used for validation.
    #[must_use]
    pub fn rule(&self) -> PromoRule {
        PromoRule {
            code: self.code.clone(),
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            min_order: self.min_order,
            max_uses: self.max_uses,
            current_uses: self.current_uses,
            is_active: self.is_active,
            expires_at: self.expires_at,
            description: self.description.clone(),
        }
    }
}
