//! Promo code rules.
//!
//! Validation runs in a fixed order so customers always see the most
//! fundamental problem first: unknown code, inactive, expired, used up,
//! then minimum order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{DiscountType, Money};

/// Why a promo code cannot be applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PromoRejection {
    #[error("Invalid promo code")]
    NotFound,

    #[error("This promo code is no longer active")]
    Inactive,

    #[error("This promo code has expired")]
    Expired,

    #[error("This promo code has reached its usage limit")]
    UsageLimitReached,

    #[error("Minimum order of {} required for this code", .minimum.display())]
    BelowMinimum { minimum: Money },
}

/// A stored promo code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoRule {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_order: Money,
    pub max_uses: Option<i32>,
    pub current_uses: i32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

/// A promo code that passed validation, with the computed discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub amount: Money,
    pub display: String,
    pub min_order: Money,
}

/// Canonical form of a customer-entered code.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl PromoRule {
    /// Whether `max_uses` has been reached. `None` means unlimited.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.max_uses
            .is_some_and(|max| max > 0 && self.current_uses >= max)
    }

    /// Discount for a subtotal, rounded to cents.
    ///
    /// Fixed discounts never exceed the subtotal.
    #[must_use]
    pub fn discount_for(&self, subtotal: Money) -> Money {
        let amount = match self.discount_type {
            DiscountType::Percentage => {
                Money::new(subtotal.amount() * self.discount_value / Decimal::ONE_HUNDRED)
            }
            DiscountType::Fixed => Money::new(self.discount_value).min(subtotal),
        };
        amount.non_negative().round_cents()
    }

    /// Short customer-facing description, e.g. `10% off` or `$5.00 off`.
    #[must_use]
    pub fn display(&self) -> String {
        match self.discount_type {
            DiscountType::Percentage => format!("{}% off", self.discount_value.trunc()),
            DiscountType::Fixed => format!("{} off", Money::new(self.discount_value).display()),
        }
    }

    /// Check the rule against a subtotal at `now`.
    ///
    /// # Errors
    ///
    /// Returns the first failing check.
    pub fn evaluate(
        &self,
        subtotal: Money,
        now: DateTime<Utc>,
    ) -> Result<AppliedDiscount, PromoRejection> {
        if !self.is_active {
            return Err(PromoRejection::Inactive);
        }
        if self.expires_at.is_some_and(|expires| expires < now) {
            return Err(PromoRejection::Expired);
        }
        if self.is_exhausted() {
            return Err(PromoRejection::UsageLimitReached);
        }
        if subtotal < self.min_order {
            return Err(PromoRejection::BelowMinimum {
                minimum: self.min_order,
            });
        }

        Ok(AppliedDiscount {
            code: self.code.clone(),
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            amount: self.discount_for(subtotal),
            display: self.display(),
            min_order: self.min_order,
        })
    }
}

/// Evaluate an optional lookup result.
///
/// # Errors
///
/// Returns [`PromoRejection::NotFound`] when `rule` is `None`, otherwise
/// whatever [`PromoRule::evaluate`] returns.
pub fn evaluate(
    rule: Option<&PromoRule>,
    subtotal: Money,
    now: DateTime<Utc>,
) -> Result<AppliedDiscount, PromoRejection> {
    rule.ok_or(PromoRejection::NotFound)?.evaluate(subtotal, now)
}

/// Codes every store starts with.
#[must_use]
pub fn default_codes() -> Vec<PromoRule> {
    vec![
        PromoRule {
            code: "WELCOME10".to_string(),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(10),
            min_order: Money::ZERO,
            max_uses: None,
            current_uses: 0,
            is_active: true,
            expires_at: None,
            description: Some("10% off your first order".to_string()),
        },
        PromoRule {
            code: "LAUNCH15".to_string(),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(15),
            min_order: Money::from_dollars(50),
            max_uses: Some(100),
            current_uses: 0,
            is_active: true,
            expires_at: None,
            description: Some("15% off orders over $50".to_string()),
        },
        PromoRule {
            code: "RAZE20".to_string(),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(20),
            min_order: Money::from_dollars(75),
            max_uses: Some(50),
            current_uses: 0,
            is_active: true,
            expires_at: None,
            description: Some("20% off orders over $75".to_string()),
        },
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn rule(code: &str) -> PromoRule {
        default_codes()
            .into_iter()
            .find(|r| r.code == code)
            .unwrap()
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  welcome10 "), "WELCOME10");
    }

    #[test]
    fn test_unknown_code() {
        let err = evaluate(None, Money::from_dollars(10), Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid promo code");
    }

    #[test]
    fn test_percentage_discount() {
        let applied = rule("WELCOME10")
            .evaluate(Money::from_cents(5999), Utc::now())
            .unwrap();
        assert_eq!(applied.amount, Money::from_cents(600));
        assert_eq!(applied.display, "10% off");
    }

    #[test]
    fn test_fixed_discount_capped_at_subtotal() {
        let fixed = PromoRule {
            code: "RAZE300-ABCDEF".to_string(),
            discount_type: DiscountType::Fixed,
            discount_value: Decimal::from(25),
            min_order: Money::ZERO,
            max_uses: Some(1),
            current_uses: 0,
            is_active: true,
            expires_at: None,
            description: None,
        };
        let applied = fixed.evaluate(Money::from_dollars(20), Utc::now()).unwrap();
        assert_eq!(applied.amount, Money::from_dollars(20));
        assert_eq!(applied.display, "$25.00 off");
    }

    #[test]
    fn test_minimum_order_message() {
        let err = rule("LAUNCH15")
            .evaluate(Money::from_dollars(49), Utc::now())
            .unwrap_err();
        assert_eq!(err.to_string(), "Minimum order of $50.00 required for this code");
    }

    #[test]
    fn test_check_order_inactive_before_expired() {
        let mut r = rule("RAZE20");
        r.is_active = false;
        r.expires_at = Some(Utc::now() - Duration::days(1));
        assert_eq!(
            r.evaluate(Money::from_dollars(100), Utc::now()),
            Err(PromoRejection::Inactive)
        );
        r.is_active = true;
        assert_eq!(
            r.evaluate(Money::from_dollars(100), Utc::now()),
            Err(PromoRejection::Expired)
        );
    }

    #[test]
    fn test_usage_limit() {
        let mut r = rule("RAZE20");
        r.current_uses = 50;
        assert_eq!(
            r.evaluate(Money::from_dollars(100), Utc::now()),
            Err(PromoRejection::UsageLimitReached)
        );
        r.max_uses = None;
        assert!(r.evaluate(Money::from_dollars(100), Utc::now()).is_ok());
    }
}
