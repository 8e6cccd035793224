//! Loyalty credits and first-order codes.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::promo::PromoRule;
use crate::random_hex_upper;
use crate::types::{DiscountType, Money};

/// Credits granted when an account is created.
pub const SIGNUP_BONUS_CREDITS: i32 = 10;

/// Days a redeemed credit code stays valid.
pub const REDEMPTION_VALID_DAYS: i64 = 30;

/// Percentage off granted by a first-order code.
pub const FIRST_ORDER_PERCENT: u32 = 10;

/// A redeemable credit tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreditTier {
    pub credits: i32,
    pub discount: Money,
}

impl CreditTier {
    /// Label such as `$15 off`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("${} off", self.discount.amount().trunc())
    }
}

/// Tiers in ascending order of cost.
#[must_use]
pub fn tiers() -> [CreditTier; 3] {
    [
        CreditTier {
            credits: 100,
            discount: Money::from_dollars(5),
        },
        CreditTier {
            credits: 200,
            discount: Money::from_dollars(15),
        },
        CreditTier {
            credits: 300,
            discount: Money::from_dollars(25),
        },
    ]
}

/// Tier with exactly this credit cost.
#[must_use]
pub fn tier_for(credits: i32) -> Option<CreditTier> {
    tiers().into_iter().find(|t| t.credits == credits)
}

/// Tiers the balance can pay for.
#[must_use]
pub fn available_tiers(balance: i32) -> Vec<CreditTier> {
    tiers()
        .into_iter()
        .filter(|t| t.credits <= balance)
        .collect()
}

/// The cheapest tier still out of reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NextTier {
    #[serde(flatten)]
    pub tier: CreditTier,
    pub credits_needed: i32,
}

/// Next tier above the balance, if any.
#[must_use]
pub fn next_tier(balance: i32) -> Option<NextTier> {
    tiers()
        .into_iter()
        .find(|t| t.credits > balance)
        .map(|tier| NextTier {
            tier,
            credits_needed: tier.credits - balance,
        })
}

/// Credits earned for a delivered order: one per whole dollar.
#[must_use]
pub fn credits_for_order(total: Money) -> i32 {
    i32::try_from(total.whole_dollars().max(0)).unwrap_or(i32::MAX)
}

/// Build the single-use fixed promo code issued when a tier is redeemed.
///
/// The minimum order is one dollar above the discount so the code can't
/// zero out an order.
#[must_use]
pub fn redemption_code(tier: CreditTier, now: DateTime<Utc>) -> PromoRule {
    PromoRule {
        code: format!("RAZE{}-{}", tier.credits, random_hex_upper(6)),
        discount_type: DiscountType::Fixed,
        discount_value: tier.discount.amount(),
        min_order: tier.discount + Money::from_dollars(1),
        max_uses: Some(1),
        current_uses: 0,
        is_active: true,
        expires_at: Some(now + Duration::days(REDEMPTION_VALID_DAYS)),
        description: Some(format!("RAZE Credits Redemption - {}", tier.label())),
    }
}

/// A fresh first-order code such as `WELCOME3FA9C1`.
#[must_use]
pub fn first_order_code() -> String {
    format!("WELCOME{}", random_hex_upper(6))
}

/// Whether a customer-entered code matches their first-order code.
#[must_use]
pub fn first_order_code_matches(issued: &str, entered: &str) -> bool {
    issued.trim().eq_ignore_ascii_case(entered.trim())
}

/// The first-order discount as a percentage decimal.
#[must_use]
pub fn first_order_percent() -> Decimal {
    Decimal::from(FIRST_ORDER_PERCENT)
}

/// Promo rule for an account's own first-order code.
///
/// It is never stored in `promo_codes`; single use is tracked on the account.
#[must_use]
pub fn first_order_rule(issued: &str) -> PromoRule {
    PromoRule {
        code: issued.trim().to_uppercase(),
        discount_type: DiscountType::Percentage,
        discount_value: first_order_percent(),
        min_order: Money::ZERO,
        max_uses: Some(1),
        current_uses: 0,
        is_active: true,
        expires_at: None,
        description: Some("First order discount".to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_available_and_next_tiers() {
        assert!(available_tiers(99).is_empty());
        assert_eq!(available_tiers(250).len(), 2);

        let next = next_tier(150).unwrap();
        assert_eq!(next.tier.credits, 200);
        assert_eq!(next.credits_needed, 50);
        assert!(next_tier(300).is_none());
    }

    #[test]
    fn test_tier_labels() {
        let labels: Vec<String> = tiers().iter().map(CreditTier::label).collect();
        assert_eq!(labels, vec!["$5 off", "$15 off", "$25 off"]);
    }

    #[test]
    fn test_credits_for_order_floors() {
        assert_eq!(credits_for_order(Money::from_cents(10_999)), 109);
        assert_eq!(credits_for_order(Money::ZERO), 0);
    }

    #[test]
    fn test_redemption_code_shape() {
        let now = Utc::now();
        let promo = redemption_code(tier_for(200).unwrap(), now);
        assert!(promo.code.starts_with("RAZE200-"));
        assert_eq!(promo.code.len(), "RAZE200-".len() + 6);
        assert_eq!(promo.min_order, Money::from_dollars(16));
        assert_eq!(promo.max_uses, Some(1));
        assert_eq!(promo.expires_at, Some(now + Duration::days(30)));
    }

    #[test]
    fn test_first_order_code() {
        let code = first_order_code();
        assert!(code.starts_with("WELCOME"));
        assert_eq!(code.len(), 13);
        assert!(first_order_code_matches(&code, &code.to_lowercase()));
        assert!(!first_order_code_matches(&code, "WELCOME10"));
    }

    #[test]
    fn test_first_order_rule_is_ten_percent() {
        let rule = first_order_rule(" welcome3fa9c1 ");
        assert_eq!(rule.code, "WELCOME3FA9C1");
        let applied = rule.evaluate(Money::from_dollars(80), Utc::now()).unwrap();
        assert_eq!(applied.amount, Money::from_dollars(8));
        assert_eq!(applied.display, "10% off");
    }
}
