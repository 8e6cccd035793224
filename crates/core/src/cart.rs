//! Cart arithmetic.
//!
//! A cart total is always the sum of `unit_price × quantity` over its lines.
//! Discounts are applied to that subtotal and the result never goes below zero.
//! Prices sent with a cart are only a display hint: [`price_lines`] replaces
//! them with catalog prices before anything is totalled.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::promo::AppliedDiscount;
use crate::types::Money;

/// Largest quantity accepted for a single cart line.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Errors raised while validating a cart.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    /// The cart has no lines.
    #[error("Cart is empty")]
    Empty,

    /// A line has a quantity of zero or above the limit.
    #[error("Invalid quantity {quantity} for {name}")]
    InvalidQuantity {
        /// Product name of the offending line.
        name: String,
        /// Requested quantity.
        quantity: u32,
    },

    /// A line has a negative unit price.
    #[error("Invalid price for {0}")]
    InvalidPrice(String),

    /// A line names a product that is not for sale.
    #[error("Product {0} is not available")]
    UnknownProduct(i32),

    /// A line names a color or size the product doesn't come in.
    #[error("{name} is not available in {color} / {size}")]
    UnknownVariant {
        name: String,
        color: String,
        size: String,
    },
}

/// One product variant in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: i32,
    #[serde(alias = "product_name", default)]
    pub name: String,
    pub color: String,
    pub size: String,
    #[serde(alias = "price", default)]
    pub unit_price: Money,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CartLine {
    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// Sum of all line totals.
#[must_use]
pub fn subtotal(lines: &[CartLine]) -> Money {
    lines.iter().map(CartLine::line_total).sum()
}

/// Total number of units across all lines.
#[must_use]
pub fn item_count(lines: &[CartLine]) -> u32 {
    lines.iter().map(|line| line.quantity).sum()
}

/// Reject empty carts, zero or oversized quantities, and negative prices.
///
/// # Errors
///
/// Returns the first problem found.
pub fn validate(lines: &[CartLine]) -> Result<(), CartError> {
    if lines.is_empty() {
        return Err(CartError::Empty);
    }

    for line in lines {
        if line.quantity == 0 || line.quantity > MAX_LINE_QUANTITY {
            return Err(CartError::InvalidQuantity {
                name: line.name.clone(),
                quantity: line.quantity,
            });
        }
        if line.unit_price < Money::ZERO {
            return Err(CartError::InvalidPrice(line.name.clone()));
        }
    }

    Ok(())
}

/// What the catalog says about a product a cart line refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedProduct {
    pub name: String,
    pub price: Money,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub image: Option<String>,
}

impl ListedProduct {
    /// The catalog spelling of `color`/`size`, if the product comes in it.
    ///
    /// An empty option list accepts anything as given.
    fn variant(&self, color: &str, size: &str) -> Option<(String, String)> {
        fn pick(options: &[String], wanted: &str) -> Option<String> {
            let wanted = wanted.trim();
            if options.is_empty() {
                return Some(wanted.to_string());
            }
            options
                .iter()
                .find(|o| o.eq_ignore_ascii_case(wanted))
                .cloned()
        }
        Some((pick(&self.colors, color)?, pick(&self.sizes, size)?))
    }
}

/// Rebuild cart lines from the catalog.
///
/// Each line keeps its product id and quantity; name, unit price and
/// variant spelling come from `lookup`. A client-supplied image is kept
/// when the catalog has none.
///
/// # Errors
///
/// Returns [`CartError::UnknownProduct`] when `lookup` has no product for a
/// line, and [`CartError::UnknownVariant`] for a color or size it isn't
/// sold in.
pub fn price_lines<'a, F>(lines: &[CartLine], lookup: F) -> Result<Vec<CartLine>, CartError>
where
    F: Fn(i32) -> Option<&'a ListedProduct>,
{
    lines
        .iter()
        .map(|line| {
            let listed = lookup(line.product_id).ok_or(CartError::UnknownProduct(line.product_id))?;
            let (color, size) =
                listed
                    .variant(&line.color, &line.size)
                    .ok_or_else(|| CartError::UnknownVariant {
                        name: listed.name.clone(),
                        color: line.color.clone(),
                        size: line.size.clone(),
                    })?;
            Ok(CartLine {
                product_id: line.product_id,
                name: listed.name.clone(),
                color,
                size,
                unit_price: listed.price,
                quantity: line.quantity,
                image: listed.image.clone().or_else(|| line.image.clone()),
            })
        })
        .collect()
}

/// Priced summary of a cart with any discounts applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartQuote {
    pub item_count: u32,
    pub subtotal: Money,
    pub promo_code: Option<String>,
    pub discount_display: Option<String>,
    pub promo_discount: Money,
    pub credit_discount: Money,
    pub total: Money,
}

impl CartQuote {
    /// Price a cart.
    ///
    /// The credit discount is capped at whatever remains after the promo
    /// discount, so the total is never negative.
    #[must_use]
    pub fn build(
        lines: &[CartLine],
        promo: Option<&AppliedDiscount>,
        credit_discount: Money,
    ) -> Self {
        let subtotal = subtotal(lines).round_cents();
        let promo_discount = promo
            .map_or(Money::ZERO, |d| d.amount)
            .min(subtotal)
            .non_negative();
        let remaining = subtotal - promo_discount;
        let credit_discount = credit_discount.non_negative().min(remaining);

        Self {
            item_count: item_count(lines),
            subtotal,
            promo_code: promo.map(|d| d.code.clone()),
            discount_display: promo.map(|d| d.display.clone()),
            promo_discount,
            credit_discount,
            total: (remaining - credit_discount).non_negative().round_cents(),
        }
    }

    /// Total of all discounts applied.
    #[must_use]
    pub fn discount_total(&self) -> Money {
        self.promo_discount + self.credit_discount
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::DiscountType;

    fn line(name: &str, cents: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: 1,
            name: name.to_string(),
            color: "Black".to_string(),
            size: "M".to_string(),
            unit_price: Money::from_cents(cents),
            quantity,
            image: None,
        }
    }

    fn discount(amount_cents: i64) -> AppliedDiscount {
        AppliedDiscount {
            code: "WELCOME10".to_string(),
            discount_type: DiscountType::Percentage,
            discount_value: Money::from_dollars(10).amount(),
            amount: Money::from_cents(amount_cents),
            display: "10% off".to_string(),
            min_order: Money::ZERO,
        }
    }

    #[test]
    fn test_total_is_sum_of_price_times_quantity() {
        let lines = vec![line("Tee", 5500, 2), line("Shorts", 4250, 1)];
        assert_eq!(subtotal(&lines), Money::from_cents(15_250));
        assert_eq!(item_count(&lines), 3);
    }

    #[test]
    fn test_empty_cart_subtotal_is_zero() {
        assert_eq!(subtotal(&[]), Money::ZERO);
        assert_eq!(validate(&[]), Err(CartError::Empty));
    }

    #[test]
    fn test_validate_quantity_bounds() {
        assert!(matches!(
            validate(&[line("Tee", 5500, 0)]),
            Err(CartError::InvalidQuantity { quantity: 0, .. })
        ));
        assert!(matches!(
            validate(&[line("Tee", 5500, 100)]),
            Err(CartError::InvalidQuantity { quantity: 100, .. })
        ));
        assert!(validate(&[line("Tee", 5500, 99)]).is_ok());
    }

    #[test]
    fn test_validate_negative_price() {
        assert_eq!(
            validate(&[line("Tee", -1, 1)]),
            Err(CartError::InvalidPrice("Tee".to_string()))
        );
    }

    #[test]
    fn test_quote_applies_promo_then_credits() {
        let lines = vec![line("Tee", 5500, 2)];
        let quote = CartQuote::build(&lines, Some(&discount(1100)), Money::from_dollars(5));
        assert_eq!(quote.subtotal, Money::from_dollars(110));
        assert_eq!(quote.promo_discount, Money::from_dollars(11));
        assert_eq!(quote.credit_discount, Money::from_dollars(5));
        assert_eq!(quote.total, Money::from_dollars(94));
        assert_eq!(quote.discount_total(), Money::from_dollars(16));
        assert_eq!(quote.promo_code.as_deref(), Some("WELCOME10"));
    }

    #[test]
    fn test_quote_never_negative() {
        let lines = vec![line("Socks", 500, 1)];
        let quote = CartQuote::build(&lines, Some(&discount(400)), Money::from_dollars(25));
        assert_eq!(quote.credit_discount, Money::from_dollars(1));
        assert_eq!(quote.total, Money::ZERO);
    }

    fn tee() -> ListedProduct {
        ListedProduct {
            name: "Performance T-Shirt".to_string(),
            price: Money::from_dollars(55),
            colors: vec!["Black".to_string(), "White".to_string()],
            sizes: vec!["S".to_string(), "M".to_string()],
            image: Some("/images/products/performance-tee-black.webp".to_string()),
        }
    }

    #[test]
    fn test_catalog_price_replaces_sent_price() {
        let listed = tee();
        let sent = vec![line("Cheap tee", 1, 2)];

        let priced = price_lines(&sent, |id| (id == 1).then_some(&listed)).unwrap();
        assert_eq!(priced[0].unit_price, Money::from_dollars(55));
        assert_eq!(priced[0].name, "Performance T-Shirt");
        assert_eq!(subtotal(&priced), Money::from_dollars(110));
        assert_eq!(CartQuote::build(&priced, None, Money::ZERO).total, Money::from_dollars(110));
    }

    #[test]
    fn test_price_lines_normalizes_variant_spelling() {
        let listed = tee();
        let mut sent = line("Tee", 0, 1);
        sent.color = "black".to_string();
        sent.size = " m ".to_string();

        let priced = price_lines(&[sent], |_| Some(&listed)).unwrap();
        assert_eq!((priced[0].color.as_str(), priced[0].size.as_str()), ("Black", "M"));
    }

    #[test]
    fn test_price_lines_rejects_unknown_product_and_variant() {
        let listed = tee();
        assert_eq!(
            price_lines(&[line("Tee", 5500, 1)], |_| None),
            Err(CartError::UnknownProduct(1))
        );

        let mut sent = line("Tee", 5500, 1);
        sent.size = "XXL".to_string();
        assert!(matches!(
            price_lines(&[sent], |_| Some(&listed)),
            Err(CartError::UnknownVariant { size, .. }) if size == "XXL"
        ));
    }

    #[test]
    fn test_line_price_is_optional() {
        let json = r#"{"product_id":1,"name":"Tee","color":"Black","size":"M","quantity":2}"#;
        let parsed: CartLine = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.unit_price, Money::ZERO);
    }

    #[test]
    fn test_line_accepts_price_alias() {
        let json = r#"{"product_id":1,"name":"Tee","color":"Black","size":"M","price":55,"quantity":2}"#;
        let parsed: CartLine = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.line_total(), Money::from_dollars(110));
    }
}
