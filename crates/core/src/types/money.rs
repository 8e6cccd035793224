//! Decimal money amounts.
//!
//! All prices in the store are USD, so `Money` carries no currency code.
//! Arithmetic is exact; rounding to cents happens only at the edges
//! (quotes, discounts, stored totals).

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul, Sub};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A USD amount.
///
/// Serializes as a decimal string (e.g. `"55.00"`) and accepts either a
/// string or a JSON number when deserializing. Stored as `NUMERIC(10, 2)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero dollars.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Build an amount from whole cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// Build an amount from whole dollars.
    #[must_use]
    pub fn from_dollars(dollars: i64) -> Self {
        Self(Decimal::from(dollars))
    }

    /// The underlying decimal.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Round half away from zero to two decimal places.
    #[must_use]
    pub fn round_cents(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Whole cents, rounded. Used by payment providers that bill in cents.
    #[must_use]
    pub fn to_cents(self) -> i64 {
        let cents = self.round_cents().0 * Decimal::ONE_HUNDRED;
        i64::try_from(cents.trunc()).unwrap_or(i64::MAX)
    }

    /// Whole dollars, rounded down. Used for loyalty credit awards.
    #[must_use]
    pub fn whole_dollars(self) -> i64 {
        i64::try_from(self.0.floor()).unwrap_or(0)
    }

    /// Clamp negative amounts to zero.
    #[must_use]
    pub fn non_negative(self) -> Self {
        if self.0.is_sign_negative() {
            Self::ZERO
        } else {
            self
        }
    }

    /// Whether the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Display form, e.g. `$55.00`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("${:.2}", self.round_cents().0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self::Output {
        Self(self.0 * Decimal::from(rhs))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        Ok(Self(<Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        assert_eq!(Money::from_cents(5500).amount(), Decimal::new(5500, 2));
        assert_eq!(Money::from_cents(-125).amount(), Decimal::new(-125, 2));
    }

    #[test]
    fn test_round_cents_midpoint() {
        let m = Money::new(Decimal::new(10_005, 3));
        assert_eq!(m.round_cents(), Money::from_cents(1001));
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_dollars(55).display(), "$55.00");
        assert_eq!(Money::from_cents(1999).to_string(), "$19.99");
    }

    #[test]
    fn test_whole_dollars_floors() {
        assert_eq!(Money::from_cents(12_999).whole_dollars(), 129);
        assert_eq!(Money::ZERO.whole_dollars(), 0);
    }

    #[test]
    fn test_to_cents() {
        assert_eq!(Money::from_cents(4950).to_cents(), 4950);
        assert_eq!(Money::new(Decimal::new(10_005, 3)).to_cents(), 1001);
    }

    #[test]
    fn test_sum_and_non_negative() {
        let total: Money = [Money::from_dollars(10), Money::from_cents(250)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_cents(1250));
        assert_eq!((Money::from_dollars(5) - total).non_negative(), Money::ZERO);
    }

    #[test]
    fn test_deserialize_number_or_string() {
        let a: Money = serde_json::from_str("\"55.00\"").unwrap();
        let b: Money = serde_json::from_str("55").unwrap();
        assert_eq!(a, b);
    }
}
