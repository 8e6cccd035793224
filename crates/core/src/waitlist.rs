//! Waitlist sizes, access codes and public counters.
//!
//! A waitlist entry is keyed by (email, product, variant). Size requests
//! for the same key accumulate rather than creating a second entry.

use serde::{Deserialize, Serialize};

use crate::random_hex_upper;

/// Default number of waitlist spots.
pub const DEFAULT_WAITLIST_LIMIT: i64 = 100;

/// Offset added to the real count on the public counter.
pub const DISPLAY_COUNT_BASE: i64 = 2847;

/// One requested size with a unit count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeSelection {
    pub size: String,
    pub quantity: u32,
}

/// Requested sizes in first-requested order, one entry per size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SizeSelections(Vec<SizeSelection>);

impl SizeSelections {
    /// Build from a list, combining repeated sizes.
    #[must_use]
    pub fn from_selections(selections: impl IntoIterator<Item = SizeSelection>) -> Self {
        let mut sizes = Self::default();
        for sel in selections {
            sizes.add(&sel.size, sel.quantity);
        }
        sizes
    }

    /// Parse the compact form `"M (Men's) x2, L x1"`.
    ///
    /// Parts without a count are a single unit; an unreadable count is
    /// treated as one unit as well.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let mut sizes = Self::default();
        for part in s.split(", ") {
            let (size, quantity) = match part.rsplit_once(" x") {
                Some((size, qty)) => (size, qty.trim().parse::<u32>().unwrap_or(1)),
                None => (part, 1),
            };
            let size = size.trim();
            if !size.is_empty() {
                sizes.add(size, quantity);
            }
        }
        sizes
    }

    fn add(&mut self, size: &str, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.0.iter_mut().find(|sel| sel.size == size) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(quantity),
            None => self.0.push(SizeSelection {
                size: size.to_string(),
                quantity,
            }),
        }
    }

    /// Add another request's sizes on top of these.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for sel in &other.0 {
            merged.add(&sel.size, sel.quantity);
        }
        merged
    }

    /// Whether no sizes were requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total units across sizes.
    #[must_use]
    pub fn total_units(&self) -> u32 {
        self.0.iter().map(|sel| sel.quantity).sum()
    }

    /// Selections in order.
    #[must_use]
    pub fn as_slice(&self) -> &[SizeSelection] {
        &self.0
    }

    /// Compact form, e.g. `S x1, M x2`.
    #[must_use]
    pub fn to_compact(&self) -> String {
        self.0
            .iter()
            .map(|sel| format!("{} x{}", sel.size, sel.quantity))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Notification form, e.g. `M - 1 item, L - 2 items`.
    #[must_use]
    pub fn to_display(&self) -> String {
        self.0
            .iter()
            .map(|sel| {
                let noun = if sel.quantity == 1 { "item" } else { "items" };
                format!("{} - {} {noun}", sel.size, sel.quantity)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A fresh purchase access code such as `RAZE-9F1C20AB`.
#[must_use]
pub fn access_code() -> String {
    format!("RAZE-{}", random_hex_upper(8))
}

/// Spots summary for the waitlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WaitlistStatus {
    pub total_spots: i64,
    pub spots_taken: i64,
    pub spots_remaining: i64,
    pub is_full: bool,
}

impl WaitlistStatus {
    #[must_use]
    pub fn new(limit: i64, taken: i64) -> Self {
        let remaining = (limit - taken).max(0);
        Self {
            total_spots: limit,
            spots_taken: taken,
            spots_remaining: remaining,
            is_full: remaining == 0,
        }
    }
}

/// Public counter shown on the landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PublicCounter {
    pub total_waitlist: i64,
    pub progress: i64,
}

impl PublicCounter {
    /// Counter derived from the real number of entries.
    #[must_use]
    pub fn from_total(total: i64) -> Self {
        Self {
            total_waitlist: total + DISPLAY_COUNT_BASE,
            progress: (65 + total.saturating_mul(2)).min(95),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sel(size: &str, quantity: u32) -> SizeSelection {
        SizeSelection {
            size: size.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_parse_compact_with_counts() {
        let sizes = SizeSelections::parse("M (Men's) x2, L x1");
        assert_eq!(sizes.as_slice(), &[sel("M (Men's)", 2), sel("L", 1)]);
        assert_eq!(sizes.total_units(), 3);
    }

    #[test]
    fn test_parse_legacy_without_counts() {
        let sizes = SizeSelections::parse("M");
        assert_eq!(sizes.as_slice(), &[sel("M", 1)]);
        assert!(SizeSelections::parse("").is_empty());
    }

    #[test]
    fn test_parse_bad_count_is_one() {
        let sizes = SizeSelections::parse("XL xmany");
        assert_eq!(sizes.as_slice(), &[sel("XL", 1)]);
    }

    #[test]
    fn test_merge_sums_and_keeps_order() {
        let existing = SizeSelections::parse("S x1, M x1");
        let new = SizeSelections::from_selections([sel("L", 2), sel("M", 1)]);
        let merged = existing.merge(&new);
        assert_eq!(merged.to_compact(), "S x1, M x2, L x2");
    }

    #[test]
    fn test_from_selections_combines_repeats() {
        let sizes = SizeSelections::from_selections([sel("M", 1), sel("M", 2), sel("S", 0)]);
        assert_eq!(sizes.as_slice(), &[sel("M", 3)]);
    }

    #[test]
    fn test_display_pluralizes() {
        let sizes = SizeSelections::parse("M x1, L x2");
        assert_eq!(sizes.to_display(), "M - 1 item, L - 2 items");
    }

    #[test]
    fn test_access_code_shape() {
        let code = access_code();
        assert!(code.starts_with("RAZE-"));
        assert_eq!(code.len(), 13);
        assert_eq!(code, code.to_uppercase());
    }

    #[test]
    fn test_status_and_counter() {
        let status = WaitlistStatus::new(100, 100);
        assert!(status.is_full);
        assert_eq!(status.spots_remaining, 0);
        assert_eq!(WaitlistStatus::new(100, 120).spots_remaining, 0);

        let counter = PublicCounter::from_total(5);
        assert_eq!(counter.total_waitlist, 2852);
        assert_eq!(counter.progress, 75);
        assert_eq!(PublicCounter::from_total(40).progress, 95);
    }
}
