//! Email subscription types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use raze_core::{Email, SubscriptionId, SubscriptionSource};

/// Default drop name for early-access signups.
pub const DEFAULT_DROP: &str = "Drop 01";

/// A stored email subscription.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub email: String,
    pub name: Option<String>,
    pub source: SubscriptionSource,
    #[serde(rename = "drop")]
    pub drop_name: String,
    pub product_id: Option<i32>,
    pub product_name: Option<String>,
    pub size: Option<String>,
    /// Giveaway entry reference such as `RAZE-1A2B3`.
    pub entry_id: Option<String>,
    pub email_subscribed: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new subscription.
#[derive(Debug, Clone)]
pub struct NewSubscription<'a> {
    pub email: &'a Email,
    pub name: Option<&'a str>,
    pub source: SubscriptionSource,
    pub drop_name: &'a str,
    pub product_id: Option<i32>,
    pub product_name: Option<&'a str>,
    pub size: Option<&'a str>,
    pub entry_id: Option<&'a str>,
}

/// Giveaway entry reference: `RAZE-` plus five uppercase hex characters.
#[must_use]
pub fn giveaway_entry_id() -> String {
    format!("RAZE-{}", raze_core::random_hex_upper(5))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_giveaway_entry_id_format() {
        let id = giveaway_entry_id();
        assert_eq!(id.len(), 10);
        assert!(id.starts_with("RAZE-"));
        assert!(
            id.chars()
                .skip(5)
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }
}
