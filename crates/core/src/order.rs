//! Order numbers, shipping details and tracking timelines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::random_hex_upper;
use crate::types::OrderStatus;

/// A fresh customer-facing order number such as `RAZE-1F2E3D4C`.
#[must_use]
pub fn order_number() -> String {
    format!("RAZE-{}", random_hex_upper(8))
}

/// Canonical form of a customer-entered order number.
#[must_use]
pub fn normalize_order_number(input: &str) -> String {
    input.trim().to_uppercase()
}

/// Where an order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "US".to_string()
}

impl ShippingAddress {
    /// `First Last`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// One step of the customer-facing tracking timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineStep {
    pub status: OrderStatus,
    pub label: &'static str,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

/// Timestamps that feed the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderDates {
    pub created_at: DateTime<Utc>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Build the four-step timeline: confirmed, processing, shipped, delivered.
///
/// The confirmed step is always complete once the order exists.
#[must_use]
pub fn timeline(status: OrderStatus, dates: OrderDates) -> Vec<TimelineStep> {
    let reached = |step: OrderStatus| match step {
        OrderStatus::Processing => matches!(
            status,
            OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::Delivered
        ),
        OrderStatus::Shipped => matches!(status, OrderStatus::Shipped | OrderStatus::Delivered),
        OrderStatus::Delivered => status == OrderStatus::Delivered,
        _ => true,
    };

    [
        (OrderStatus::Confirmed, Some(dates.created_at)),
        (OrderStatus::Processing, None),
        (OrderStatus::Shipped, dates.shipped_at),
        (OrderStatus::Delivered, dates.delivered_at),
    ]
    .into_iter()
    .map(|(step, date)| TimelineStep {
        status: step,
        label: step.label(),
        completed: reached(step),
        date,
    })
    .collect()
}

/// Side effects of moving an order into a new status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionEffects {
    pub set_shipped_at: bool,
    pub set_delivered_at: bool,
    pub award_credits: bool,
}

/// What must happen when an order moves to `next`.
///
/// Timestamps are only set the first time; credits are only awarded once.
#[must_use]
pub const fn transition_effects(
    next: OrderStatus,
    already_shipped: bool,
    already_delivered: bool,
    credits_awarded: bool,
) -> TransitionEffects {
    TransitionEffects {
        set_shipped_at: matches!(next, OrderStatus::Shipped) && !already_shipped,
        set_delivered_at: matches!(next, OrderStatus::Delivered) && !already_delivered,
        award_credits: matches!(next, OrderStatus::Delivered) && !credits_awarded,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dates() -> OrderDates {
        OrderDates {
            created_at: Utc::now(),
            shipped_at: None,
            delivered_at: None,
        }
    }

    #[test]
    fn test_order_number_shape() {
        let n = order_number();
        assert!(n.starts_with("RAZE-"));
        assert_eq!(n.len(), 13);
        assert_eq!(normalize_order_number(&n.to_lowercase()), n);
    }

    #[test]
    fn test_timeline_for_processing() {
        let steps = timeline(OrderStatus::Processing, dates());
        let completed: Vec<bool> = steps.iter().map(|s| s.completed).collect();
        assert_eq!(completed, vec![true, true, false, false]);
        assert_eq!(steps.first().unwrap().label, "Order Confirmed");
    }

    #[test]
    fn test_timeline_carries_dates() {
        let mut d = dates();
        d.shipped_at = Some(Utc::now());
        let steps = timeline(OrderStatus::Shipped, d);
        assert!(steps.get(2).unwrap().date.is_some());
        assert!(steps.get(3).unwrap().date.is_none());
        assert!(!steps.get(3).unwrap().completed);
    }

    #[test]
    fn test_cancelled_has_no_progress() {
        let steps = timeline(OrderStatus::Cancelled, dates());
        assert_eq!(steps.iter().filter(|s| s.completed).count(), 1);
    }

    #[test]
    fn test_transition_effects() {
        let shipped = transition_effects(OrderStatus::Shipped, false, false, false);
        assert!(shipped.set_shipped_at);
        assert!(!shipped.award_credits);

        let delivered = transition_effects(OrderStatus::Delivered, true, false, false);
        assert!(delivered.set_delivered_at);
        assert!(delivered.award_credits);

        let again = transition_effects(OrderStatus::Delivered, true, true, true);
        assert_eq!(again, TransitionEffects::default());
    }

    #[test]
    fn test_shipping_defaults_country() {
        let json = r#"{"first_name":"Sam","last_name":"Lee","email":"sam@example.com",
            "address_line1":"1 Main St","city":"Austin","state":"TX","postal_code":"78701"}"#;
        let address: ShippingAddress = serde_json::from_str(json).unwrap();
        assert_eq!(address.country, "US");
        assert_eq!(address.full_name(), "Sam Lee");
    }
}
