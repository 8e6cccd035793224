//! Order types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use raze_core::cart::CartLine;
use raze_core::order::{OrderDates, ShippingAddress, TimelineStep, timeline};
use raze_core::{Money, OrderId, OrderStatus, UserId};

/// A placed order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: Option<UserId>,
    pub email: String,
    pub customer_name: String,
    #[sqlx(json)]
    pub items: Vec<CartLine>,
    pub subtotal: Money,
    pub discount: Money,
    pub discount_description: Option<String>,
    pub promo_code: Option<String>,
    pub shipping_cost: Money,
    pub total: Money,
    pub status: OrderStatus,
    #[sqlx(json)]
    pub shipping_address: ShippingAddress,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub label_url: Option<String>,
    pub notes: Option<String>,
    pub estimated_delivery: Option<String>,
    #[serde(skip_serializing)]
    pub stripe_session_id: Option<String>,
    pub credits_awarded: bool,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Customer-facing tracking timeline.
    #[must_use]
    pub fn timeline(&self) -> Vec<TimelineStep> {
        timeline(
            self.status,
            OrderDates {
                created_at: self.created_at,
                shipped_at: self.shipped_at,
                delivered_at: self.delivered_at,
            },
        )
    }
}

/// Fields for a new order.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub order_number: &'a str,
    pub user_id: Option<UserId>,
    pub email: &'a str,
    pub customer_name: &'a str,
    pub items: &'a [CartLine],
    pub subtotal: Money,
    pub discount: Money,
    pub discount_description: Option<&'a str>,
    pub promo_code: Option<&'a str>,
    pub shipping_cost: Money,
    pub total: Money,
    pub status: OrderStatus,
    pub shipping_address: &'a ShippingAddress,
    pub stripe_session_id: Option<&'a str>,
}

/// Admin changes to an order. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderUpdate {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub carrier: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub estimated_delivery: Option<String>,
}

/// Order count for one status.
#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}
