//! Checkout session types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use raze_core::cart::CartLine;
use raze_core::order::ShippingAddress;
use raze_core::{Money, OrderId, PaymentStatus, PendingOrderId};

/// An order waiting on payment.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PendingOrder {
    pub id: PendingOrderId,
    pub stripe_session_id: String,
    pub email: String,
    pub customer_name: String,
    #[sqlx(json)]
    pub items: Vec<CartLine>,
    #[sqlx(json)]
    pub shipping_address: ShippingAddress,
    pub subtotal: Money,
    pub discount: Money,
    pub discount_description: Option<String>,
    pub promo_code: Option<String>,
    pub total: Money,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new pending order.
#[derive(Debug, Clone)]
pub struct NewPendingOrder<'a> {
    pub stripe_session_id: &'a str,
    pub email: &'a str,
    pub customer_name: &'a str,
    pub items: &'a [CartLine],
    pub shipping_address: &'a ShippingAddress,
    pub subtotal: Money,
    pub discount: Money,
    pub discount_description: Option<&'a str>,
    pub promo_code: Option<&'a str>,
    pub total: Money,
}

/// Payment state recorded for a checkout session.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PaymentTransaction {
    pub id: i32,
    pub session_id: String,
    pub email: String,
    pub amount: Money,
    pub currency: String,
    pub status: PaymentStatus,
    /// Raw session status reported by the provider.
    pub provider_status: Option<String>,
    pub order_id: Option<OrderId>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
