//! Abandoned cart types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use raze_core::abandoned_cart::ReminderState;
use raze_core::cart::CartLine;
use raze_core::{AbandonedCartId, Money, UserId};

/// A cart left without checking out.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AbandonedCart {
    pub id: AbandonedCartId,
    pub email: String,
    pub user_id: Option<UserId>,
    #[sqlx(json)]
    pub cart_items: Vec<CartLine>,
    pub cart_total: Money,
    pub abandoned_at: DateTime<Utc>,
    pub email_1_sent: bool,
    pub email_2_sent: bool,
    pub email_3_sent: bool,
    pub recovered: bool,
    pub recovered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AbandonedCart {
    /// Reminder progress.
    #[must_use]
    pub const fn reminder_state(&self) -> ReminderState {
        ReminderState {
            recovered: self.recovered,
            first_sent: self.email_1_sent,
            second_sent: self.email_2_sent,
            third_sent: self.email_3_sent,
        }
    }
}
