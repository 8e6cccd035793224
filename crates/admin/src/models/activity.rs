//! Audit trail of admin actions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use raze_core::ActivityLogId;

/// Something a staff member did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Login,
    Logout,
    OrderUpdated,
    UserDeleted,
    SubscriberDeleted,
    InventoryUpdated,
    InventoryBulkUpdated,
    PromoCreated,
    PromoToggled,
    PromoDeleted,
    GiveawayWinnerSelected,
    NoteAdded,
    AbandonedCartsProcessed,
    ContactsExported,
    ContactsDeleted,
    EmailResent,
    BulkEmailSent,
    WebhookResolved,
    ShippingLabelCreated,
}

impl Action {
    /// Name stored in `activity_log.action`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Logout => "logout",
            Self::OrderUpdated => "order_updated",
            Self::UserDeleted => "user_deleted",
            Self::SubscriberDeleted => "subscriber_deleted",
            Self::InventoryUpdated => "inventory_updated",
            Self::InventoryBulkUpdated => "inventory_bulk_updated",
            Self::PromoCreated => "promo_created",
            Self::PromoToggled => "promo_toggled",
            Self::PromoDeleted => "promo_deleted",
            Self::GiveawayWinnerSelected => "giveaway_winner_selected",
            Self::NoteAdded => "note_added",
            Self::AbandonedCartsProcessed => "abandoned_carts_processed",
            Self::ContactsExported => "contacts_exported",
            Self::ContactsDeleted => "contacts_deleted",
            Self::EmailResent => "email_resent",
            Self::BulkEmailSent => "bulk_email_sent",
            Self::WebhookResolved => "webhook_resolved",
            Self::ShippingLabelCreated => "shipping_label_created",
        }
    }
}

/// A row of `admin.activity_log`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ActivityEntry {
    pub id: ActivityLogId,
    pub admin_email: String,
    pub action: String,
    pub target: Option<String>,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}
