//! Waitlist entry types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use raze_core::waitlist::SizeSelections;
use raze_core::{Email, WaitlistEntryId};

/// A stored waitlist entry, unique per (email, product, variant).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WaitlistEntry {
    pub id: WaitlistEntryId,
    pub email: String,
    pub name: Option<String>,
    pub product_id: i32,
    pub product_name: String,
    pub variant: String,
    #[sqlx(json)]
    pub sizes: SizeSelections,
    pub image: Option<String>,
    pub access_code: String,
    pub position: i32,
    pub has_purchased: bool,
    pub email_subscribed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new entry.
#[derive(Debug, Clone)]
pub struct NewWaitlistEntry<'a> {
    pub email: &'a Email,
    pub name: Option<&'a str>,
    pub product_id: i32,
    pub product_name: &'a str,
    pub variant: &'a str,
    pub sizes: &'a SizeSelections,
    pub image: Option<&'a str>,
    pub access_code: &'a str,
}
