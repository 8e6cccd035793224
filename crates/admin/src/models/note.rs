//! Staff notes on contacts.

use chrono::{DateTime, Utc};
use serde::Serialize;

use raze_core::AdminNoteId;

/// A note attached to a contact's email address.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ContactNote {
    pub id: AdminNoteId,
    pub email: String,
    pub note: String,
    /// Staff member who wrote it.
    pub author_email: String,
    pub created_at: DateTime<Utc>,
}
