//! Admin user domain types.
//!
//! These types represent validated domain objects for admin authentication.

use chrono::{DateTime, Utc};
use serde::Serialize;

use raze_core::{AdminUserId, Email};

// Re-export AdminRole from core for convenience
pub use raze_core::AdminRole;

/// An admin user (domain type).
///
/// The password hash never leaves the repository.
#[derive(Debug, Clone, Serialize)]
pub struct AdminUser {
    /// Unique admin user ID.
    pub id: AdminUserId,
    /// Admin's email address.
    pub email: Email,
    /// Admin's display name.
    pub name: String,
    /// Admin's role/permission level.
    pub role: AdminRole,
    /// Most recent successful sign-in.
    pub last_login_at: Option<DateTime<Utc>>,
    /// When the admin was created.
    pub created_at: DateTime<Utc>,
    /// When the admin was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new admin account.
#[derive(Debug, Clone)]
pub struct NewAdminUser<'a> {
    pub email: &'a Email,
    pub name: &'a str,
    pub role: AdminRole,
    pub password_hash: &'a str,
}
