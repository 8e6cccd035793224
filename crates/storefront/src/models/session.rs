//! Session-related types.
//!
//! Customers authenticate with an opaque token stored in `user_sessions`.
//! The token travels as a cookie for the browser and as a header for
//! API clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use raze_core::{Email, UserId};

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session_token";

/// Header alternative to the cookie.
pub const SESSION_HEADER: &str = "x-session-token";

/// Session lifetime in days.
pub const SESSION_DURATION_DAYS: i64 = 7;

/// A stored session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is past its expiry at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Authenticated identity attached to a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Token the request authenticated with.
    #[serde(skip)]
    pub token: String,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = Session {
            token: "t".to_string(),
            user_id: UserId::new(1),
            expires_at: now + Duration::days(SESSION_DURATION_DAYS),
            created_at: now,
        };
        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + Duration::days(8)));
    }
}
