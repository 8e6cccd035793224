//! Queries that span accounts, signups and the waitlist.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::RepositoryError;

/// Who a bulk email goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    All,
    Subscribers,
    Users,
    Waitlist,
    EarlyAccess,
}

impl Audience {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Subscribers => "subscribers",
            Self::Users => "users",
            Self::Waitlist => "waitlist",
            Self::EarlyAccess => "early_access",
        }
    }

    const fn sql(self) -> &'static str {
        match self {
            Self::All => {
                "SELECT lower(email) FROM users WHERE email_subscribed \
                 UNION SELECT lower(email) FROM email_subscriptions WHERE email_subscribed \
                 UNION SELECT lower(email) FROM waitlist WHERE email_subscribed"
            }
            Self::Subscribers => {
                "SELECT lower(email) FROM email_subscriptions WHERE email_subscribed"
            }
            Self::Users => "SELECT lower(email) FROM users WHERE email_subscribed",
            Self::Waitlist => "SELECT lower(email) FROM waitlist WHERE email_subscribed",
            Self::EarlyAccess => {
                "SELECT lower(email) FROM email_subscriptions \
                 WHERE email_subscribed AND source = 'early_access'"
            }
        }
    }
}

/// Rows removed for a set of addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletedContacts {
    pub users: u64,
    pub subscriptions: u64,
    pub waitlist: u64,
}

impl DeletedContacts {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.users + self.subscriptions + self.waitlist
    }
}

/// Repository for whole-contact operations.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Distinct lowercased addresses in `audience` that still accept email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recipients(&self, audience: Audience) -> Result<Vec<String>, RepositoryError> {
        let emails = sqlx::query_scalar(&format!(
            "SELECT DISTINCT email FROM ({}) AS audience(email) ORDER BY email",
            audience.sql()
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(emails)
    }

    /// Remove accounts, subscriptions and waitlist entries for `emails`.
    ///
    /// Runs in one transaction; addresses match case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a delete fails.
    pub async fn delete(&self, emails: &[String]) -> Result<DeletedContacts, RepositoryError> {
        let emails: Vec<String> = emails.iter().map(|e| e.trim().to_lowercase()).collect();
        let mut tx = self.pool.begin().await?;

        let users = sqlx::query("DELETE FROM users WHERE lower(email) = ANY($1)")
            .bind(&emails)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let subscriptions =
            sqlx::query("DELETE FROM email_subscriptions WHERE lower(email) = ANY($1)")
                .bind(&emails)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        let waitlist = sqlx::query("DELETE FROM waitlist WHERE lower(email) = ANY($1)")
            .bind(&emails)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(DeletedContacts {
            users,
            subscriptions,
            waitlist,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audience_names() {
        let parsed: Audience = serde_json::from_str("\"early_access\"").unwrap_or(Audience::All);
        assert_eq!(parsed, Audience::EarlyAccess);
        assert_eq!(Audience::Subscribers.as_str(), "subscribers");
    }

    #[test]
    fn test_deleted_total() {
        let deleted = DeletedContacts {
            users: 1,
            subscriptions: 2,
            waitlist: 3,
        };
        assert_eq!(deleted.total(), 6);
    }
}
