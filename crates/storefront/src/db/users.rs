//! User repository for database operations.
//!
//! Rows are read with runtime-checked queries and converted into the
//! [`User`] domain type.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use raze_core::{AuthProvider, Email, UserId};

use super::RepositoryError;
use crate::models::user::{NewUser, User};

const USER_COLUMNS: &str = "id, email, name, picture, auth_provider, gymnastics_type, gender, age, \
     first_order_discount_code, has_used_first_order_discount, order_count, raze_credits, \
     total_credits_earned, total_credits_redeemed, email_subscribed, needs_profile_completion, \
     created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    name: String,
    picture: Option<String>,
    auth_provider: AuthProvider,
    gymnastics_type: Option<String>,
    gender: Option<String>,
    age: Option<i32>,
    first_order_discount_code: Option<String>,
    has_used_first_order_discount: bool,
    order_count: i32,
    raze_credits: i32,
    total_credits_earned: i32,
    total_credits_redeemed: i32,
    email_subscribed: bool,
    needs_profile_completion: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: r.id,
            email,
            name: r.name,
            picture: r.picture,
            auth_provider: r.auth_provider,
            gymnastics_type: r.gymnastics_type,
            gender: r.gender,
            age: r.age,
            first_order_discount_code: r.first_order_discount_code,
            has_used_first_order_discount: r.has_used_first_order_discount,
            order_count: r.order_count,
            raze_credits: r.raze_credits,
            total_credits_earned: r.total_credits_earned,
            total_credits_redeemed: r.total_credits_redeemed,
            email_subscribed: r.email_subscribed,
            needs_profile_completion: r.needs_profile_completion,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user together with their password hash.
    ///
    /// The hash is `None` for accounts created through Google sign-in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, Option<String>)>, RepositoryError> {
        let Some(user) = self.get_by_email(email).await? else {
            return Ok(None);
        };

        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
                .bind(user.id)
                .fetch_one(self.pool)
                .await?;

        Ok(Some((user, hash)))
    }

    /// Create a new account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: &NewUser<'_>) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (email, name, password_hash, auth_provider, gymnastics_type, \
                 gender, age, first_order_discount_code, raze_credits, total_credits_earned, \
                 needs_profile_completion) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9, $10) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(new.email.as_str())
        .bind(new.name)
        .bind(new.password_hash)
        .bind(new.auth_provider)
        .bind(new.gymnastics_type)
        .bind(new.gender)
        .bind(new.age)
        .bind(new.first_order_discount_code)
        .bind(new.signup_credits)
        .bind(new.auth_provider == AuthProvider::Google && new.gymnastics_type.is_none())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique(e, "Email already registered"))?;

        User::try_from(row)
    }

    /// Set the gymnastics discipline and mark the profile complete.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn complete_profile(
        &self,
        id: UserId,
        gymnastics_type: &str,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET gymnastics_type = $2, needs_profile_completion = FALSE, \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(gymnastics_type)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        User::try_from(row)
    }

    /// Mark the first-order discount as used and count the order.
    ///
    /// Returns `false` if the discount had already been used.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn use_first_order_discount(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET has_used_first_order_discount = TRUE, \
                 order_count = order_count + 1, updated_at = NOW() \
             WHERE id = $1 AND NOT has_used_first_order_discount",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Spend credits if the balance covers them.
    ///
    /// Returns the remaining balance, or `None` if the balance was too low.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn spend_credits(
        &self,
        id: UserId,
        credits: i32,
    ) -> Result<Option<i32>, RepositoryError> {
        let remaining = sqlx::query_scalar(
            "UPDATE users SET raze_credits = raze_credits - $2, \
                 total_credits_redeemed = total_credits_redeemed + $2, updated_at = NOW() \
             WHERE id = $1 AND raze_credits >= $2 \
             RETURNING raze_credits",
        )
        .bind(id)
        .bind(credits)
        .fetch_optional(self.pool)
        .await?;

        Ok(remaining)
    }

    /// Give back credits spent by [`Self::spend_credits`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn refund_credits(&self, id: UserId, credits: i32) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE users SET raze_credits = raze_credits + $2, \
                 total_credits_redeemed = total_credits_redeemed - $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(credits)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Add earned credits to the account with this email.
    ///
    /// Returns `false` if no account uses the email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn award_credits(&self, email: &str, credits: i32) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET raze_credits = raze_credits + $2, \
                 total_credits_earned = total_credits_earned + $2, updated_at = NOW() \
             WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .bind(credits)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether the address has opted out of marketing email anywhere.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_unsubscribed(&self, email: &str) -> Result<bool, RepositoryError> {
        let unsubscribed: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users \
                     WHERE lower(email) = lower($1) AND NOT email_subscribed) \
                 OR EXISTS (SELECT 1 FROM email_subscriptions \
                     WHERE lower(email) = lower($1) AND NOT email_subscribed)",
        )
        .bind(email)
        .fetch_one(self.pool)
        .await?;

        Ok(unsubscribed)
    }

    /// Opt the address out of marketing email.
    ///
    /// Returns the number of account rows changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unsubscribe(&self, email: &str) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET email_subscribed = FALSE, updated_at = NOW() \
             WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Page through accounts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC OFFSET $1 LIMIT $2"
        ))
        .bind(offset)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    /// Total number of accounts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Accounts whose email or name contains `query`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, query: &str, limit: i64) -> Result<Vec<User>, RepositoryError> {
        let pattern = format!("%{}%", query.trim().to_lowercase());
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE lower(email) LIKE $1 OR lower(name) LIKE $1 \
             ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    /// Delete an account and its sessions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Spend an account's first-order code if `code` is that code and it is
/// still unused, counting the order.
///
/// Returns `false` when the code isn't the account's unused first-order code.
pub(super) async fn use_first_order_code(
    conn: &mut PgConnection,
    id: UserId,
    code: &str,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE users SET has_used_first_order_discount = TRUE, \
             order_count = order_count + 1, updated_at = NOW() \
         WHERE id = $1 AND NOT has_used_first_order_discount \
           AND upper(trim(first_order_discount_code)) = upper(trim($2))",
    )
    .bind(id)
    .bind(code)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
