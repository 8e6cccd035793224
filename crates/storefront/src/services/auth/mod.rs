//! Authentication service.
//!
//! Provides password authentication and opaque session tokens.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use rand::RngCore;
use sqlx::PgPool;

use raze_core::credits::{SIGNUP_BONUS_CREDITS, first_order_code};
use raze_core::{AuthProvider, Email};

use crate::db::RepositoryError;
use crate::db::sessions::SessionRepository;
use crate::db::users::UserRepository;
use crate::models::session::{CurrentUser, SESSION_DURATION_DAYS, Session};
use crate::models::user::{NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Bytes of randomness in a session token.
const TOKEN_BYTES: usize = 32;

/// Details collected by the signup form.
#[derive(Debug, Clone, Default)]
pub struct Registration<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub name: &'a str,
    pub gymnastics_type: Option<&'a str>,
    pub gender: Option<&'a str>,
    pub age: Option<i32>,
}

/// Authentication service.
///
/// Handles registration, login and session tokens.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    sessions: SessionRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
            sessions: SessionRepository::new(pool),
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new user and open a session for them.
    ///
    /// New accounts get the signup credit bonus and a personal first-order code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, form: &Registration<'_>) -> Result<(User, Session), AuthError> {
        let email = Email::parse(form.email)?;
        validate_password(form.password)?;
        let password_hash = hash_password(form.password)?;
        let code = first_order_code();

        let user = self
            .users
            .create(&NewUser {
                email: &email,
                name: form.name.trim(),
                password_hash: Some(&password_hash),
                auth_provider: AuthProvider::Email,
                gymnastics_type: form.gymnastics_type,
                gender: form.gender,
                age: form.age,
                first_order_discount_code: &code,
                signup_credits: SIGNUP_BONUS_CREDITS,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        let session = self.open_session(&user).await?;
        Ok((user, session))
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::UseGoogleLogin` if the account has no password.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, Session), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let Some(password_hash) = password_hash else {
            return Err(if user.auth_provider == AuthProvider::Google {
                AuthError::UseGoogleLogin
            } else {
                AuthError::InvalidCredentials
            });
        };

        verify_password(password, &password_hash)?;

        let session = self.open_session(&user).await?;
        Ok((user, session))
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Issue a fresh session token for a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the session cannot be stored.
    pub async fn open_session(&self, user: &User) -> Result<Session, AuthError> {
        let token = generate_token();
        let expires_at = Utc::now() + Duration::days(SESSION_DURATION_DAYS);
        let session = self.sessions.create(&token, user.id, expires_at).await?;
        Ok(session)
    }

    /// Resolve a session token to the signed-in user.
    ///
    /// Expired sessions are deleted as they are found.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthenticated` for unknown tokens.
    /// Returns `AuthError::SessionExpired` for expired tokens.
    pub async fn authenticate(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let session = self
            .sessions
            .get(token)
            .await?
            .ok_or(AuthError::NotAuthenticated)?;

        if session.is_expired(Utc::now()) {
            self.sessions.delete(token).await?;
            return Err(AuthError::SessionExpired);
        }

        let user = self
            .users
            .get_by_id(session.user_id)
            .await?
            .ok_or(AuthError::NotAuthenticated)?;

        Ok(CurrentUser {
            id: user.id,
            email: user.email,
            token: session.token,
        })
    }

    /// End a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the delete fails.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.delete(token).await?;
        Ok(())
    }
}

// =============================================================================
// Password Helpers
// =============================================================================

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::PasswordHash)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// A new URL-safe session token.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password_too_short() {
        let result = validate_password("short");
        assert!(matches!(result, Err(AuthError::WeakPassword(_))));
    }

    #[test]
    fn test_validate_password_minimum_length() {
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn test_hash_and_verify_password() {
        let password = "correct horse battery staple";
        let hash = hash_password(password).unwrap();

        assert!(verify_password(password, &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_tokens_are_unique_and_url_safe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }
}
