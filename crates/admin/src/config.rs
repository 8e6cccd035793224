//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string for staff accounts and sessions
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for shop data
//! - `ADMIN_BASE_URL` - Public URL for the admin panel
//! - `ADMIN_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `ADMIN_ALLOWED_EMAILS` - Comma-separated staff emails allowed to sign in
//!   (unset means any account in the admin database)
//! - `STOREFRONT_BASE_URL` - Shop URL used for image links in notifications
//! - `WEBHOOK_*_URL` - Notification hooks, shared with the storefront
//! - `SHIPPO_API_KEY`, `SHIPPO_API_BASE` - Shipping labels, shared with the storefront
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};

pub use raze_storefront::config::{ConfigError, SentryConfig, ShippoConfig, WebhookConfig};

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Admin `PostgreSQL` URL (contains password)
    pub database_url: SecretString,
    /// Storefront `PostgreSQL` URL (contains password)
    pub storefront_database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the admin panel
    pub base_url: String,
    /// Public shop URL for notification payloads
    pub storefront_base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Lowercased emails allowed to sign in; empty allows every admin account
    pub allowed_emails: Vec<String>,
    /// Outbound notification hooks
    pub webhooks: WebhookConfig,
    /// Shipping label settings, if labels can be bought
    pub shippo: Option<ShippoConfig>,
    /// Sentry error tracking settings
    pub sentry: SentryConfig,
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_required_secret("ADMIN_DATABASE_URL")?;
        let storefront_database_url = get_required_secret("STOREFRONT_DATABASE_URL")?;
        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("ADMIN_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("ADMIN_BASE_URL")?;
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_BASE_URL".to_string(), e.to_string()))?;
        let storefront_base_url =
            get_env_or_default("STOREFRONT_BASE_URL", "https://razetraining.com");
        let session_secret = get_validated_secret("ADMIN_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "ADMIN_SESSION_SECRET")?;
        let allowed_emails = get_optional_env("ADMIN_ALLOWED_EMAILS")
            .map(|v| parse_email_list(&v))
            .unwrap_or_default();

        Ok(Self {
            database_url,
            storefront_database_url,
            host,
            port,
            base_url,
            storefront_base_url,
            session_secret,
            allowed_emails,
            webhooks: WebhookConfig::from_env()?,
            shippo: ShippoConfig::from_env()?,
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies need the `Secure` flag.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Whether `email` may sign in. An empty allowlist admits every account.
    #[must_use]
    pub fn is_allowed_email(&self, email: &str) -> bool {
        if self.allowed_emails.is_empty() {
            return true;
        }
        let email = email.trim().to_lowercase();
        self.allowed_emails.iter().any(|e| *e == email)
    }

    /// Whether `email` is named in the allowlist.
    #[must_use]
    pub fn is_staff_email(&self, email: &str) -> bool {
        !self.allowed_emails.is_empty() && self.is_allowed_email(email)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional, non-empty environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Split a comma-separated list of emails, lowercased.
fn parse_email_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(allowed_emails: Vec<String>) -> AdminConfig {
        AdminConfig {
            database_url: SecretString::from("postgres://localhost/admin"),
            storefront_database_url: SecretString::from("postgres://localhost/storefront"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            base_url: "http://localhost:3001".to_string(),
            storefront_base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            allowed_emails,
            webhooks: WebhookConfig::default(),
            shippo: None,
            sentry: SentryConfig::default(),
        }
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("changeme-session-key", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let addr = config(Vec::new()).socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3001);
    }

    #[test]
    fn test_empty_allowlist_admits_everyone() {
        assert!(config(Vec::new()).is_allowed_email("anyone@razetraining.com"));
    }

    #[test]
    fn test_allowlist_is_case_insensitive() {
        let config = config(parse_email_list(" Coach@RazeTraining.com ,ops@razetraining.com"));
        assert!(config.is_allowed_email("coach@razetraining.com"));
        assert!(config.is_allowed_email("OPS@razetraining.com "));
        assert!(!config.is_allowed_email("someone@else.com"));
    }

    #[test]
    fn test_staff_email_needs_a_listing() {
        assert!(!config(Vec::new()).is_staff_email("anyone@razetraining.com"));
        let config = config(vec!["coach@razetraining.com".to_string()]);
        assert!(config.is_staff_email("Coach@razetraining.com"));
    }

    #[test]
    fn test_secure_cookies_follow_scheme() {
        let mut config = config(Vec::new());
        assert!(!config.secure_cookies());
        config.base_url = "https://admin.razetraining.com".to_string();
        assert!(config.secure_cookies());
    }
}
