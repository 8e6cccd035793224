//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL of the shop front-end
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_CORS_ORIGINS` - Comma-separated extra origins allowed to call the API
//! - `WAITLIST_LIMIT` - Number of waitlist spots (default: 100)
//! - `GEOIP_ENABLED` - Look up visitor location by IP (default: false)
//! - `ADMIN_ALLOWED_EMAILS` - Comma-separated staff emails, tagged as admins in analytics
//! - `STRIPE_API_KEY` - Stripe secret key; checkout is disabled without it
//! - `STRIPE_WEBHOOK_SECRET` - Signing secret for Stripe webhook events
//! - `SHIPPO_API_KEY` - Shippo token; shipping rates and labels are disabled without it
//! - `SHIPPO_API_BASE` - Shippo API URL (default: <https://api.goshippo.com>)
//! - `WEBHOOK_SIGNUP_URL`, `WEBHOOK_GIVEAWAY_URL`, `WEBHOOK_GIVEAWAY_WINNER_URL`,
//!   `WEBHOOK_WAITLIST_URL`, `WEBHOOK_ORDER_URL`, `WEBHOOK_ABANDONED_CART_1_URL`,
//!   `WEBHOOK_ABANDONED_CART_2_URL`, `WEBHOOK_ABANDONED_CART_3_URL`,
//!   `WEBHOOK_BULK_EMAIL_URL` - Notification hooks
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use raze_core::waitlist::DEFAULT_WAITLIST_LIMIT;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the shop front-end
    pub base_url: String,
    /// Extra CORS origins besides `base_url`
    pub cors_origins: Vec<String>,
    /// Number of waitlist spots
    pub waitlist_limit: i64,
    /// Whether visitor IPs are geolocated
    pub geoip_enabled: bool,
    /// Lowercased staff emails
    pub admin_emails: Vec<String>,
    /// Outbound notification hooks
    pub webhooks: WebhookConfig,
    /// Payment provider settings, if checkout is enabled
    pub stripe: Option<StripeConfig>,
    /// Shipping provider settings, if rates and labels are enabled
    pub shippo: Option<ShippoConfig>,
    /// Sentry error tracking settings
    pub sentry: SentryConfig,
}

/// Notification webhook endpoints. Unset hooks are skipped.
#[derive(Debug, Clone, Default)]
pub struct WebhookConfig {
    pub signup: Option<Url>,
    pub giveaway: Option<Url>,
    pub giveaway_winner: Option<Url>,
    pub waitlist: Option<Url>,
    pub order_confirmation: Option<Url>,
    pub abandoned_cart: [Option<Url>; 3],
    pub bulk_email: Option<Url>,
}

/// Stripe settings.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key
    pub api_key: SecretString,
    /// Webhook signing secret
    pub webhook_secret: Option<SecretString>,
    /// API base URL (overridable for tests)
    pub api_base: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_key", &"[REDACTED]")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Shippo settings.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct ShippoConfig {
    /// API token
    pub api_key: SecretString,
    /// API base URL (overridable for tests)
    pub api_base: String,
}

impl std::fmt::Debug for ShippoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShippoConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl ShippoConfig {
    /// Load Shippo settings, if a token is set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InsecureSecret` if the token looks like a placeholder.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(key) = get_optional_env("SHIPPO_API_KEY") else {
            return Ok(None);
        };
        validate_secret_strength(&key, "SHIPPO_API_KEY")?;
        Ok(Some(Self {
            api_key: SecretString::from(key),
            api_base: get_env_or_default("SHIPPO_API_BASE", "https://api.goshippo.com"),
        }))
    }
}

/// Sentry settings shared by both binaries.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl StorefrontConfig {
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

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;
        let cors_origins = get_optional_env("STOREFRONT_CORS_ORIGINS")
            .map(|v| parse_list(&v))
            .unwrap_or_default();
        let waitlist_limit = parse_env("WAITLIST_LIMIT", &DEFAULT_WAITLIST_LIMIT.to_string())?;
        let geoip_enabled = parse_env("GEOIP_ENABLED", "false")?;
        let admin_emails = get_optional_env("ADMIN_ALLOWED_EMAILS")
            .map(|v| parse_list(&v.to_lowercase()))
            .unwrap_or_default();

        let stripe = match get_optional_env("STRIPE_API_KEY") {
            Some(key) => {
                validate_secret_strength(&key, "STRIPE_API_KEY")?;
                Some(StripeConfig {
                    api_key: SecretString::from(key),
                    webhook_secret: get_optional_env("STRIPE_WEBHOOK_SECRET")
                        .map(SecretString::from),
                    api_base: get_env_or_default("STRIPE_API_BASE", "https://api.stripe.com"),
                })
            }
            None => None,
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            cors_origins,
            waitlist_limit,
            geoip_enabled,
            admin_emails,
            webhooks: WebhookConfig::from_env()?,
            stripe,
            shippo: ShippoConfig::from_env()?,
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Whether an account email belongs to staff.
    #[must_use]
    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|e| *e == email)
    }

    /// All origins allowed by CORS.
    #[must_use]
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = vec![self.base_url.trim_end_matches('/').to_string()];
        origins.extend(self.cors_origins.iter().cloned());
        origins
    }
}

impl WebhookConfig {
    /// Load webhook URLs from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a set URL does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            signup: get_optional_url("WEBHOOK_SIGNUP_URL")?,
            giveaway: get_optional_url("WEBHOOK_GIVEAWAY_URL")?,
            giveaway_winner: get_optional_url("WEBHOOK_GIVEAWAY_WINNER_URL")?,
            waitlist: get_optional_url("WEBHOOK_WAITLIST_URL")?,
            order_confirmation: get_optional_url("WEBHOOK_ORDER_URL")?,
            abandoned_cart: [
                get_optional_url("WEBHOOK_ABANDONED_CART_1_URL")?,
                get_optional_url("WEBHOOK_ABANDONED_CART_2_URL")?,
                get_optional_url("WEBHOOK_ABANDONED_CART_3_URL")?,
            ],
            bulk_email: get_optional_url("WEBHOOK_BULK_EMAIL_URL")?,
        })
    }
}

impl SentryConfig {
    /// Load Sentry settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a sample rate is not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional, non-empty environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse an optional URL variable.
fn get_optional_url(key: &str) -> Result<Option<Url>, ConfigError> {
    get_optional_env(key)
        .map(|v| {
            Url::parse(v.trim())
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
        .transpose()
}

/// Split a comma-separated list, dropping empty entries.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
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
            #[allow(clippy::cast_precision_loss)]
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://razetraining.com/".to_string(),
            cors_origins: vec!["http://localhost:5173".to_string()],
            waitlist_limit: 100,
            geoip_enabled: false,
            admin_emails: vec!["owner@razetraining.com".to_string()],
            webhooks: WebhookConfig::default(),
            stripe: None,
            shippo: None,
            sentry: SentryConfig::default(),
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_stripe_shaped_key() {
        let result = validate_secret_strength("sk_test_51NfK2aB3xY9mK2nL5pQ7rT0uW4zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list(" https://a.com/, ,https://b.com"),
            vec!["https://a.com".to_string(), "https://b.com".to_string()]
        );
    }

    #[test]
    fn test_socket_addr_and_cookies() {
        let config = config();
        assert_eq!(config.socket_addr().port(), 3000);
        assert!(config.secure_cookies());
        assert_eq!(
            config.allowed_origins(),
            vec![
                "https://razetraining.com".to_string(),
                "http://localhost:5173".to_string()
            ]
        );
    }

    #[test]
    fn test_is_admin_email() {
        let config = config();
        assert!(config.is_admin_email(" Owner@RazeTraining.com"));
        assert!(!config.is_admin_email("fan@example.com"));
    }

    #[test]
    fn test_stripe_config_debug_redacts_secrets() {
        let stripe = StripeConfig {
            api_key: SecretString::from("sk_live_super_secret_value"),
            webhook_secret: Some(SecretString::from("whsec_hidden_value")),
            api_base: "https://api.stripe.com".to_string(),
        };
        let debug_output = format!("{stripe:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("api.stripe.com"));
        assert!(!debug_output.contains("super_secret_value"));
        assert!(!debug_output.contains("whsec_hidden_value"));
    }
}
