//! Customer and staff email addresses.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why an address was refused.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email must contain an @ symbol")]
    MissingAtSymbol,
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    /// No dot in the domain, a trailing dot, or a second @.
    #[error("email domain is invalid")]
    InvalidDomain,
}

/// A trimmed, lowercased email address.
///
/// Every lookup in the shop (accounts, subscriptions, waitlist, orders,
/// notes) compares addresses case-insensitively, so the normalized form is
/// the only one that is ever stored or compared. Deserializing goes through
/// [`Email::parse`] as well.
///
/// ```
/// use raze_core::Email;
///
/// assert_eq!(Email::parse(" Jo@Example.COM ").unwrap().as_str(), "jo@example.com");
/// assert!(Email::parse("jo@localhost").is_err());
/// assert!(Email::parse("@example.com").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// RFC 5321 limit.
    pub const MAX_LENGTH: usize = 254;

    /// Normalize and validate an address.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] naming the first rule the input breaks.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let email = input.trim().to_lowercase();
        if email.is_empty() {
            return Err(EmailError::Empty);
        }
        if email.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let (local, domain) = email.split_once('@').ok_or(EmailError::MissingAtSymbol)?;
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if domain.contains('@')
            || domain.starts_with('.')
            || domain.ends_with('.')
            || !domain.contains('.')
        {
            return Err(EmailError::InvalidDomain);
        }

        Ok(Self(email))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Email {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Email {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Rows written before normalization may still carry upper case.
        Ok(Self(raw.trim().to_lowercase()))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Email {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_shapes() {
        for ok in [
            "athlete@razetraining.com",
            "first.last+drop01@gmail.com",
            "coach@club.example.co.uk",
            "a@b.c",
        ] {
            assert!(Email::parse(ok).is_ok(), "{ok}");
        }
    }

    #[test]
    fn test_rejections_name_the_rule() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("gymnast"), Err(EmailError::MissingAtSymbol));
        assert_eq!(Email::parse("@razetraining.com"), Err(EmailError::EmptyLocalPart));
        assert_eq!(Email::parse("gymnast@"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("gymnast@localhost"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("gymnast@raze.com."), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("a@b@raze.com"), Err(EmailError::InvalidDomain));

        let long = format!("{}@razetraining.com", "a".repeat(250));
        assert_eq!(Email::parse(&long), Err(EmailError::TooLong { max: 254 }));
    }

    #[test]
    fn test_normalizes_case_and_whitespace() {
        let email = Email::parse("  Runner@RAZE.Shop ").unwrap();
        assert_eq!(email.as_str(), "runner@raze.shop");
        assert_eq!(email.to_string(), "runner@raze.shop");
    }

    #[test]
    fn test_deserialize_validates() {
        let email: Email = serde_json::from_str("\"Coach@RazeTraining.com\"").unwrap();
        assert_eq!(email.as_str(), "coach@razetraining.com");
        assert!(serde_json::from_str::<Email>("\"not-an-email\"").is_err());
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"coach@razetraining.com\"");
    }
}
