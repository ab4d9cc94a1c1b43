//! Customer contact address.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why a contact address was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("an email address is required")]
    Empty,

    #[error("address is longer than {} characters", Email::MAX_LENGTH)]
    TooLong,

    #[error("'{0}' is not of the form name@domain.tld")]
    Malformed(String),
}

/// Where order confirmations, status updates and appointment reminders go.
///
/// Checkout and booking forms are typed by hand, so parsing trims
/// surrounding whitespace and lowercases the domain. Customers are stored
/// unique by this value, so `Ada@Example.COM` and `Ada@example.com` are the
/// same customer. The local part keeps its case.
///
/// ```
/// use frameshop_core::Email;
///
/// let email = Email::parse(" Ada@Example.COM ").unwrap();
/// assert_eq!(email.as_str(), "Ada@example.com");
/// assert!(Email::parse("ada@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Longest address SMTP will carry (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Validate a submitted address.
    ///
    /// The check is structural: one `@`, a non-empty local part, a dotted
    /// domain, and no whitespace. Deliverability is left to the mail server.
    ///
    /// # Errors
    ///
    /// Returns `EmailError` describing the first problem found.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(EmailError::Empty);
        }
        if input.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong);
        }

        let malformed = || EmailError::Malformed(input.to_owned());
        let (local, domain) = input.split_once('@').ok_or_else(malformed)?;
        let labels_ok = domain
            .split('.')
            .all(|label| !label.is_empty() && !label.starts_with('-'));
        if local.is_empty()
            || domain.contains('@')
            || !domain.contains('.')
            || !labels_ok
            || input.chars().any(char::is_whitespace)
        {
            return Err(malformed());
        }

        Ok(Self(format!("{local}@{}", domain.to_ascii_lowercase())))
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
