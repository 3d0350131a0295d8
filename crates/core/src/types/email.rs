//! Customer email addresses.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Why an entered address was refused.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailError {
    #[error("enter an email address")]
    Blank,
    #[error("email address is longer than {0} characters")]
    Oversized(usize),
    #[error("email address contains spaces")]
    ContainsSpace,
    #[error("email address needs exactly one '@'")]
    AtSign,
    #[error("email address needs a name before '@'")]
    NoMailbox,
    #[error("email address needs a domain such as example.com")]
    BadDomain,
}

/// An address typed at login, registration or checkout.
///
/// Input is trimmed before checking. The backend's own copies are trusted
/// on deserialize.
///
/// ```
/// use youshop_core::Email;
///
/// assert_eq!(Email::parse(" sam@example.com ").unwrap().as_str(), "sam@example.com");
/// assert!(Email::parse("sam@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

/// RFC 5321 path limit.
const LIMIT: usize = 254;

fn has_dotted_domain(domain: &str) -> bool {
    domain
        .rsplit_once('.')
        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

impl Email {
    /// Checks `input` and keeps the trimmed address.
    ///
    /// # Errors
    ///
    /// The first [`EmailError`] the input runs into.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let address = input.trim();
        match address.len() {
            0 => return Err(EmailError::Blank),
            n if n > LIMIT => return Err(EmailError::Oversized(LIMIT)),
            _ => {}
        }
        if address.contains(char::is_whitespace) {
            return Err(EmailError::ContainsSpace);
        }

        let mut parts = address.split('@');
        let (Some(mailbox), Some(domain), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(EmailError::AtSign);
        };
        if mailbox.is_empty() {
            return Err(EmailError::NoMailbox);
        }
        if !has_dotted_domain(domain) {
            return Err(EmailError::BadDomain);
        }

        Ok(Self(address.to_owned()))
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

impl FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_addresses() {
        for ok in [
            "sam@example.com",
            "sam.lee+orders@example.com",
            "buyer@shop.example.co.ma",
            "a@b.c",
        ] {
            assert!(Email::parse(ok).is_ok(), "{ok}");
        }
    }

    #[test]
    fn test_keeps_trimmed_form() {
        let email: Email = "\tsam@example.com \n".parse().unwrap();
        assert_eq!(email.to_string(), "sam@example.com");
    }

    #[test]
    fn test_refusals() {
        let cases = [
            ("  ", EmailError::Blank),
            ("sam at example.com", EmailError::ContainsSpace),
            ("sam.example.com", EmailError::AtSign),
            ("sam@home@example.com", EmailError::AtSign),
            ("@example.com", EmailError::NoMailbox),
            ("sam@", EmailError::BadDomain),
            ("sam@localhost", EmailError::BadDomain),
            ("sam@.com", EmailError::BadDomain),
            ("sam@example.", EmailError::BadDomain),
        ];
        for (input, expected) in cases {
            assert_eq!(Email::parse(input), Err(expected), "{input:?}");
        }
    }

    #[test]
    fn test_length_limit() {
        let fits = format!("{}@example.com", "s".repeat(LIMIT - 12));
        assert!(Email::parse(&fits).is_ok());

        let over = format!("s{fits}");
        assert_eq!(Email::parse(&over), Err(EmailError::Oversized(254)));
    }

    #[test]
    fn test_wire_form_is_plain_string() {
        let email = Email::parse("sam@example.com").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"sam@example.com\"");
    }
}
