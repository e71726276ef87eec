//! Email address types.

use crate::{MailError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validated email address with optional display name.
///
/// The address part always passes [`check_email`]; there is no way to build
/// an `Address` that skipped validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    email: String,
    name: Option<String>,
}

impl Address {
    /// Create a new address with just an email.
    pub fn new(email: impl AsRef<str>) -> Result<Self> {
        let email = email.as_ref().trim();
        check_email(email)
            .map_err(|reason| MailError::InvalidAddress(format!("{email}: {reason}")))?;
        Ok(Self {
            email: email.to_string(),
            name: None,
        })
    }

    /// Create a new address with a display name.
    pub fn with_name(email: impl AsRef<str>, name: impl Into<String>) -> Result<Self> {
        let mut address = Self::new(email)?;
        let name = name.into();
        if !name.trim().is_empty() {
            address.name = Some(name.trim().to_string());
        }
        Ok(address)
    }

    /// Parse an address from a string like "Name <email@example.com>" or "email@example.com".
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if let Some(start) = s.find('<')
            && let Some(end) = s.rfind('>')
            && start < end
        {
            let name = s[..start].trim().trim_matches('"');
            return Self::with_name(&s[start + 1..end], name);
        }

        Self::new(s)
    }

    /// Get the email address.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Get the display name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Lowercased address, for duplicate detection.
    pub fn normalized(&self) -> String {
        self.email.to_lowercase()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.email),
            None => write!(f, "{}", self.email),
        }
    }
}

impl TryFrom<&str> for Address {
    type Error = MailError;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = MailError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

/// Minimal email syntax check.
///
/// Accepts `local@domain` where both parts are non-empty, there is exactly one
/// `@`, and the domain contains a `.`. The input is expected to be trimmed.
/// Returns a short reason on failure.
pub fn check_email(email: &str) -> std::result::Result<(), &'static str> {
    if email.is_empty() {
        return Err("empty");
    }

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        (_, None, _) => return Err("missing '@'"),
        _ => return Err("more than one '@'"),
    };

    if local.is_empty() {
        return Err("empty local part");
    }
    if domain.is_empty() {
        return Err("empty domain");
    }
    if !domain.contains('.') {
        return Err("domain has no '.'");
    }

    Ok(())
}
