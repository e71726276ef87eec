// Configuration validation

use crate::{ConfigError, Result};
use std::fmt::Display;
use std::net::SocketAddr;

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Configuration validator with rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate that a value is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(invalid(field, "cannot be empty"));
        }
        Ok(())
    }

    /// Validate that a number is within an inclusive range
    pub fn in_range<T: PartialOrd + Display>(value: T, min: T, max: T, field: &str) -> Result<()> {
        if value < min || value > max {
            return Err(invalid(
                field,
                format!("must be between {} and {}, got {}", min, max, value),
            ));
        }
        Ok(())
    }

    /// Validate that a value is in a list of allowed values
    pub fn one_of<T: PartialEq + Display>(value: &T, allowed: &[T], field: &str) -> Result<()> {
        if !allowed.contains(value) {
            let allowed = allowed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(invalid(
                field,
                format!("must be one of [{}], got {}", allowed, value),
            ));
        }
        Ok(())
    }

    /// Validate URL format
    pub fn is_url(value: &str, field: &str) -> Result<()> {
        if !value.starts_with("http://") && !value.starts_with("https://") {
            return Err(invalid(field, "must be an http(s) URL"));
        }
        Ok(())
    }

    /// Validate a sender address, either `user@domain.tld` or
    /// `Display Name <user@domain.tld>`
    pub fn is_email(value: &str, field: &str) -> Result<()> {
        let email = match (value.find('<'), value.rfind('>')) {
            (Some(start), Some(end)) if start < end => &value[start + 1..end],
            _ => value,
        };

        match email.trim().split_once('@') {
            Some((local, domain))
                if !local.is_empty() && domain.contains('.') && !domain.contains('@') =>
            {
                Ok(())
            }
            _ => Err(invalid(field, "must be a valid email address")),
        }
    }

    /// Validate a `host:port` socket address
    pub fn is_socket_addr(value: &str, field: &str) -> Result<()> {
        value
            .parse::<SocketAddr>()
            .map(|_| ())
            .map_err(|_| invalid(field, "must be a socket address like 0.0.0.0:3000"))
    }
}

fn invalid(field: &str, reason: impl Display) -> ConfigError {
    ConfigError::Invalid(format!("{} {}", field, reason))
}
