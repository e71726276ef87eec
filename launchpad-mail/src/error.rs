//! Mail error types.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type for mail operations.
pub type Result<T> = std::result::Result<T, MailError>;

/// Errors raised while building or rendering messages.
#[derive(Debug, Error)]
pub enum MailError {
    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Invalid message tag.
    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    /// Missing required field.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Template error.
    #[error("Template error: {0}")]
    Template(String),

    /// Template not found.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The transport failed to deliver.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<handlebars::RenderError> for MailError {
    fn from(err: handlebars::RenderError) -> Self {
        Self::Template(err.to_string())
    }
}

impl From<handlebars::TemplateError> for MailError {
    fn from(err: handlebars::TemplateError) -> Self {
        Self::Template(err.to_string())
    }
}

/// Broad category of a failed provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The provider answered with a non-success HTTP status.
    Http,
    /// The request never completed (connect, DNS, reset).
    Network,
    /// The request exceeded its deadline.
    Timeout,
    /// A success status with a missing, empty or unparsable body.
    MalformedResponse,
    /// The transport refused the message before sending it.
    Rejected,
}

impl ProviderErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http error",
            Self::Network => "network error",
            Self::Timeout => "timeout",
            Self::MalformedResponse => "malformed response",
            Self::Rejected => "rejected",
        }
    }
}

/// Failure reported by a [`Transport`](crate::Transport).
///
/// The rendered message always contains the kind, the HTTP status when there
/// is one, and the provider's own description, so callers can classify the
/// failure by matching on text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    /// Failure category.
    pub kind: ProviderErrorKind,
    /// HTTP status returned by the provider.
    pub status: Option<u16>,
    /// Human readable description.
    pub message: String,
    /// Provider requested wait before the next attempt.
    pub retry_after: Option<Duration>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Non-success HTTP response.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            ..Self::new(ProviderErrorKind::Http, message)
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::MalformedResponse, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Rejected, message)
    }

    /// Attach a retry-after hint.
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Whether the status is in the 5xx range.
    pub fn is_server_error(&self) -> bool {
        self.status.is_some_and(|s| (500..600).contains(&s))
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} {}: {}", self.kind.as_str(), status, self.message),
            None => write!(f, "{}: {}", self.kind.as_str(), self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::http(429, "Too many requests");
        assert_eq!(err.to_string(), "http error 429: Too many requests");

        let err = ProviderError::timeout("request took longer than 15s");
        assert_eq!(err.to_string(), "timeout: request took longer than 15s");
    }

    #[test]
    fn test_server_error_detection() {
        assert!(ProviderError::http(502, "Bad Gateway").is_server_error());
        assert!(!ProviderError::http(422, "invalid").is_server_error());
        assert!(!ProviderError::network("connection reset").is_server_error());
    }

    #[test]
    fn test_retry_after_hint() {
        let err = ProviderError::http(429, "slow down").with_retry_after(Duration::from_secs(3));
        assert_eq!(err.retry_after, Some(Duration::from_secs(3)));
    }
}
