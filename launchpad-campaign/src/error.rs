//! Campaign error types.

use launchpad_mail::MailError;
use thiserror::Error;

/// Result type for campaign operations.
pub type Result<T> = std::result::Result<T, CampaignError>;

/// Errors that stop a campaign before any email is sent.
///
/// Per-recipient delivery failures are never errors at this level; they are
/// recorded in the [`CampaignResult`](crate::CampaignResult).
#[derive(Debug, Error)]
pub enum CampaignError {
    /// The recipient list has no valid address.
    #[error("No valid recipients")]
    NoRecipients,

    /// The requested template does not exist.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// The template exists but could not be rendered.
    #[error("Template render failed: {0}")]
    Render(String),

    /// Neither the request nor the template provides a subject.
    #[error("Missing subject: provide one in the request or the template")]
    MissingSubject,

    /// The request is malformed.
    #[error("Invalid campaign request: {0}")]
    InvalidRequest(String),
}

impl CampaignError {
    /// Whether the caller can fix the error by changing the request.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Render(_))
    }
}

impl From<MailError> for CampaignError {
    fn from(err: MailError) -> Self {
        match err {
            MailError::TemplateNotFound(name) => Self::TemplateNotFound(name),
            MailError::MissingField("subject") => Self::MissingSubject,
            MailError::InvalidTag(reason) | MailError::InvalidAddress(reason) => {
                Self::InvalidRequest(reason)
            }
            other => Self::Render(other.to_string()),
        }
    }
}
