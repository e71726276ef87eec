//! # Launchpad Mail
//!
//! Email primitives and delivery for Launchpad.
//!
//! ## Features
//!
//! - **Validated addresses**: an [`Address`] can only be built from a syntactically valid email
//! - **Messages**: a campaign-level [`MessageTemplate`] stamped into one [`Message`] per recipient
//! - **Resend**: HTTP delivery through the Resend API, plus a dry-run transport for development
//! - **Templates**: Handlebars subjects and bodies, with built-in waitlist and launch emails
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use launchpad_mail::prelude::*;
//! use secrecy::SecretString;
//! use std::sync::Arc;
//!
//! let transport = ResendTransport::new(ResendConfig::new(SecretString::from(api_key)))?;
//! let templates = HandlebarsEngine::with_builtins()?
//!     .with_default("product_name", "Orbit")
//!     .with_default("launch_url", "https://orbit.example.com");
//!
//! let mailer = Mailer::new(
//!     Arc::new(transport),
//!     Arc::new(templates),
//!     MailerConfig::new("Orbit <hello@orbit.example.com>")?,
//! );
//!
//! let to = Address::new("reader@example.com")?;
//! mailer.send_template("waitlist-welcome", &to, &serde_json::json!({})).await?;
//! ```

mod address;
mod error;
mod mailer;
mod message;
mod resend;
mod template_handlebars;
mod transport;

pub use address::{Address, check_email};
pub use error::{MailError, ProviderError, ProviderErrorKind, Result};
pub use mailer::{Mailer, MailerConfig};
pub use message::{Message, MessageId, MessageTemplate, MessageTemplateBuilder, Tag};
pub use resend::{RESEND_ENDPOINT, ResendConfig, ResendTransport};
pub use template_handlebars::HandlebarsEngine;
pub use transport::{DryRunTransport, Transport};

/// Template engine trait for rendering email templates.
pub trait TemplateEngine: Send + Sync {
    /// Render a template with the given name and context.
    fn render(&self, name: &str, context: &serde_json::Value) -> Result<RenderedTemplate>;

    /// Render a template source string that is not registered.
    fn render_inline(&self, source: &str, context: &serde_json::Value) -> Result<String>;

    /// Check if a template exists.
    fn has_template(&self, name: &str) -> bool;

    /// Register a template from a string.
    fn register_template(&mut self, name: &str, content: &str) -> Result<()>;
}

/// Rendered template output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplate {
    /// HTML content (if available).
    pub html: Option<String>,
    /// Plain text content (if available).
    pub text: Option<String>,
    /// Subject line (if available).
    pub subject: Option<String>,
}

impl RenderedTemplate {
    /// Create a new rendered template with HTML content.
    pub fn html(html: impl Into<String>) -> Self {
        Self {
            html: Some(html.into()),
            text: None,
            subject: None,
        }
    }

    /// Set the subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the plain text body.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// Prelude for common imports.
///
/// ```
/// use launchpad_mail::prelude::*;
/// ```
pub mod prelude {
    pub use crate::address::Address;
    pub use crate::error::{MailError, ProviderError, Result};
    pub use crate::mailer::{Mailer, MailerConfig};
    pub use crate::message::{Message, MessageId, MessageTemplate, Tag};
    pub use crate::resend::{ResendConfig, ResendTransport};
    pub use crate::template_handlebars::HandlebarsEngine;
    pub use crate::transport::{DryRunTransport, Transport};
    pub use crate::{RenderedTemplate, TemplateEngine};
}
