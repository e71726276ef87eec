//! High-level mailer interface.

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::{
    Address, MailError, MessageId, MessageTemplate, RenderedTemplate, Result, Tag,
    TemplateEngine, Transport,
};

/// Mailer configuration.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// From address of every message.
    pub from: Address,
    /// Default reply-to address.
    pub reply_to: Option<Address>,
}

impl MailerConfig {
    /// Create a configuration from a sender such as `"Launchpad <hi@launchpad.dev>"`.
    pub fn new(from: &str) -> Result<Self> {
        Ok(Self {
            from: Address::parse(from)?,
            reply_to: None,
        })
    }

    /// Set the default reply-to address.
    pub fn reply_to(mut self, reply_to: &str) -> Result<Self> {
        self.reply_to = Some(Address::parse(reply_to)?);
        Ok(self)
    }
}

/// Transport, templates and sender identity bundled together.
#[derive(Clone)]
pub struct Mailer {
    transport: Arc<dyn Transport>,
    templates: Arc<dyn TemplateEngine>,
    config: MailerConfig,
}

impl Mailer {
    pub fn new(
        transport: Arc<dyn Transport>,
        templates: Arc<dyn TemplateEngine>,
        config: MailerConfig,
    ) -> Self {
        Self {
            transport,
            templates,
            config,
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn templates(&self) -> &Arc<dyn TemplateEngine> {
        &self.templates
    }

    pub fn config(&self) -> &MailerConfig {
        &self.config
    }

    /// Turn rendered content into a campaign-level message.
    ///
    /// `subject` overrides the rendered subject. Fails with
    /// `MissingField("subject")` when neither provides one and with
    /// `MissingField("html")` when there is no HTML body.
    pub fn compose(
        &self,
        rendered: RenderedTemplate,
        subject: Option<&str>,
        tags: Vec<Tag>,
    ) -> Result<MessageTemplate> {
        let subject = subject
            .map(str::to_string)
            .filter(|s| !s.trim().is_empty())
            .or(rendered.subject)
            .ok_or(MailError::MissingField("subject"))?;

        let mut builder = MessageTemplate::builder()
            .from(self.config.from.clone())
            .subject(subject)
            .html(rendered.html.ok_or(MailError::MissingField("html"))?)
            .tags(tags);

        if let Some(text) = rendered.text {
            builder = builder.text(text);
        }
        if let Some(reply_to) = &self.config.reply_to {
            builder = builder.reply_to(reply_to.clone());
        }

        builder.build()
    }

    /// Render a named template and send it to a single recipient.
    ///
    /// One provider call, no retries.
    pub async fn send_template(
        &self,
        template_name: &str,
        to: &Address,
        context: &Value,
    ) -> Result<MessageId> {
        let rendered = self.templates.render(template_name, context)?;
        let message = self
            .compose(rendered, None, Vec::new())?
            .for_recipient(to);

        let id = self.transport.send(&message).await?;
        debug!(
            template = template_name,
            to = %to.email(),
            message_id = %id,
            transport = self.transport.name(),
            "Template email sent"
        );
        Ok(id)
    }
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("transport", &self.transport.name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DryRunTransport, HandlebarsEngine};
    use serde_json::json;

    fn mailer() -> Mailer {
        let templates = HandlebarsEngine::with_builtins()
            .unwrap()
            .with_default("product_name", "Orbit")
            .with_default("launch_url", "https://orbit.example.com");
        Mailer::new(
            Arc::new(DryRunTransport::new()),
            Arc::new(templates),
            MailerConfig::new("Orbit <hello@orbit.example.com>")
                .unwrap()
                .reply_to("support@orbit.example.com")
                .unwrap(),
        )
    }

    #[test]
    fn test_compose_prefers_explicit_subject() {
        let mailer = mailer();
        let rendered = RenderedTemplate::html("<p>hi</p>").with_subject("Rendered");

        let template = mailer.compose(rendered.clone(), Some("Override"), Vec::new()).unwrap();
        assert_eq!(template.subject(), "Override");

        let template = mailer.compose(rendered, Some("  "), Vec::new()).unwrap();
        assert_eq!(template.subject(), "Rendered");
    }

    #[test]
    fn test_compose_requires_subject() {
        let err = mailer()
            .compose(RenderedTemplate::html("<p>hi</p>"), None, Vec::new())
            .unwrap_err();
        assert!(matches!(err, MailError::MissingField("subject")));
    }

    #[tokio::test]
    async fn test_send_template() {
        let to = Address::new("reader@example.com").unwrap();
        let id = mailer()
            .send_template("waitlist-welcome", &to, &json!({}))
            .await
            .unwrap();
        assert!(id.as_str().starts_with("dry-run-"));
    }

    #[tokio::test]
    async fn test_send_unknown_template() {
        let to = Address::new("reader@example.com").unwrap();
        let err = mailer()
            .send_template("missing", &to, &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::TemplateNotFound(_)));
    }
}
