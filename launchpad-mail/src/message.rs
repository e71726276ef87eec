//! Email message types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Address, MailError, Result};

/// Provider-side label attached to a message, e.g. `campaign=launch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name.
    pub name: String,
    /// Tag value.
    pub value: String,
}

impl Tag {
    /// Maximum length of a tag name or value.
    pub const MAX_LEN: usize = 256;

    /// Create a tag. Names and values may only hold ASCII letters, digits,
    /// underscores and dashes.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let tag = Self {
            name: name.into(),
            value: value.into(),
        };
        tag.validate()?;
        Ok(tag)
    }

    /// Check the character and length rules.
    pub fn validate(&self) -> Result<()> {
        for (what, text) in [("name", &self.name), ("value", &self.value)] {
            if text.is_empty() || text.len() > Self::MAX_LEN {
                return Err(MailError::InvalidTag(format!(
                    "{} must be 1..={} characters",
                    what,
                    Self::MAX_LEN
                )));
            }
            if !text
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(MailError::InvalidTag(format!(
                    "{} '{}' may only contain ASCII letters, digits, '_' and '-'",
                    what, text
                )));
            }
        }
        Ok(())
    }
}

/// Identifier assigned to an accepted message by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single email addressed to one recipient.
///
/// Built from a [`MessageTemplate`]; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    from: Address,
    to: Address,
    subject: String,
    html: String,
    text: Option<String>,
    reply_to: Option<Address>,
    tags: Vec<Tag>,
}

impl Message {
    pub fn from(&self) -> &Address {
        &self.from
    }

    pub fn to(&self) -> &Address {
        &self.to
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn reply_to(&self) -> Option<&Address> {
        self.reply_to.as_ref()
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }
}

/// Campaign-level message: everything except the recipient.
///
/// Rendered once per campaign and stamped with each recipient's address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    from: Address,
    subject: String,
    html: String,
    text: Option<String>,
    reply_to: Option<Address>,
    tags: Vec<Tag>,
}

impl MessageTemplate {
    /// Create a builder.
    pub fn builder() -> MessageTemplateBuilder {
        MessageTemplateBuilder::default()
    }

    /// Produce the message for one recipient.
    pub fn for_recipient(&self, to: &Address) -> Message {
        Message {
            from: self.from.clone(),
            to: to.clone(),
            subject: self.subject.clone(),
            html: self.html.clone(),
            text: self.text.clone(),
            reply_to: self.reply_to.clone(),
            tags: self.tags.clone(),
        }
    }

    pub fn from(&self) -> &Address {
        &self.from
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }
}

/// Builder with validation for [`MessageTemplate`].
#[derive(Debug, Default)]
pub struct MessageTemplateBuilder {
    from: Option<Address>,
    subject: Option<String>,
    html: Option<String>,
    text: Option<String>,
    reply_to: Option<Address>,
    tags: Vec<Tag>,
}

impl MessageTemplateBuilder {
    /// Set the from address.
    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Set the subject.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the HTML body.
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Set the plain text body.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the reply-to address.
    pub fn reply_to(mut self, reply_to: Address) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    /// Add a tag.
    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Add several tags.
    pub fn tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Build and validate the template.
    pub fn build(self) -> Result<MessageTemplate> {
        let from = self.from.ok_or(MailError::MissingField("from"))?;
        let subject = self
            .subject
            .filter(|s| !s.trim().is_empty())
            .ok_or(MailError::MissingField("subject"))?;
        let html = self
            .html
            .filter(|h| !h.trim().is_empty())
            .ok_or(MailError::MissingField("html"))?;

        for tag in &self.tags {
            tag.validate()?;
        }

        Ok(MessageTemplate {
            from,
            subject: subject.trim().to_string(),
            html,
            text: self.text,
            reply_to: self.reply_to,
            tags: self.tags,
        })
    }
}
