//! Delivery transports.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::{Message, MessageId, ProviderError};

/// Delivery client: sends one message to one recipient.
///
/// Implementations make exactly one provider call per `send`. Retrying is the
/// caller's business.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a message, returning the provider's message id.
    async fn send(&self, message: &Message) -> Result<MessageId, ProviderError>;

    /// Short transport name for logs and health output.
    fn name(&self) -> &'static str;
}

/// Transport that only logs messages.
///
/// Used when no provider key is configured so the rest of the service can run
/// unchanged in development.
#[derive(Debug, Default, Clone)]
pub struct DryRunTransport;

impl DryRunTransport {
    pub fn new() -> Self {
        info!("Dry-run mail transport active; no email will leave this process");
        Self
    }
}

#[async_trait]
impl Transport for DryRunTransport {
    async fn send(&self, message: &Message) -> Result<MessageId, ProviderError> {
        let id = MessageId::new(format!("dry-run-{}", uuid::Uuid::new_v4()));

        debug!(
            to = %message.to().email(),
            subject = %message.subject(),
            message_id = %id,
            "Dry-run send"
        );

        Ok(id)
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}
