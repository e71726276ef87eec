//! Per-attempt, per-recipient and per-campaign results.

use chrono::{DateTime, Utc};
use launchpad_mail::{Address, MessageId};
use serde::Serialize;
use uuid::Uuid;

/// Result of a single provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The provider accepted the message.
    Success(MessageId),
    /// The call failed with an error a retry could fix.
    TransientFailure(String),
    /// The call failed with an error no retry will fix.
    PermanentFailure(String),
}

/// One provider call for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendAttempt {
    pub recipient: Address,
    /// 1-based attempt number.
    pub attempt_number: u32,
    pub outcome: AttemptOutcome,
}

impl SendAttempt {
    /// Emit the attempt as a debug event.
    pub fn log(&self) {
        match &self.outcome {
            AttemptOutcome::Success(id) => tracing::debug!(
                recipient = %self.recipient.email(),
                attempt = self.attempt_number,
                message_id = %id,
                "Send attempt succeeded"
            ),
            AttemptOutcome::TransientFailure(reason) => tracing::debug!(
                recipient = %self.recipient.email(),
                attempt = self.attempt_number,
                error = %reason,
                transient = true,
                "Send attempt failed"
            ),
            AttemptOutcome::PermanentFailure(reason) => tracing::debug!(
                recipient = %self.recipient.email(),
                attempt = self.attempt_number,
                error = %reason,
                transient = false,
                "Send attempt failed"
            ),
        }
    }
}

/// Terminal delivery state of a recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Accepted by the provider.
    Sent,
    /// Every allowed attempt failed, or the failure was permanent.
    Failed,
    /// Skipped because the campaign was cancelled first.
    NotAttempted,
}

/// Final outcome for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    pub recipient: Address,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Provider calls made for this recipient.
    pub attempts: u32,
}

impl SendOutcome {
    pub fn sent(recipient: Address, message_id: MessageId, attempts: u32) -> Self {
        Self {
            recipient,
            status: DeliveryStatus::Sent,
            message_id: Some(message_id),
            error: None,
            attempts,
        }
    }

    pub fn failed(recipient: Address, error: impl Into<String>, attempts: u32) -> Self {
        Self {
            recipient,
            status: DeliveryStatus::Failed,
            message_id: None,
            error: Some(error.into()),
            attempts,
        }
    }

    pub fn not_attempted(recipient: Address) -> Self {
        Self {
            recipient,
            status: DeliveryStatus::NotAttempted,
            message_id: None,
            error: Some("not attempted: campaign cancelled".to_string()),
            attempts: 0,
        }
    }

    pub fn success(&self) -> bool {
        self.status == DeliveryStatus::Sent
    }
}

/// Aggregate of a finished campaign.
///
/// Only the dispatcher builds one; the counts always satisfy
/// `sent_count + failed_count == outcomes.len() == total_recipients`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignResult {
    campaign_id: Uuid,
    total_recipients: usize,
    sent_count: usize,
    failed_count: usize,
    outcomes: Vec<SendOutcome>,
    cancelled: bool,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl CampaignResult {
    pub(crate) fn start(campaign_id: Uuid, total_recipients: usize) -> Self {
        let now = Utc::now();
        Self {
            campaign_id,
            total_recipients,
            sent_count: 0,
            failed_count: 0,
            outcomes: Vec::with_capacity(total_recipients),
            cancelled: false,
            started_at: now,
            finished_at: now,
        }
    }

    pub(crate) fn record(&mut self, outcome: SendOutcome) {
        if outcome.success() {
            self.sent_count += 1;
        } else {
            self.failed_count += 1;
        }
        self.outcomes.push(outcome);
    }

    pub(crate) fn processed(&self) -> usize {
        self.outcomes.len()
    }

    pub(crate) fn finish(mut self, cancelled: bool) -> Self {
        self.cancelled = cancelled;
        self.finished_at = Utc::now();
        self
    }

    pub fn campaign_id(&self) -> Uuid {
        self.campaign_id
    }

    pub fn total_recipients(&self) -> usize {
        self.total_recipients
    }

    pub fn sent_count(&self) -> usize {
        self.sent_count
    }

    pub fn failed_count(&self) -> usize {
        self.failed_count
    }

    /// Outcomes in input order.
    pub fn outcomes(&self) -> &[SendOutcome] {
        &self.outcomes
    }

    /// Whether the campaign stopped before reaching every recipient.
    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Outcomes that did not end in [`DeliveryStatus::Sent`].
    pub fn failures(&self) -> impl Iterator<Item = &SendOutcome> {
        self.outcomes.iter().filter(|o| !o.success())
    }

    /// Number of recipients skipped by cancellation.
    pub fn not_attempted_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == DeliveryStatus::NotAttempted)
            .count()
    }
}
