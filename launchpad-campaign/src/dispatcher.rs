//! Campaign dispatcher: batching, throttling and per-recipient retry.

use futures::future::join_all;
use launchpad_config::LaunchpadConfig;
use launchpad_mail::{Address, MessageTemplate, Transport};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::outcome::{AttemptOutcome, CampaignResult, SendAttempt, SendOutcome};
use crate::retry::{RetryPolicy, RetryState};
use crate::{CampaignError, Result};

/// How recipients inside one batch are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendMode {
    /// One at a time with `inter_send_delay` between recipients.
    #[default]
    Sequential,
    /// The whole batch at once, joined before the next batch.
    Concurrent,
}

impl FromStr for SendMode {
    type Err = CampaignError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "concurrent" => Ok(Self::Concurrent),
            other => Err(CampaignError::InvalidRequest(format!(
                "unknown send mode '{other}'"
            ))),
        }
    }
}

/// Per-campaign overrides. Unset fields use the dispatcher's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    pub batch_size: Option<usize>,
    pub inter_send_delay: Option<Duration>,
    pub inter_batch_delay: Option<Duration>,
    pub max_attempts: Option<u32>,
    pub mode: Option<SendMode>,
}

impl DispatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn inter_send_delay(mut self, delay: Duration) -> Self {
        self.inter_send_delay = Some(delay);
        self
    }

    pub fn inter_batch_delay(mut self, delay: Duration) -> Self {
        self.inter_batch_delay = Some(delay);
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn mode(mut self, mode: SendMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Fill unset fields from `defaults`.
    pub fn resolve(&self, defaults: &DispatchDefaults) -> DispatchDefaults {
        DispatchDefaults {
            batch_size: self.batch_size.unwrap_or(defaults.batch_size).max(1),
            inter_send_delay: self.inter_send_delay.unwrap_or(defaults.inter_send_delay),
            inter_batch_delay: self.inter_batch_delay.unwrap_or(defaults.inter_batch_delay),
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts).max(1),
            mode: self.mode.unwrap_or(defaults.mode),
        }
    }
}

/// Fully specified dispatch settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchDefaults {
    pub batch_size: usize,
    pub inter_send_delay: Duration,
    pub inter_batch_delay: Duration,
    pub max_attempts: u32,
    pub mode: SendMode,
}

impl Default for DispatchDefaults {
    fn default() -> Self {
        Self {
            batch_size: 10,
            inter_send_delay: Duration::from_millis(500),
            inter_batch_delay: Duration::from_secs(1),
            max_attempts: 3,
            mode: SendMode::Sequential,
        }
    }
}

impl DispatchDefaults {
    pub fn from_config(config: &LaunchpadConfig) -> Result<Self> {
        Ok(Self {
            batch_size: config.batch_size,
            inter_send_delay: config.inter_send_delay(),
            inter_batch_delay: config.inter_batch_delay(),
            max_attempts: config.max_attempts,
            mode: config.send_mode.parse()?,
        })
    }
}

/// Sends one message per recipient through a [`Transport`].
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    defaults: DispatchDefaults,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        let defaults = DispatchDefaults {
            max_attempts: policy.max_attempts,
            ..DispatchDefaults::default()
        };
        Self {
            transport,
            policy,
            defaults,
        }
    }

    pub fn with_defaults(mut self, defaults: DispatchDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &DispatchDefaults {
        &self.defaults
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Deliver `template` to every recipient.
    pub async fn dispatch(
        &self,
        recipients: &[Address],
        template: &MessageTemplate,
        options: &DispatchOptions,
    ) -> Result<CampaignResult> {
        self.dispatch_with_cancellation(recipients, template, options, &CancellationToken::new())
            .await
    }

    /// Like [`dispatch`](Self::dispatch), stopping early once `cancel` fires.
    ///
    /// Recipients not reached are recorded as not attempted. A backoff wait
    /// that is already running is allowed to finish.
    pub async fn dispatch_with_cancellation(
        &self,
        recipients: &[Address],
        template: &MessageTemplate,
        options: &DispatchOptions,
        cancel: &CancellationToken,
    ) -> Result<CampaignResult> {
        self.dispatch_as(Uuid::new_v4(), recipients, template, options, cancel)
            .await
    }

    /// Dispatch under a caller-chosen campaign id.
    pub async fn dispatch_as(
        &self,
        campaign_id: Uuid,
        recipients: &[Address],
        template: &MessageTemplate,
        options: &DispatchOptions,
        cancel: &CancellationToken,
    ) -> Result<CampaignResult> {
        if recipients.is_empty() {
            return Err(CampaignError::NoRecipients);
        }

        let settings = options.resolve(&self.defaults);
        let span = info_span!("campaign", campaign_id = %campaign_id);

        let result = async {
            info!(
                recipients = recipients.len(),
                batch_size = settings.batch_size,
                mode = ?settings.mode,
                max_attempts = settings.max_attempts,
                transport = self.transport.name(),
                "Campaign dispatch started"
            );

            let mut result = CampaignResult::start(campaign_id, recipients.len());
            self.run_batches(recipients, template, &settings, cancel, &mut result)
                .await;

            let cancelled = result.processed() < recipients.len();
            if cancelled {
                warn!(
                    processed = result.processed(),
                    remaining = recipients.len() - result.processed(),
                    "Campaign cancelled"
                );
                for recipient in &recipients[result.processed()..] {
                    result.record(SendOutcome::not_attempted(recipient.clone()));
                }
            }

            let result = result.finish(cancelled);
            info!(
                total = result.total_recipients(),
                sent = result.sent_count(),
                failed = result.failed_count(),
                cancelled,
                "Campaign dispatch finished"
            );
            result
        }
        .instrument(span)
        .await;

        Ok(result)
    }

    async fn run_batches(
        &self,
        recipients: &[Address],
        template: &MessageTemplate,
        settings: &DispatchDefaults,
        cancel: &CancellationToken,
        result: &mut CampaignResult,
    ) {
        for (index, batch) in recipients.chunks(settings.batch_size).enumerate() {
            if index > 0 {
                pause(settings.inter_batch_delay, cancel).await;
            }
            if cancel.is_cancelled() {
                return;
            }

            debug!(batch = index, size = batch.len(), "Sending batch");

            match settings.mode {
                SendMode::Sequential => {
                    for (position, recipient) in batch.iter().enumerate() {
                        if position > 0 {
                            pause(settings.inter_send_delay, cancel).await;
                        }
                        if cancel.is_cancelled() {
                            return;
                        }
                        let outcome = self
                            .deliver(recipient, template, settings.max_attempts)
                            .await;
                        result.record(outcome);
                    }
                }
                SendMode::Concurrent => {
                    let outcomes = join_all(
                        batch
                            .iter()
                            .map(|r| self.deliver(r, template, settings.max_attempts)),
                    )
                    .await;
                    for outcome in outcomes {
                        result.record(outcome);
                    }
                }
            }
        }
    }

    /// Send to one recipient, retrying transient failures.
    async fn deliver(
        &self,
        recipient: &Address,
        template: &MessageTemplate,
        max_attempts: u32,
    ) -> SendOutcome {
        let message = template.for_recipient(recipient);
        let mut state = RetryState::new(max_attempts);

        loop {
            match self.transport.send(&message).await {
                Ok(id) => {
                    SendAttempt {
                        recipient: recipient.clone(),
                        attempt_number: state.attempts_made(),
                        outcome: AttemptOutcome::Success(id.clone()),
                    }
                    .log();
                    return SendOutcome::sent(recipient.clone(), id, state.attempts_made());
                }
                Err(err) => {
                    let transient = self.policy.classifier.is_transient(&err);
                    let reason = err.to_string();

                    SendAttempt {
                        recipient: recipient.clone(),
                        attempt_number: state.attempts_made(),
                        outcome: if transient {
                            AttemptOutcome::TransientFailure(reason.clone())
                        } else {
                            AttemptOutcome::PermanentFailure(reason.clone())
                        },
                    }
                    .log();

                    if !self
                        .policy
                        .should_retry(&err, state.attempt, state.max_attempts)
                    {
                        warn!(
                            recipient = %recipient.email(),
                            attempts = state.attempts_made(),
                            error = %reason,
                            "Delivery failed"
                        );
                        return SendOutcome::failed(recipient.clone(), reason, state.attempts_made());
                    }

                    let wait = self.policy.wait_for(&err, state.attempt);
                    debug!(
                        recipient = %recipient.email(),
                        attempt = state.attempts_made(),
                        wait_ms = wait.as_millis() as u64,
                        "Retrying after backoff"
                    );
                    tokio::time::sleep(wait).await;
                    state.advance();
                }
            }
        }
    }
}

/// Throttle wait that ends early on cancellation.
async fn pause(delay: Duration, cancel: &CancellationToken) {
    if delay.is_zero() {
        return;
    }
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = cancel.cancelled() => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_mode_parse() {
        assert_eq!("Sequential".parse::<SendMode>().unwrap(), SendMode::Sequential);
        assert_eq!("concurrent".parse::<SendMode>().unwrap(), SendMode::Concurrent);
        assert!("parallel".parse::<SendMode>().is_err());
    }

    #[test]
    fn test_options_resolve() {
        let defaults = DispatchDefaults::default();
        let resolved = DispatchOptions::new()
            .batch_size(0)
            .mode(SendMode::Concurrent)
            .resolve(&defaults);

        assert_eq!(resolved.batch_size, 1);
        assert_eq!(resolved.mode, SendMode::Concurrent);
        assert_eq!(resolved.inter_send_delay, Duration::from_millis(500));
        assert_eq!(resolved.max_attempts, 3);
    }

    #[test]
    fn test_defaults_from_config() {
        let config = LaunchpadConfig {
            batch_size: 25,
            inter_send_delay_ms: 0,
            send_mode: "concurrent".into(),
            ..LaunchpadConfig::default()
        };

        let defaults = DispatchDefaults::from_config(&config).unwrap();
        assert_eq!(defaults.batch_size, 25);
        assert_eq!(defaults.inter_send_delay, Duration::ZERO);
        assert_eq!(defaults.inter_batch_delay, Duration::from_secs(1));
        assert_eq!(defaults.mode, SendMode::Concurrent);
    }
}
