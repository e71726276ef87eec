//! One parametrised campaign flow: validate, render, dispatch, report.

use launchpad_mail::{Mailer, MessageTemplate, RenderedTemplate, Tag};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span};
use uuid::Uuid;

use crate::dispatcher::{DispatchOptions, Dispatcher};
use crate::reporter::{CampaignReporter, TracingReporter, report_best_effort};
use crate::validator::{Rejection, ValidationReport, validate_values};
use crate::{CampaignError, CampaignResult, Result};

/// What the campaign sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CampaignContent {
    /// A registered template by name.
    Template { id: String },
    /// Caller supplied HTML, rendered as an inline template.
    CustomHtml { html: String },
}

/// A campaign as submitted by a caller.
#[derive(Debug, Clone)]
pub struct CampaignRequest {
    /// Raw recipient entries; anything that is not a valid email is rejected.
    pub recipients: Vec<Value>,
    pub content: CampaignContent,
    /// Overrides the template's subject.
    pub subject: Option<String>,
    /// Template variables.
    pub variables: Value,
    pub tags: Vec<Tag>,
    /// Drop repeated addresses before sending.
    pub deduplicate: bool,
}

impl CampaignRequest {
    pub fn new(recipients: Vec<Value>, content: CampaignContent) -> Self {
        Self {
            recipients,
            content,
            subject: None,
            variables: Value::Object(Default::default()),
            tags: Vec::new(),
            deduplicate: false,
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }

    pub fn tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn deduplicate(mut self, deduplicate: bool) -> Self {
        self.deduplicate = deduplicate;
        self
    }
}

/// Result of a campaign run, with the inputs that were skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignReport {
    pub result: CampaignResult,
    pub rejected: Vec<Rejection>,
}

/// Runs campaigns end to end.
#[derive(Clone)]
pub struct CampaignService {
    mailer: Mailer,
    dispatcher: Dispatcher,
    reporter: Arc<dyn CampaignReporter>,
}

impl CampaignService {
    /// Service that reports through [`TracingReporter`].
    pub fn new(mailer: Mailer, dispatcher: Dispatcher) -> Self {
        Self {
            mailer,
            dispatcher,
            reporter: Arc::new(TracingReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn CampaignReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn mailer(&self) -> &Mailer {
        &self.mailer
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run a campaign.
    ///
    /// Every pre-flight failure returns before the first send. Once dispatch
    /// starts the call always returns the result, whatever the reporter does.
    pub async fn run(
        &self,
        request: CampaignRequest,
        options: &DispatchOptions,
        cancel: &CancellationToken,
    ) -> Result<CampaignReport> {
        let campaign_id = Uuid::new_v4();
        let span = info_span!("campaign_run", campaign_id = %campaign_id);

        self.execute(campaign_id, &request, options, cancel)
            .instrument(span)
            .await
    }

    async fn execute(
        &self,
        campaign_id: Uuid,
        request: &CampaignRequest,
        options: &DispatchOptions,
        cancel: &CancellationToken,
    ) -> Result<CampaignReport> {
        let (recipients, template) = self.prepare(request)?;

        let result = self
            .dispatcher
            .dispatch_as(campaign_id, &recipients.valid, &template, options, cancel)
            .await?;

        report_best_effort(self.reporter.as_ref(), &result).await;

        Ok(CampaignReport {
            result,
            rejected: recipients.rejected,
        })
    }

    /// Validate recipients and render the message without sending anything.
    pub fn prepare(&self, request: &CampaignRequest) -> Result<(ValidationReport, MessageTemplate)> {
        let mut recipients = validate_values(&request.recipients);
        if request.deduplicate {
            recipients = recipients.deduplicated();
        }
        if !recipients.has_recipients() {
            return Err(CampaignError::NoRecipients);
        }

        let templates = self.mailer.templates();
        let rendered = match &request.content {
            CampaignContent::Template { id } => templates.render(id, &request.variables)?,
            CampaignContent::CustomHtml { html } => {
                if html.trim().is_empty() {
                    return Err(CampaignError::InvalidRequest(
                        "custom HTML is empty".to_string(),
                    ));
                }
                RenderedTemplate::html(templates.render_inline(html, &request.variables)?)
            }
        };

        let template =
            self.mailer
                .compose(rendered, request.subject.as_deref(), request.tags.clone())?;

        debug!(
            recipients = recipients.valid.len(),
            rejected = recipients.rejected.len(),
            subject = %template.subject(),
            "Campaign prepared"
        );

        Ok((recipients, template))
    }
}
