//! Campaign result reporting.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::CampaignResult;

/// Errors raised by a reporter.
#[derive(Debug, Error)]
pub enum ReportError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other failure.
    #[error("Report failed: {0}")]
    Failed(String),
}

/// Receives every finished campaign.
#[async_trait]
pub trait CampaignReporter: Send + Sync {
    async fn report(&self, result: &CampaignResult) -> Result<(), ReportError>;
}

/// Report without letting a reporter failure escape.
///
/// Errors are logged; the result is never modified.
pub async fn report_best_effort(reporter: &dyn CampaignReporter, result: &CampaignResult) {
    if let Err(err) = reporter.report(result).await {
        warn!(
            campaign_id = %result.campaign_id(),
            error = %err,
            "Campaign report failed"
        );
    }
}

/// Logs a one-line campaign summary.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

#[async_trait]
impl CampaignReporter for TracingReporter {
    async fn report(&self, result: &CampaignResult) -> Result<(), ReportError> {
        let elapsed_ms = (result.finished_at() - result.started_at()).num_milliseconds();
        info!(
            campaign_id = %result.campaign_id(),
            total = result.total_recipients(),
            sent = result.sent_count(),
            failed = result.failed_count(),
            not_attempted = result.not_attempted_count(),
            cancelled = result.cancelled(),
            elapsed_ms,
            "Campaign report"
        );
        Ok(())
    }
}

/// Appends one JSON audit record per campaign to a file.
#[derive(Debug, Clone)]
pub struct JsonLinesReporter {
    path: PathBuf,
}

#[derive(Serialize)]
struct AuditRecord<'a> {
    timestamp: String,
    campaign_id: Uuid,
    total: usize,
    sent: usize,
    failed: usize,
    cancelled: bool,
    started_at: String,
    finished_at: String,
    failures: Vec<AuditFailure<'a>>,
}

#[derive(Serialize)]
struct AuditFailure<'a> {
    recipient: &'a str,
    error: Option<&'a str>,
    attempts: u32,
}

impl JsonLinesReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CampaignReporter for JsonLinesReporter {
    async fn report(&self, result: &CampaignResult) -> Result<(), ReportError> {
        let record = AuditRecord {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            campaign_id: result.campaign_id(),
            total: result.total_recipients(),
            sent: result.sent_count(),
            failed: result.failed_count(),
            cancelled: result.cancelled(),
            started_at: result.started_at().to_rfc3339_opts(SecondsFormat::Millis, true),
            finished_at: result.finished_at().to_rfc3339_opts(SecondsFormat::Millis, true),
            failures: result
                .failures()
                .map(|o| AuditFailure {
                    recipient: o.recipient.email(),
                    error: o.error.as_deref(),
                    attempts: o.attempts,
                })
                .collect(),
        };

        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Fans a result out to several reporters, stopping at the first error.
#[derive(Default)]
pub struct CompositeReporter {
    reporters: Vec<Box<dyn CampaignReporter>>,
}

impl CompositeReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: impl CampaignReporter + 'static) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

#[async_trait]
impl CampaignReporter for CompositeReporter {
    async fn report(&self, result: &CampaignResult) -> Result<(), ReportError> {
        for reporter in &self.reporters {
            reporter.report(result).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::SendOutcome;
    use launchpad_mail::{Address, MessageId};

    fn result() -> CampaignResult {
        let mut result = CampaignResult::start(Uuid::new_v4(), 2);
        result.record(SendOutcome::sent(
            Address::new("a@b.com").unwrap(),
            MessageId::new("m1"),
            1,
        ));
        result.record(SendOutcome::failed(
            Address::new("c@d.com").unwrap(),
            "http error 422: invalid",
            1,
        ));
        result.finish(false)
    }

    #[tokio::test]
    async fn test_json_lines_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let reporter = JsonLinesReporter::new(&path);

        reporter.report(&result()).await.unwrap();
        reporter.report(&result()).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(record["sent"], 1);
        assert_eq!(record["failed"], 1);
        assert_eq!(record["failures"][0]["recipient"], "c@d.com");
        assert!(record["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_json_lines_unwritable_path() {
        let reporter = JsonLinesReporter::new("/nonexistent-dir/audit.jsonl");
        let err = reporter.report(&result()).await.unwrap_err();
        assert!(matches!(err, ReportError::Io(_)));

        // best effort swallows the same failure
        report_best_effort(&reporter, &result()).await;
    }

    #[tokio::test]
    async fn test_composite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let reporter = CompositeReporter::new()
            .with(TracingReporter)
            .with(JsonLinesReporter::new(&path));

        assert_eq!(reporter.len(), 2);
        reporter.report(&result()).await.unwrap();
        assert!(path.exists());
    }
}
