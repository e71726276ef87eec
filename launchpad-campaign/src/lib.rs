//! # Launchpad Campaign
//!
//! Bulk email campaigns over a rate-limited, partially failing provider.
//!
//! ## Features
//!
//! - **Validation**: raw recipient lists split into valid addresses and rejections
//! - **Batching and throttling**: fixed-size batches with delays between sends and batches
//! - **Retry**: exponential backoff for transient provider failures, classified by status and text
//! - **Results**: one outcome per recipient, counts that always add up, even on cancellation
//! - **Reporting**: best-effort log and JSON lines audit reporters
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use launchpad_campaign::prelude::*;
//!
//! let dispatcher = Dispatcher::new(transport, RetryPolicy::default());
//! let service = CampaignService::new(mailer, dispatcher);
//!
//! let request = CampaignRequest::new(
//!     vec!["a@example.com".into(), "not-an-email".into()],
//!     CampaignContent::Template { id: "launch-announcement".into() },
//! );
//!
//! let report = service
//!     .run(request, &DispatchOptions::default(), &CancellationToken::new())
//!     .await?;
//! println!("sent {} of {}", report.result.sent_count(), report.result.total_recipients());
//! ```

mod dispatcher;
mod error;
mod outcome;
mod reporter;
mod retry;
mod service;
mod validator;

pub use dispatcher::{DispatchDefaults, DispatchOptions, Dispatcher, SendMode};
pub use error::{CampaignError, Result};
pub use outcome::{AttemptOutcome, CampaignResult, DeliveryStatus, SendAttempt, SendOutcome};
pub use reporter::{
    CampaignReporter, CompositeReporter, JsonLinesReporter, ReportError, TracingReporter,
    report_best_effort,
};
pub use retry::{BackoffStrategy, DEFAULT_RETRY_PATTERNS, RetryClassifier, RetryPolicy, RetryState};
pub use service::{CampaignContent, CampaignReport, CampaignRequest, CampaignService};
pub use validator::{RecipientAddress, Rejection, ValidationReport, validate, validate_values};

pub use tokio_util::sync::CancellationToken;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        CampaignContent, CampaignError, CampaignReport, CampaignReporter, CampaignRequest,
        CampaignResult, CampaignService, CancellationToken, DispatchOptions, Dispatcher,
        RetryPolicy, SendMode, SendOutcome,
    };
}
