//! Shared application state and its assembly from configuration.

use launchpad_campaign::{
    CampaignReporter, CampaignService, CancellationToken, CompositeReporter, DispatchDefaults,
    Dispatcher, JsonLinesReporter, RetryPolicy, TracingReporter,
};
use launchpad_config::LaunchpadConfig;
use launchpad_mail::{
    DryRunTransport, HandlebarsEngine, Mailer, MailerConfig, ResendConfig, ResendTransport,
    Transport,
};
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::secrets::{SecretProvider, StaticSecret};
use crate::store::{InMemorySubscriberStore, SubscriberStore};
use crate::ServerError;

/// Everything a request handler needs.
#[derive(Clone)]
pub struct AppState {
    pub campaigns: CampaignService,
    pub subscribers: Arc<dyn SubscriberStore>,
    pub secrets: Arc<dyn SecretProvider>,
    /// Send `waitlist-welcome` to new subscribers.
    pub welcome_email: bool,
    /// Fired on shutdown; running campaigns stop and return partial results.
    pub shutdown: CancellationToken,
    /// Connection and background tasks that shutdown waits for.
    pub tasks: TaskTracker,
}

impl AppState {
    pub fn new(
        campaigns: CampaignService,
        subscribers: Arc<dyn SubscriberStore>,
        secrets: Arc<dyn SecretProvider>,
    ) -> Self {
        Self {
            campaigns,
            subscribers,
            secrets,
            welcome_email: true,
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    pub fn with_welcome_email(mut self, enabled: bool) -> Self {
        self.welcome_email = enabled;
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Wire the production collaborators described by `config`.
    ///
    /// Without a Resend key the dry-run transport is used and every email is
    /// only logged.
    pub fn from_config(config: &LaunchpadConfig) -> Result<Self, ServerError> {
        let transport: Arc<dyn Transport> = match &config.resend_api_key {
            Some(key) if config.has_provider_key() => Arc::new(ResendTransport::new(
                ResendConfig::new(key.clone())
                    .endpoint(&config.resend_endpoint)
                    .timeout(config.request_timeout()),
            )?),
            _ => {
                warn!("No Resend API key configured; emails will be logged, not sent");
                Arc::new(DryRunTransport::new())
            }
        };

        let mut templates = HandlebarsEngine::with_builtins()?
            .with_default("product_name", config.product_name.clone())
            .with_default("launch_url", config.launch_url.clone());
        if let Some(dir) = config.template_dir() {
            let loaded = templates.load_directory(dir)?;
            info!(dir = %dir.display(), loaded, "Loaded email templates");
        }

        let mailer = Mailer::new(
            transport.clone(),
            Arc::new(templates),
            MailerConfig::new(&config.from_address)?,
        );

        let dispatcher = Dispatcher::new(transport, RetryPolicy::from_config(config))
            .with_defaults(DispatchDefaults::from_config(config)?);

        let reporter: Arc<dyn CampaignReporter> = match &config.audit_log_path {
            Some(path) => {
                info!(path = %path.display(), "Campaign audit log enabled");
                Arc::new(
                    CompositeReporter::new()
                        .with(TracingReporter)
                        .with(JsonLinesReporter::new(path)),
                )
            }
            None => Arc::new(TracingReporter),
        };

        let campaigns = CampaignService::new(mailer, dispatcher).with_reporter(reporter);

        Ok(Self::new(
            campaigns,
            Arc::new(InMemorySubscriberStore::new()),
            Arc::new(StaticSecret::new(config.admin_password.clone())),
        )
        .with_welcome_email(config.welcome_email))
    }
}
