// Typed Launchpad configuration

use crate::{ConfigManager, ConfigValidator, Result, Validate};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix of every environment variable read by Launchpad.
pub const ENV_PREFIX: &str = "LAUNCHPAD";

/// Environment variable naming an optional JSON/TOML/.env config file.
pub const CONFIG_FILE_VAR: &str = "LAUNCHPAD_CONFIG";

const SEND_MODES: [&str; 2] = ["sequential", "concurrent"];

/// Runtime configuration for the Launchpad service.
#[derive(Debug, Clone)]
pub struct LaunchpadConfig {
    /// Socket address the HTTP server binds to.
    pub bind_address: String,
    /// Resend API key; when absent emails are only logged.
    pub resend_api_key: Option<SecretString>,
    /// Resend send endpoint.
    pub resend_endpoint: String,
    /// Sender address, `Name <user@domain>` or bare address.
    pub from_address: String,
    /// Password guarding the admin campaign endpoints.
    pub admin_password: Option<SecretString>,
    /// Recipients per batch.
    pub batch_size: usize,
    /// Pause between two sends inside a batch.
    pub inter_send_delay_ms: u64,
    /// Pause between two batches.
    pub inter_batch_delay_ms: u64,
    /// Delivery attempts per recipient, including the first one.
    pub max_attempts: u32,
    /// Base delay of the exponential backoff.
    pub backoff_base_ms: u64,
    /// Upper bound of a single backoff wait.
    pub backoff_max_ms: u64,
    /// Add random jitter to backoff waits.
    pub backoff_jitter: bool,
    /// `sequential` or `concurrent` sending inside a batch.
    pub send_mode: String,
    /// Error substrings that mark a provider failure as transient.
    /// `None` keeps the built-in list.
    pub retry_patterns: Option<Vec<String>>,
    /// Timeout of a single provider HTTP request.
    pub request_timeout_ms: u64,
    /// Append-only JSON lines audit log of finished campaigns.
    pub audit_log_path: Option<PathBuf>,
    /// Directory of additional Handlebars email templates.
    pub template_dir: Option<PathBuf>,
    /// Send the welcome email on waitlist signup.
    pub welcome_email: bool,
    /// Product name available to every template as `product_name`.
    pub product_name: String,
    /// Landing page URL available to every template as `launch_url`.
    pub launch_url: String,
}

impl Default for LaunchpadConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            resend_api_key: None,
            resend_endpoint: "https://api.resend.com/emails".to_string(),
            from_address: "Launchpad <onboarding@resend.dev>".to_string(),
            admin_password: None,
            batch_size: 10,
            inter_send_delay_ms: 500,
            inter_batch_delay_ms: 1_000,
            max_attempts: 3,
            backoff_base_ms: 2_000,
            backoff_max_ms: 60_000,
            backoff_jitter: false,
            send_mode: "sequential".to_string(),
            retry_patterns: None,
            request_timeout_ms: 15_000,
            audit_log_path: None,
            template_dir: None,
            welcome_email: true,
            product_name: "Launchpad".to_string(),
            launch_url: "http://localhost:3000".to_string(),
        }
    }
}

impl LaunchpadConfig {
    /// Load from the standard sources and validate.
    ///
    /// Order of precedence (highest last): defaults, the file named by
    /// `LAUNCHPAD_CONFIG`, `./.env`, the process environment.
    pub fn load() -> Result<Self> {
        let manager = ConfigManager::with_prefix(ENV_PREFIX);

        if let Ok(path) = std::env::var(CONFIG_FILE_VAR)
            && !path.trim().is_empty()
        {
            manager.load_file(&path)?;
            tracing::debug!(path = %path, "Loaded configuration file");
        }

        if manager.load_dotenv(None)? {
            tracing::debug!("Loaded .env overrides");
        }
        manager.load_env()?;

        manager.load_validated()
    }

    /// Build from already collected values, falling back to defaults.
    pub fn from_manager(manager: &ConfigManager) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            bind_address: manager.get_or("bind_address", defaults.bind_address)?,
            resend_api_key: manager
                .get_opt::<String>("resend_api_key")?
                .map(SecretString::from),
            resend_endpoint: manager.get_or("resend_endpoint", defaults.resend_endpoint)?,
            from_address: manager.get_or("from_address", defaults.from_address)?,
            admin_password: manager
                .get_opt::<String>("admin_password")?
                .map(SecretString::from),
            batch_size: manager.get_or("batch_size", defaults.batch_size)?,
            inter_send_delay_ms: manager
                .get_or("inter_send_delay_ms", defaults.inter_send_delay_ms)?,
            inter_batch_delay_ms: manager
                .get_or("inter_batch_delay_ms", defaults.inter_batch_delay_ms)?,
            max_attempts: manager.get_or("max_attempts", defaults.max_attempts)?,
            backoff_base_ms: manager.get_or("backoff_base_ms", defaults.backoff_base_ms)?,
            backoff_max_ms: manager.get_or("backoff_max_ms", defaults.backoff_max_ms)?,
            backoff_jitter: manager.get_or("backoff_jitter", defaults.backoff_jitter)?,
            send_mode: manager
                .get_or("send_mode", defaults.send_mode)?
                .to_lowercase(),
            retry_patterns: manager.get_list("retry_patterns")?,
            request_timeout_ms: manager
                .get_or("request_timeout_ms", defaults.request_timeout_ms)?,
            audit_log_path: manager.get_opt("audit_log_path")?,
            template_dir: manager.get_opt("template_dir")?,
            welcome_email: manager.get_or("welcome_email", defaults.welcome_email)?,
            product_name: manager.get_or("product_name", defaults.product_name)?,
            launch_url: manager.get_or("launch_url", defaults.launch_url)?,
        })
    }

    pub fn inter_send_delay(&self) -> Duration {
        Duration::from_millis(self.inter_send_delay_ms)
    }

    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Whether a real provider key is configured.
    pub fn has_provider_key(&self) -> bool {
        self.resend_api_key
            .as_ref()
            .is_some_and(|key| !key.expose_secret().trim().is_empty())
    }

    pub fn template_dir(&self) -> Option<&Path> {
        self.template_dir.as_deref()
    }
}

impl Validate for LaunchpadConfig {
    fn validate(&self) -> Result<()> {
        ConfigValidator::is_socket_addr(&self.bind_address, "bind_address")?;
        ConfigValidator::is_url(&self.resend_endpoint, "resend_endpoint")?;
        ConfigValidator::is_email(&self.from_address, "from_address")?;
        ConfigValidator::is_url(&self.launch_url, "launch_url")?;
        ConfigValidator::not_empty(&self.product_name, "product_name")?;
        ConfigValidator::in_range(self.batch_size, 1, 1_000, "batch_size")?;
        ConfigValidator::in_range(self.max_attempts, 1, 10, "max_attempts")?;
        ConfigValidator::in_range(self.backoff_base_ms, 0, self.backoff_max_ms, "backoff_base_ms")?;
        ConfigValidator::in_range(self.request_timeout_ms, 100, 300_000, "request_timeout_ms")?;
        ConfigValidator::one_of(&self.send_mode.as_str(), &SEND_MODES, "send_mode")?;

        if let Some(patterns) = &self.retry_patterns {
            for pattern in patterns {
                ConfigValidator::not_empty(pattern, "retry_patterns entry")?;
            }
        }

        if let Some(password) = &self.admin_password
            && password.expose_secret().len() < 8
        {
            return Err(crate::ConfigError::Invalid(
                "admin_password must be at least 8 characters".to_string(),
            ));
        }

        Ok(())
    }
}
