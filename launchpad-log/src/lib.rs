//! Launchpad Logging
//!
//! Installs a `tracing` subscriber configured from the environment. Every
//! Launchpad crate logs through the `tracing` macros with structured fields;
//! this crate only decides where those events go and how they look.
//!
//! # Usage
//!
//! ```rust,no_run
//! let config = launchpad_log::LogConfig::from_env();
//! launchpad_log::init(&config).ok();
//!
//! tracing::info!(port = 3000, "Server started");
//! ```
//!
//! # Environment Variables
//!
//! - `LAUNCHPAD_DEBUG=1` - Enable debug logging
//! - `LAUNCHPAD_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `LAUNCHPAD_LOG_FORMAT=pretty|json|compact` - Set output format
//! - `LAUNCHPAD_LOG_COLOR=1|0` - Enable/disable colors
//! - `LAUNCHPAD_LOG_TIMESTAMPS=1|0` - Include timestamps
//! - `RUST_LOG` - Full filter directives, overrides the level when set

use once_cell::sync::OnceCell;
use std::env;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

// ============================================================================
// Log Levels
// ============================================================================

/// Minimum level of events that are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    /// Trace level (most verbose)
    Trace = 0,
    /// Debug level
    Debug = 1,
    /// Info level
    Info = 2,
    /// Warning level
    Warn = 3,
    /// Error level (least verbose)
    Error = 4,
    /// Off (no logging)
    Off = 5,
}

impl Level {
    /// Get level from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Filter directive understood by `EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_directive().to_uppercase())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line human readable output
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for structured logging
    Json,
}

impl Format {
    /// Get format from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether colors are enabled
    pub color: bool,
    /// Whether to include timestamps
    pub timestamps: bool,
    /// Whether to include the event target (module path)
    pub target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            color: false, // JSON output doesn't use colors
            timestamps: true,
            target: true,
        }
    }
}

impl LogConfig {
    /// Create config from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| lookup(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        let debug = flag("LAUNCHPAD_DEBUG").unwrap_or(false);

        let level = lookup("LAUNCHPAD_LOG_LEVEL")
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = lookup("LAUNCHPAD_LOG_FORMAT")
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Json);

        let color = flag("LAUNCHPAD_LOG_COLOR")
            .unwrap_or_else(|| lookup("NO_COLOR").is_none() && lookup("TERM").is_some());

        Self {
            debug,
            level,
            format,
            color: color && format != Format::Json,
            timestamps: flag("LAUNCHPAD_LOG_TIMESTAMPS").unwrap_or(true),
            target: flag("LAUNCHPAD_LOG_TARGET").unwrap_or(true),
        }
    }

    /// Build the event filter, preferring `RUST_LOG` when present.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directive()))
    }

    /// Default filter directive for this configuration.
    ///
    /// Chatty dependencies are capped at `warn` unless tracing is requested.
    pub fn directive(&self) -> String {
        let level = self.level.as_directive();
        match self.level {
            Level::Trace | Level::Off => level.to_string(),
            _ => format!("{level},hyper=warn,reqwest=warn,handlebars=warn"),
        }
    }
}

// ============================================================================
// Installation
// ============================================================================

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LogError {
    /// Another global subscriber is already installed.
    #[error("Failed to install log subscriber: {0}")]
    Install(String),
}

static INSTALLED: OnceCell<LogConfig> = OnceCell::new();

/// Install the global subscriber described by `config`.
///
/// Only the first successful call takes effect; later calls return the
/// configuration that is already active.
pub fn init(config: &LogConfig) -> Result<&'static LogConfig, LogError> {
    INSTALLED.get_or_try_init(|| {
        tracing_subscriber::registry()
            .with(fmt_layer(config))
            .with(config.filter())
            .try_init()
            .map_err(|e| LogError::Install(e.to_string()))?;

        tracing::debug!(
            level = %config.level,
            format = ?config.format,
            "Logging initialized"
        );
        Ok(config.clone())
    })
}

/// Get the configuration installed by [`init`], if any.
pub fn installed() -> Option<&'static LogConfig> {
    INSTALLED.get()
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn fmt_layer(config: &LogConfig) -> BoxedLayer {
    let layer = tracing_subscriber::fmt::layer()
        .with_target(config.target)
        .with_writer(std::io::stderr);

    let layer = layer.with_ansi(config.color);

    match (config.format, config.timestamps) {
        #[cfg(feature = "json")]
        (Format::Json, true) => layer.json().boxed(),
        #[cfg(feature = "json")]
        (Format::Json, false) => layer.json().without_time().boxed(),
        (Format::Pretty, true) => layer.pretty().boxed(),
        (Format::Pretty, false) => layer.pretty().without_time().boxed(),
        (_, true) => layer.compact().boxed(),
        (_, false) => layer.compact().without_time().boxed(),
    }
}

// ============================================================================
// Tests
// ============================================================================
