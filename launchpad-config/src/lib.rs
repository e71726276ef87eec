//! Layered configuration for Launchpad.
//!
//! Values are collected into a flat key space from, in increasing priority:
//! built-in defaults, a JSON/TOML/.env file, a `.env` file in the working
//! directory, and `LAUNCHPAD_*` process environment variables. The typed view
//! is [`LaunchpadConfig`].

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::{ENV_PREFIX, LaunchpadConfig};
pub use validation::{ConfigValidator, Validate};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Main configuration manager
#[derive(Clone, Default)]
pub struct ConfigManager {
    config: Arc<RwLock<HashMap<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with environment variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::default(),
            env_prefix: Some(prefix.into()),
        }
    }

    /// Load configuration from environment variables
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        self.extend_strings(loader.load()?);
        Ok(())
    }

    /// Load configuration from a dotenv file.
    ///
    /// With no path, `.env` in the working directory is used if it exists.
    /// Returns whether a file was read.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<bool> {
        let path = match path {
            Some(path) => path,
            None if Path::new(".env").exists() => Path::new(".env"),
            None => return Ok(false),
        };

        let loader = EnvLoader::new(self.env_prefix.clone());
        self.extend_strings(loader.load_dotenv(path)?);
        Ok(true)
    }

    /// Load configuration from a file, detecting its format from the name
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = ConfigLoader::auto(path)?.load_file(path)?;

        let mut config = self.config.write();
        config.extend(data);

        Ok(())
    }

    /// Set a configuration value
    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| ConfigError::Encode(e.to_string()))?;

        self.config.write().insert(key.to_lowercase(), json_value);

        Ok(())
    }

    /// Get a configuration value.
    ///
    /// String values are re-parsed as JSON when they do not deserialize
    /// directly, so `"42"` read from the environment satisfies a `u64`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .raw(key)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;

        coerce(key, value)
    }

    /// Get an optional value; missing keys and empty strings yield `None`
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.raw(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(value) => coerce(key, value).map(Some),
        }
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.get_opt(key)?.unwrap_or(default))
    }

    /// Get a list value from an array or a comma-separated string
    pub fn get_list(&self, key: &str) -> Result<Option<Vec<String>>> {
        match self.raw(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(
                s.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
            Some(value) => coerce(key, value).map(Some),
        }
    }

    /// Check if a key exists
    pub fn has(&self, key: &str) -> bool {
        self.config.read().contains_key(&key.to_lowercase())
    }

    /// Get all configuration keys
    pub fn keys(&self) -> Vec<String> {
        self.config.read().keys().cloned().collect()
    }

    /// Merge configuration from another manager, overriding existing keys
    pub fn merge(&self, other: &ConfigManager) {
        let other_config = other.config.read().clone();
        self.config.write().extend(other_config);
    }

    /// Load and validate the typed Launchpad configuration
    pub fn load_validated(&self) -> Result<LaunchpadConfig> {
        let config = LaunchpadConfig::from_manager(self)?;
        config.validate()?;
        Ok(config)
    }

    fn raw(&self, key: &str) -> Option<Value> {
        self.config.read().get(&key.to_lowercase()).cloned()
    }

    fn extend_strings(&self, values: HashMap<String, String>) {
        let mut config = self.config.write();
        for (key, value) in values {
            config.insert(key, Value::String(value));
        }
    }
}

fn coerce<T: DeserializeOwned>(key: &str, value: Value) -> Result<T> {
    let text = match &value {
        Value::String(s) => Some(s.clone()),
        _ => None,
    };

    serde_json::from_value(value).or_else(|err| {
        text.and_then(|s| serde_json::from_str(s.trim()).ok())
            .ok_or_else(|| ConfigError::WrongType(format!("{}: {}", key, err)))
    })
}
