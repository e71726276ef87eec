// Configuration errors

use thiserror::Error;

/// Errors raised while collecting, converting or validating settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required key has no value in any source.
    #[error("missing configuration key '{0}'")]
    MissingKey(String),

    /// A source (file, dotenv) could not be read.
    #[error("cannot read configuration: {0}")]
    Unreadable(String),

    /// A source was read but its content is malformed.
    #[error("malformed configuration: {0}")]
    Malformed(String),

    /// Values parsed but violate a rule.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// A value could not be converted into the internal JSON form.
    #[error("cannot encode configuration value: {0}")]
    Encode(String),

    /// A value exists but has the wrong shape for its key.
    #[error("wrong type for {0}")]
    WrongType(String),

    #[error("environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
