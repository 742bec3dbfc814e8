//! Error types for chainchat configuration.

use thiserror::Error;

/// Result type alias using chainchat-core's error type.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration and environment errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be interpreted.
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    /// A setting that depends on another one is missing.
    #[error("Missing setting: {0}")]
    Missing(String),
}
