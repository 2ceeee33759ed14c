//! Error types for configuration loading

use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML in {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("secret '{key}' not found in {path}")]
    SecretNotFound { key: String, path: PathBuf },

    #[error("invalid argument to {tag}: {reason}")]
    InvalidTag { tag: &'static str, reason: String },

    #[error("circular include detected: {path}")]
    CircularInclude { path: PathBuf },

    #[error("environment variable '{var}' not set")]
    EnvVarNotFound { var: String },

    /// A required entry field is absent or empty
    #[error("missing required option '{key}'")]
    MissingValue { key: &'static str },

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: &'static str, reason: String },

    /// Two entries configure the same device
    #[error("device '{device_id}' is configured more than once")]
    DuplicateDevice { device_id: String },
}
