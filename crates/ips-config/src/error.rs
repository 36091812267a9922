//! Error types for configuration and manifest loading

use std::path::PathBuf;
use thiserror::Error;

use ips_core::KernelError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading configuration or manifests
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file or directory
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse JSON
    #[error("failed to parse JSON in {path}: {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to parse YAML
    #[error("failed to parse YAML: {source}")]
    ParseYaml {
        #[source]
        source: serde_yaml::Error,
    },

    /// Expected manifest file is missing
    #[error("manifest not found: {path}")]
    ManifestNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    /// Manifest validation failed
    #[error("validation failed: {message}")]
    ValidationFailed { message: String },
}

impl From<ConfigError> for KernelError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ManifestNotFound { path } => {
                KernelError::not_found("Manifest", path.display())
            }
            other => KernelError::InvalidArgument(other.to_string()),
        }
    }
}
