//! Error type for configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while loading or validating the runtime configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The layered sources could not be merged into a typed configuration.
    #[error("failed to extract configuration: {0}")]
    ExtractError(#[from] figment::Error),

    /// A loaded value failed a semantic check.
    #[error("invalid configuration: {message}")]
    ValidationError {
        /// What was wrong with it.
        message: String,
    },
}

impl ConfigError {
    /// Build a [`ConfigError::ValidationError`] from any message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

/// Shorthand for fallible configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
