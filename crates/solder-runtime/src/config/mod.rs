//! Configuration management for the runtime.
//!
//! Supports layered configuration from TOML files, environment variables
//! and programmatic overrides, with validation at load time.

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LoggingConfig, SolderConfig, SpanEventConfig,
};
