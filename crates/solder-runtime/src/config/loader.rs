//! Layered configuration loading on top of figment.
//!
//! Sources are merged in a fixed order; later sources override earlier
//! ones:
//!
//! 1. Built-in defaults
//! 2. Programmatic values passed to [`ConfigLoader::merge`]
//! 3. Profile-specific config file (`solder.{profile}.toml`)
//! 4. Main config file (`solder.toml` / `config.toml`)
//! 5. Environment variables (`SOLDER_*`)
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `SOLDER_` prefix with `__` as the nesting
//! separator:
//!
//! - `SOLDER_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `SOLDER_LOGGING__FORMAT=json` → `logging.format = "json"`
//!
//! # Example
//!
//! ```rust,ignore
//! use solder_runtime::config::ConfigLoader;
//!
//! // From default locations
//! let config = ConfigLoader::new().load()?;
//!
//! // From a specific file with env overrides
//! let config = ConfigLoader::new()
//!     .file("./config/solder.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::SolderConfig;

/// Named environment the loader runs under.
///
/// Decides which profile-specific file (`solder.{profile}.toml`) layers
/// beneath the main one.
#[derive(Debug, Clone, Default)]
pub enum Profile {
    /// Local development (default).
    #[default]
    Development,
    /// Production deployment.
    Production,
    /// Anything else, by name.
    Custom(String),
}

impl Profile {
    /// Lowercase name as it appears in file names and logs.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Read `SOLDER_PROFILE`, defaulting to [`Profile::Development`].
    pub fn from_env() -> Self {
        match std::env::var("SOLDER_PROFILE") {
            Ok(value) => Self::named(&value),
            Err(_) => Self::default(),
        }
    }

    fn named(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Builder that assembles the source stack and extracts a validated
/// [`SolderConfig`].
pub struct ConfigLoader {
    overrides: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    read_env: bool,
    explicit_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader with the profile taken from the environment and `SOLDER_*`
    /// overrides enabled.
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            read_env: true,
            explicit_file: None,
        }
    }

    /// Force a profile instead of reading `SOLDER_PROFILE`.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Profile::named(&profile.into());
        self
    }

    /// Add a directory to search for config files. Without any, only the
    /// current directory is searched.
    pub fn search_path(mut self, path: impl AsRef<Path>) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Load exactly this file instead of searching. Loading fails when the
    /// file does not exist.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.explicit_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Re-enable `SOLDER_*` environment overrides (the default).
    pub fn with_env(mut self) -> Self {
        self.read_env = true;
        self
    }

    /// Ignore `SOLDER_*` environment variables.
    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Layer programmatic values above the defaults.
    ///
    /// Config files and environment variables still override them.
    pub fn merge(mut self, config: SolderConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Assemble all sources, extract and validate.
    pub fn load(self) -> ConfigResult<SolderConfig> {
        let profile = self.profile.clone();
        let figment = self.assemble()?;

        let config: SolderConfig = figment.extract()?;
        config.validate()?;

        debug!(%profile, level = %config.logging.level, "Configuration loaded");

        Ok(config)
    }

    fn assemble(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(SolderConfig::default()));
        figment = figment.merge(std::mem::take(&mut self.overrides));

        if let Some(path) = &self.explicit_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            info!(path = %path.display(), "Using explicit configuration file");
            figment = figment.merge(Toml::file(path));
        } else {
            figment = self.merge_found_files(figment);
        }

        if self.read_env {
            trace!("Applying SOLDER_ environment overrides");
            figment = figment.merge(Env::prefixed("SOLDER_").split("__"));
        }

        Ok(figment)
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        if self.search_paths.is_empty() {
            std::env::current_dir().into_iter().collect()
        } else {
            self.search_paths.clone()
        }
    }

    /// Profile variant first, then the base file. The first base file found
    /// ends the search; a profile file alone does not.
    fn merge_found_files(&self, mut figment: Figment) -> Figment {
        let mut found = false;

        'dirs: for dir in self.search_dirs() {
            for stem in ["solder", "config"] {
                let profiled = dir.join(format!("{stem}.{}.toml", self.profile.as_str()));
                if profiled.exists() {
                    debug!(path = %profiled.display(), "Layering profile configuration");
                    figment = figment.merge(Toml::file(&profiled));
                }

                let base = dir.join(format!("{stem}.toml"));
                if base.exists() {
                    info!(path = %base.display(), "Found configuration file");
                    figment = figment.merge(Toml::file(&base));
                    found = true;
                    break 'dirs;
                }
            }
        }

        if !found {
            warn!("No configuration file found, running on defaults");
        }
        figment
    }
}

/// Load from the default locations with environment overrides.
pub fn load_config() -> ConfigResult<SolderConfig> {
    ConfigLoader::new().load()
}

/// Load a specific file, still applying environment overrides.
pub fn load_config_from_file(path: impl AsRef<Path>) -> ConfigResult<SolderConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================
