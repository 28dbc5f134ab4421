//! Configuration management
//!
//! The CLI reads an optional TOML file naming the environment document,
//! auth file and logging defaults. Command-line flags override it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod types;

pub use types::{IrodsConfig, LoggingConfig};

use crate::environment;

/// Accepted values for `logging.level`
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Accepted values for `logging.format`
const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// iRODS connection file locations
    pub irods: IrodsConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        config.irods.environment_file = environment::expand_tilde(&config.irods.environment_file);

        config.validate()?;
        Ok(config)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Config {
            irods: IrodsConfig {
                environment_file: environment::default_environment_file(),
                auth_file: None,
                irods_home: None,
            },
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.irods.environment_file.as_os_str().is_empty() {
            anyhow::bail!("irods.environment_file must not be empty");
        }

        if let Some(home) = &self.irods.irods_home {
            if !home.starts_with('/') {
                anyhow::bail!("irods.irods_home must be an absolute path: {}", home);
            }
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }

        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            anyhow::bail!("Invalid log format: {}", self.logging.format);
        }

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(
        mut self,
        environment_file: Option<PathBuf>,
        auth_file: Option<PathBuf>,
        log_format: Option<String>,
    ) -> Self {
        if let Some(path) = environment_file {
            self.irods.environment_file = environment::expand_tilde(&path);
        }
        if let Some(path) = auth_file {
            self.irods.auth_file = Some(environment::expand_tilde(&path));
        }
        if let Some(format) = log_format {
            self.logging.format = format;
        }

        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
