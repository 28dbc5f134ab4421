//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the iRODS connection settings live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrodsConfig {
    /// Environment document (irods_environment.json)
    pub environment_file: PathBuf,

    /// Auth file override (None = standard resolution)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_file: Option<PathBuf>,

    /// Home collection override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irods_home: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    pub level: String,

    /// Output format ("pretty", "compact", "json")
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for log files (None = console only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}
