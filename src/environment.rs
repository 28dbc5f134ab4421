//! Connection Environment
//!
//! Loads and validates the iRODS connection parameters, either from an
//! in-memory mapping or from the `irods_environment.json` document the
//! icommands use. Known keys are parsed into [`ConnectionEnvironment`];
//! anything else (UI-only keys such as `ui_tabs`) is kept verbatim in
//! [`ConnectionEnvironment::extra`] and written back unchanged.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};

/// Environment variable overriding the environment document location
pub const ENVIRONMENT_FILE_VAR: &str = "IRODS_ENVIRONMENT_FILE";

/// Default environment document, relative to the home directory
pub const DEFAULT_ENVIRONMENT_FILE: &str = ".irods/irods_environment.json";

const NEGOTIATION_POLICIES: [&str; 3] = ["CS_NEG_REFUSE", "CS_NEG_REQUIRE", "CS_NEG_DONT_CARE"];

/// iRODS connection parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEnvironment {
    /// Server host name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irods_host: Option<String>,

    /// Server port (1247 on a stock install)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irods_port: Option<u16>,

    /// Zone name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irods_zone_name: Option<String>,

    /// User name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irods_user_name: Option<String>,

    /// Explicit home collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irods_home: Option<String>,

    /// Default storage resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irods_default_resource: Option<String>,

    /// Authentication scheme ("native", "pam", "pam_password")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irods_authentication_scheme: Option<String>,

    /// Client side of the TLS negotiation ("CS_NEG_REQUIRE", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irods_client_server_policy: Option<String>,

    /// Negotiation mode ("request_server_negotiation")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irods_client_server_negotiation: Option<String>,

    /// TLS certificate verification ("cert", "hostname", "none")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irods_ssl_verify_server: Option<String>,

    /// Encryption algorithm for parallel transfer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irods_encryption_algorithm: Option<String>,

    /// Keys this crate does not interpret, passed through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConnectionEnvironment {
    /// Parse an in-memory mapping
    pub fn from_map(map: Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(map)).map_err(|e| {
            SessionError::Configuration(format!("Unexpected value in irods environment: {}", e))
        })
    }

    /// Parse the environment document at `path`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_tilde(path.as_ref());

        if !path.is_file() {
            return Err(SessionError::Configuration(format!(
                "{} path does not exist",
                path.display()
            )));
        }

        let content = fs::read_to_string(&path).map_err(|e| SessionError::io(&path, e))?;
        let value: Value =
            serde_json::from_str(&content).map_err(|source| SessionError::EnvironmentParse {
                path: path.clone(),
                source,
            })?;

        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(SessionError::Configuration(format!(
                    "Error reading environment file '{}': expected a mapping, got {}",
                    path.display(),
                    json_type_name(&other)
                )))
            }
        };

        debug!("Loaded {} keys from {:?}", map.len(), path);
        Self::from_map(map)
    }

    /// Write the document as 4-space indented JSON with sorted keys
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = expand_tilde(path.as_ref());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SessionError::io(parent, e))?;
        }

        // Round-trip through Value so every key, known or not, comes out sorted
        let value = serde_json::to_value(self)
            .map_err(|e| SessionError::Configuration(format!("Cannot serialize environment: {}", e)))?;

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        value
            .serialize(&mut serializer)
            .map_err(|e| SessionError::Configuration(format!("Cannot serialize environment: {}", e)))?;

        fs::write(&path, buf).map_err(|e| SessionError::io(&path, e))?;
        info!("Environment written to {:?}", path);
        Ok(())
    }

    /// Reject values no server would accept
    pub fn validate(&self) -> Result<()> {
        if self.irods_port == Some(0) {
            return Err(SessionError::Configuration(
                "irods_port must be a non-zero port number".to_string(),
            ));
        }

        if let Some(policy) = &self.irods_client_server_policy {
            if !NEGOTIATION_POLICIES.contains(&policy.as_str()) {
                return Err(SessionError::Configuration(format!(
                    "Invalid irods_client_server_policy: {}",
                    policy
                )));
            }
        }

        if let Some(home) = &self.irods_home {
            if !home.starts_with('/') {
                return Err(SessionError::Configuration(format!(
                    "irods_home must be an absolute path: {}",
                    home
                )));
            }
        }

        Ok(())
    }

    /// Configured user name, empty when absent
    pub fn user_name(&self) -> &str {
        self.irods_user_name.as_deref().unwrap_or_default()
    }

    /// `/{zone}/home/{user}` from the configured zone and user, if both are set
    pub fn derived_home(&self) -> Option<String> {
        match (&self.irods_zone_name, &self.irods_user_name) {
            (Some(zone), Some(user)) => Some(home_path(zone, user)),
            _ => None,
        }
    }
}

/// An environment together with the document it came from
#[derive(Debug, Clone)]
pub struct LoadedEnvironment {
    /// Validated parameters
    pub environment: ConnectionEnvironment,
    /// Source document, when loaded from disk
    pub path: Option<PathBuf>,
}

/// Resolve the authoritative environment from the available sources
///
/// The document at `path` supersedes `mapping` when both are given.
pub fn load(
    mapping: Option<ConnectionEnvironment>,
    path: Option<&Path>,
) -> Result<LoadedEnvironment> {
    let loaded = match (mapping, path) {
        (None, None) => {
            return Err(SessionError::Configuration(
                "No irods environment given".to_string(),
            ))
        }
        (Some(environment), None) => LoadedEnvironment {
            environment,
            path: None,
        },
        (mapping, Some(path)) => {
            if mapping.is_some() {
                warn!("Environment mapping will be overwritten with irods environment file");
            }
            let path = expand_tilde(path);
            LoadedEnvironment {
                environment: ConnectionEnvironment::from_file(&path)?,
                path: Some(path),
            }
        }
    };

    loaded.environment.validate()?;
    Ok(loaded)
}

/// Home collection of `user` in `zone`
pub fn home_path(zone: &str, user: &str) -> String {
    format!("/{}/home/{}", zone, user)
}

/// Environment document location: `$IRODS_ENVIRONMENT_FILE` or `~/.irods/irods_environment.json`
pub fn default_environment_file() -> PathBuf {
    environment_file_from(std::env::var_os(ENVIRONMENT_FILE_VAR))
}

fn environment_file_from(var: Option<OsString>) -> PathBuf {
    match var.filter(|v| !v.is_empty()) {
        Some(value) => expand_tilde(Path::new(&value)),
        None => home_dir().join(DEFAULT_ENVIRONMENT_FILE),
    }
}

/// Expands `~` to the home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
