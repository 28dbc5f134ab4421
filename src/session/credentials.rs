//! Cached Credential Storage
//!
//! Reads and writes the obfuscated `.irodsA` auth file that enables
//! password-less reconnection. The format is the reference client's, so a
//! file written here is accepted by the icommands and vice versa.
//!
//! # Location
//!
//! 1. `$IRODS_AUTHENTICATION_FILE`
//! 2. `.irodsA` next to the environment document in use
//! 3. `~/.irods/.irodsA`
//!
//! Concurrent writers are not serialised: last writer wins.

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zeroize::Zeroizing;

use super::obfuscation;
use crate::environment::expand_tilde;
use crate::error::{Result, SessionError};

/// Environment variable overriding the auth file location
pub const AUTH_FILE_VAR: &str = "IRODS_AUTHENTICATION_FILE";

/// Auth file name
pub const AUTH_FILE_NAME: &str = ".irodsA";

/// Resolve the auth file location for an environment document
pub fn default_auth_file(environment_file: Option<&Path>) -> PathBuf {
    auth_file_from(std::env::var_os(AUTH_FILE_VAR), environment_file)
}

fn auth_file_from(var: Option<OsString>, environment_file: Option<&Path>) -> PathBuf {
    if let Some(value) = var.filter(|v| !v.is_empty()) {
        return expand_tilde(Path::new(&value));
    }

    if let Some(dir) = environment_file.and_then(Path::parent) {
        if !dir.as_os_str().is_empty() {
            return dir.join(AUTH_FILE_NAME);
        }
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".irods")
        .join(AUTH_FILE_NAME)
}

/// Obfuscate `password` and write it to `destination`
///
/// Parent directories are created as needed. On Unix the file is opened
/// owner-only, so the secret is never readable by others.
pub fn write_obfuscated(password: &str, destination: &Path) -> Result<()> {
    let encoded = Zeroizing::new(obfuscation::encode(
        password,
        current_uid(),
        chrono::Utc::now().timestamp(),
    ));

    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| SessionError::io(parent, e))?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(destination)
        .map_err(|e| SessionError::io(destination, e))?;

    // mode() only applies on creation; tighten an existing file before writing
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| SessionError::io(destination, e))?;
    }

    file.write_all(encoded.as_bytes())
        .map_err(|e| SessionError::io(destination, e))?;

    debug!("Obfuscated password written to {:?}", destination);
    Ok(())
}

/// Handle on one auth file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store at an explicit location
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: expand_tilde(&path.into()),
        }
    }

    /// Store at the standard location for `environment_file`
    pub fn at_default_location(environment_file: Option<&Path>) -> Self {
        Self {
            path: default_auth_file(environment_file),
        }
    }

    /// Auth file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a cached credential exists
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Persist `password` in obfuscated form
    pub fn write(&self, password: &str) -> Result<()> {
        write_obfuscated(password, &self.path)?;
        info!("Cached credential stored at {:?}", self.path);
        Ok(())
    }

    /// Decode the cached password; `None` if there is no auth file
    pub fn read(&self) -> Result<Option<Zeroizing<String>>> {
        if !self.exists() {
            debug!("No auth file at {:?}", self.path);
            return Ok(None);
        }

        let raw = Zeroizing::new(
            fs::read_to_string(&self.path).map_err(|e| SessionError::io(&self.path, e))?,
        );
        let trimmed = raw.trim_end_matches(['\n', '\r']);

        obfuscation::decode(trimmed, current_uid())
            .map(|password| Some(Zeroizing::new(password)))
            .map_err(|e| SessionError::MalformedAuthFile {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }

    /// Remove the auth file; returns whether one was present
    pub fn clear(&self) -> Result<bool> {
        if !self.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path).map_err(|e| SessionError::io(&self.path, e))?;
        info!("Cached credential removed from {:?}", self.path);
        Ok(true)
    }
}

/// Real user id, the obfuscation salt
pub(crate) fn current_uid() -> u32 {
    #[cfg(unix)]
    {
        unsafe { libc::getuid() }
    }
    #[cfg(not(unix))]
    {
        0
    }
}
