//! Session Lifecycle
//!
//! [`Session`] owns exactly one live connection handle at a time and moves
//! between three states:
//!
//! ```text
//! Unconnected ──connect──> Connected ──close──> Closed
//!                              ^                  │
//!                              └─────connect──────┘
//! ```
//!
//! `connect` picks an [`AuthStrategy`], delegates to the [`GridClient`], and
//! funnels every failure through [`normalize`]. A handle only counts as live
//! while its server-version probe answers.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::credentials::CredentialStore;
use super::normalize::normalize;
use super::strategy::AuthStrategy;
use crate::client::{ClientError, ClientErrorKind, ConnectRequest, GridClient, GridConnection, ServerVersion};
use crate::environment::{self, home_path, ConnectionEnvironment};
use crate::error::{Result, SessionError};

/// Construction parameters for a [`Session`]
#[derive(Default)]
pub struct SessionOptions {
    environment: Option<ConnectionEnvironment>,
    environment_file: Option<PathBuf>,
    password: Option<Zeroizing<String>>,
    irods_home: Option<String>,
    auth_file: Option<PathBuf>,
}

impl SessionOptions {
    /// Empty options; at least one environment source must be added
    pub fn new() -> Self {
        Self::default()
    }

    /// In-memory connection parameters
    pub fn with_environment(mut self, environment: ConnectionEnvironment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Environment document; supersedes [`Self::with_environment`]
    pub fn with_environment_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.environment_file = Some(path.into());
        self
    }

    /// Plaintext password; selects the password strategy when non-empty
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(Zeroizing::new(password.into()));
        self
    }

    /// Home collection, overriding both the environment and the derived default
    pub fn with_irods_home(mut self, home: impl Into<String>) -> Self {
        self.irods_home = Some(home.into());
        self
    }

    /// Explicit auth file instead of the standard location
    pub fn with_auth_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.auth_file = Some(path.into());
        self
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("environment", &self.environment)
            .field("environment_file", &self.environment_file)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("irods_home", &self.irods_home)
            .field("auth_file", &self.auth_file)
            .finish()
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Never connected
    Unconnected,
    /// Holding a live handle
    Connected,
    /// Handle released; may connect again
    Closed,
}

/// Authenticated session with an iRODS grid
pub struct Session<C: GridClient> {
    client: C,
    environment: ConnectionEnvironment,
    environment_file: Option<PathBuf>,
    password: Option<Zeroizing<String>>,
    home_override: Option<String>,
    credentials: CredentialStore,
    connection: Option<Box<dyn GridConnection>>,
    strategy: Option<AuthStrategy>,
    state: SessionState,
}

impl<C: GridClient> Session<C> {
    /// Load the environment without connecting
    pub fn new(client: C, options: SessionOptions) -> Result<Self> {
        if let Some(home) = options.irods_home.as_deref().filter(|h| !h.starts_with('/')) {
            return Err(SessionError::Configuration(format!(
                "irods_home must be an absolute path: {}",
                home
            )));
        }

        let loaded = environment::load(options.environment, options.environment_file.as_deref())?;

        let credentials = match options.auth_file {
            Some(path) => CredentialStore::new(path),
            None => CredentialStore::at_default_location(loaded.path.as_deref()),
        };
        debug!("Auth file location: {:?}", credentials.path());

        Ok(Self {
            client,
            environment: loaded.environment,
            environment_file: loaded.path,
            password: options.password,
            home_override: options.irods_home,
            credentials,
            connection: None,
            strategy: None,
            state: SessionState::Unconnected,
        })
    }

    /// Load the environment and connect
    pub fn open(client: C, options: SessionOptions) -> Result<Self> {
        let mut session = Self::new(client, options)?;
        session.connect()?;
        Ok(session)
    }

    /// Establish the connection
    ///
    /// Already-valid sessions are left alone. A handle whose far end has
    /// died is released before reconnecting.
    pub fn connect(&mut self) -> Result<&dyn GridConnection> {
        if self.has_valid_session() {
            debug!("Session already connected, reusing handle");
            return self.handle();
        }
        self.release();

        let user = self.environment.user_name().to_string();
        let password = self.password.as_deref().map(String::as_str);
        let strategy = AuthStrategy::select(&user, password);

        let request = match strategy {
            AuthStrategy::Password => ConnectRequest::Password {
                environment: &self.environment,
                password: password.unwrap_or_default(),
            },
            AuthStrategy::CachedCredential => ConnectRequest::AuthFile {
                environment: &self.environment,
                environment_file: self.environment_file.as_deref(),
                auth_file: self.credentials.path(),
            },
            AuthStrategy::Anonymous => {
                warn!("Anonymous login requested; not supported");
                return Err(SessionError::UnsupportedAuth(user));
            }
        };

        info!(
            strategy = %strategy,
            host = self.environment.irods_host.as_deref().unwrap_or_default(),
            user = %user,
            "Authenticating with iRODS server"
        );

        let mut connection = self.client.connect(&request).map_err(normalize)?;

        let version = match connection.server_version() {
            Ok(version) if !version.is_empty() => version,
            Ok(_) => {
                connection.cleanup();
                return Err(SessionError::Connection(ClientError::new(
                    ClientErrorKind::Network,
                    "server did not report a version",
                )));
            }
            Err(e) => {
                connection.cleanup();
                return Err(normalize(e));
            }
        };

        info!(
            "Connected to {}:{} as {}#{} (server {})",
            connection.host(),
            connection.port(),
            connection.username(),
            connection.zone(),
            version
        );

        if let Some(home) = &self.home_override {
            self.environment.irods_home = Some(home.clone());
        } else if self.environment.irods_home.is_none() {
            let home = home_path(&connection.zone(), &connection.username());
            debug!("Derived home collection {}", home);
            self.environment.irods_home = Some(home);
        }

        self.connection = Some(connection);
        self.strategy = Some(strategy);
        self.state = SessionState::Connected;
        self.handle()
    }

    /// True iff a handle exists and its server still answers
    pub fn has_valid_session(&self) -> bool {
        self.connection
            .as_deref()
            .is_some_and(|c| matches!(c.server_version(), Ok(v) if !v.is_empty()))
    }

    /// Release the handle; a no-op when there is none
    pub fn close(&mut self) {
        if self.release() {
            info!("iRODS session closed");
        }
    }

    /// Drop the handle and the state tied to it
    fn release(&mut self) -> bool {
        match self.connection.take() {
            Some(mut connection) => {
                connection.cleanup();
                self.strategy = None;
                self.state = SessionState::Closed;
                true
            }
            None => false,
        }
    }

    /// Persist the PAM password negotiated by the last authentication
    ///
    /// Returns whether anything was written. Without a negotiated password
    /// this only warns.
    pub fn write_cached_secret(&self) -> Result<bool> {
        let Some(connection) = self.connection.as_deref() else {
            warn!("Unable to cache obfuscated password locally: no active session");
            return Ok(false);
        };

        let negotiated: Vec<Zeroizing<String>> = connection
            .pam_passwords_negotiated()
            .into_iter()
            .map(Zeroizing::new)
            .collect();

        match negotiated.first() {
            Some(password) => {
                self.credentials.write(password)?;
                Ok(true)
            }
            None => {
                warn!("Unable to cache obfuscated password locally: no PAM password negotiated");
                Ok(false)
            }
        }
    }

    /// Enter a scope that reconnects if needed and always closes on exit
    pub fn scoped(&mut self) -> Result<SessionGuard<'_, C>> {
        if !self.has_valid_session() {
            self.connect()?;
        }
        Ok(SessionGuard { session: self })
    }

    /// Run `f` inside [`Self::scoped`]
    pub fn with_connection<R>(&mut self, f: impl FnOnce(&mut Session<C>) -> Result<R>) -> Result<R> {
        let mut guard = self.scoped()?;
        f(&mut *guard)
    }

    /// Replace the password used by the next `connect`
    pub fn set_password(&mut self, password: Option<String>) {
        self.password = password.map(Zeroizing::new);
    }

    /// Live handle, if connected
    pub fn connection(&self) -> Option<&dyn GridConnection> {
        self.connection.as_deref()
    }

    fn handle(&self) -> Result<&dyn GridConnection> {
        self.connection.as_deref().ok_or(SessionError::NotConnected)
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Strategy behind the live handle
    pub fn strategy(&self) -> Option<AuthStrategy> {
        self.strategy
    }

    /// Connection parameters in use
    pub fn environment(&self) -> &ConnectionEnvironment {
        &self.environment
    }

    /// Environment document, when loaded from disk
    pub fn environment_file(&self) -> Option<&Path> {
        self.environment_file.as_deref()
    }

    /// Auth file used by the cached strategy
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Home collection (`irods_home`), once known
    pub fn home(&self) -> Option<&str> {
        self.environment.irods_home.as_deref()
    }

    /// Override the home collection
    pub fn set_home(&mut self, home: impl Into<String>) {
        self.environment.irods_home = Some(home.into());
    }

    /// Server host, empty when unconnected
    pub fn host(&self) -> String {
        self.connection.as_deref().map(|c| c.host()).unwrap_or_default()
    }

    /// Server port, 0 when unconnected
    pub fn port(&self) -> u16 {
        self.connection.as_deref().map(|c| c.port()).unwrap_or_default()
    }

    /// Authenticated user, empty when unconnected
    pub fn username(&self) -> String {
        self.connection
            .as_deref()
            .map(|c| c.username())
            .unwrap_or_default()
    }

    /// Zone, empty when unconnected
    pub fn zone(&self) -> String {
        self.connection.as_deref().map(|c| c.zone()).unwrap_or_default()
    }

    /// Server version, 0.0.0 when unconnected
    pub fn server_version(&self) -> Result<ServerVersion> {
        match self.connection.as_deref() {
            Some(connection) => connection.server_version().map_err(normalize),
            None => Ok(ServerVersion::default()),
        }
    }

    /// Default resource configured on the server
    pub fn default_resource(&self) -> Result<String> {
        self.connection
            .as_deref()
            .and_then(|c| c.default_resource())
            .ok_or_else(|| {
                SessionError::Configuration(
                    "'irods_default_resource' not set in iRODS configuration".to_string(),
                )
            })
    }
}

impl<C: GridClient> Drop for Session<C> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<C: GridClient> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("strategy", &self.strategy)
            .field("environment", &self.environment)
            .field("environment_file", &self.environment_file)
            .field("auth_file", &self.credentials.path())
            .finish_non_exhaustive()
    }
}

/// Scope guard returned by [`Session::scoped`]; closes the session on drop
pub struct SessionGuard<'a, C: GridClient> {
    session: &'a mut Session<C>,
}

impl<C: GridClient> Deref for SessionGuard<'_, C> {
    type Target = Session<C>;

    fn deref(&self) -> &Self::Target {
        self.session
    }
}

impl<C: GridClient> DerefMut for SessionGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session
    }
}

impl<C: GridClient> Drop for SessionGuard<'_, C> {
    fn drop(&mut self) {
        self.session.close();
    }
}
