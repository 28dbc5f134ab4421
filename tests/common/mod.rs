//! Shared fixtures: an in-memory grid that authenticates against fixed
//! credentials and counts what the session asks of it.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use ibridges_session::client::{
    AclUpdate, ConnectRequest, GridClient, GridConnection, ItemRef, PermissionEntry,
};
use ibridges_session::{ClientError, ClientErrorKind, CredentialStore, ServerVersion};
use serde_json::json;

/// Server-side state shared by every clone of a [`FakeGrid`]
#[derive(Debug)]
pub struct GridState {
    pub host: String,
    pub port: u16,
    pub zone: String,
    pub user: String,
    pub password: String,
    pub pam_password: Option<String>,
    pub version: ServerVersion,
    pub default_resource: Option<String>,
    pub forced_failure: Option<ClientError>,
    pub alive: bool,
    pub requested_host: Option<String>,
    pub connects: usize,
    pub password_logins: usize,
    pub cached_logins: usize,
    pub cleanups: usize,
}

impl Default for GridState {
    fn default() -> Self {
        Self {
            host: "irods.example.org".to_string(),
            port: 1247,
            zone: "tempZone".to_string(),
            user: "alice".to_string(),
            password: "correct horse".to_string(),
            pam_password: Some("pam-negotiated-7f3a".to_string()),
            version: ServerVersion::new(4, 3, 1),
            default_resource: Some("demoResc".to_string()),
            forced_failure: None,
            alive: true,
            requested_host: None,
            connects: 0,
            password_logins: 0,
            cached_logins: 0,
            cleanups: 0,
        }
    }
}

/// Grid client double
#[derive(Clone, Default)]
pub struct FakeGrid {
    state: Arc<Mutex<GridState>>,
}

impl FakeGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, GridState> {
        self.state.lock().unwrap()
    }

    fn accepts_cached(&self, auth_file: &Path) -> Result<(), ClientError> {
        let stored = CredentialStore::new(auth_file)
            .read()
            .map_err(|e| ClientError::unknown(e.to_string()))?
            .ok_or_else(|| ClientError::new(ClientErrorKind::NoCachedPassword, "None,"))?;

        let state = self.state();
        let matches_password = stored.as_str() == state.password;
        let matches_pam = state.pam_password.as_deref() == Some(stored.as_str());
        if matches_password || matches_pam {
            Ok(())
        } else {
            Err(ClientError::new(
                ClientErrorKind::InvalidAuthentication,
                "None,",
            ))
        }
    }
}

impl GridClient for FakeGrid {
    fn connect(&self, request: &ConnectRequest<'_>) -> Result<Box<dyn GridConnection>, ClientError> {
        {
            let mut state = self.state();
            state.connects += 1;
            state.requested_host = request.environment().irods_host.clone();
            if let Some(failure) = state.forced_failure.clone() {
                return Err(failure);
            }
        }

        match request {
            ConnectRequest::Password { password, .. } => {
                let mut state = self.state();
                state.password_logins += 1;
                if *password != state.password {
                    return Err(ClientError::new(
                        ClientErrorKind::PamPasswordFailed,
                        "None,",
                    ));
                }
            }
            ConnectRequest::AuthFile { auth_file, .. } => {
                self.state().cached_logins += 1;
                self.accepts_cached(auth_file)?;
            }
        }

        let mut state = self.state();
        state.alive = true;
        let negotiated = match request {
            ConnectRequest::Password { .. } => state.pam_password.clone().into_iter().collect(),
            ConnectRequest::AuthFile { .. } => Vec::new(),
        };

        Ok(Box::new(FakeConnection {
            state: Arc::clone(&self.state),
            negotiated,
        }))
    }
}

struct FakeConnection {
    state: Arc<Mutex<GridState>>,
    negotiated: Vec<String>,
}

impl FakeConnection {
    fn state(&self) -> MutexGuard<'_, GridState> {
        self.state.lock().unwrap()
    }
}

impl GridConnection for FakeConnection {
    fn server_version(&self) -> Result<ServerVersion, ClientError> {
        let state = self.state();
        if state.alive {
            Ok(state.version)
        } else {
            Err(ClientError::new(
                ClientErrorKind::Network,
                "connection reset by peer",
            ))
        }
    }

    fn host(&self) -> String {
        self.state().host.clone()
    }

    fn port(&self) -> u16 {
        self.state().port
    }

    fn zone(&self) -> String {
        self.state().zone.clone()
    }

    fn username(&self) -> String {
        self.state().user.clone()
    }

    fn default_resource(&self) -> Option<String> {
        self.state().default_resource.clone()
    }

    fn pam_passwords_negotiated(&self) -> Vec<String> {
        self.negotiated.clone()
    }

    fn cleanup(&mut self) {
        self.state().cleanups += 1;
    }

    fn collection(&self, path: &str) -> Result<ItemRef, ClientError> {
        Ok(ItemRef::collection(path))
    }

    fn data_object(&self, path: &str) -> Result<ItemRef, ClientError> {
        Ok(ItemRef::data_object(path))
    }

    fn inheritance(&self, _collection: &ItemRef) -> Result<bool, ClientError> {
        Ok(false)
    }

    fn acls(&self, _item: &ItemRef) -> Result<Vec<PermissionEntry>, ClientError> {
        Ok(Vec::new())
    }

    fn set_acl(&self, _update: &AclUpdate, _recursive: bool, _admin: bool) -> Result<(), ClientError> {
        Ok(())
    }

    fn available_permissions(&self) -> Option<BTreeMap<String, String>> {
        None
    }
}

/// Write an environment document for the default grid into `dir`
pub fn write_environment(dir: &Path) -> PathBuf {
    write_environment_with(dir, json!({}))
}

/// Like [`write_environment`], with `overrides` merged over the defaults
pub fn write_environment_with(dir: &Path, overrides: serde_json::Value) -> PathBuf {
    let mut document = json!({
        "irods_host": "irods.example.org",
        "irods_port": 1247,
        "irods_zone_name": "tempZone",
        "irods_user_name": "alice",
        "irods_authentication_scheme": "pam_password",
        "irods_client_server_policy": "CS_NEG_REQUIRE",
        "ui_tabs": ["tabBrowser", "tabUpDownload"]
    });
    if let (Some(base), Some(extra)) = (document.as_object_mut(), overrides.as_object()) {
        for (key, value) in extra {
            base.insert(key.clone(), value.clone());
        }
    }

    let path = dir.join("irods_environment.json");
    std::fs::write(&path, serde_json::to_string_pretty(&document).unwrap()).unwrap();
    path
}
