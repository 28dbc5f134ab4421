//! Interactive Login
//!
//! Tries the cheapest way in first:
//!
//! 1. cached credential, when an auth file exists
//! 2. the password the caller supplied
//! 3. a password obtained from a [`PasswordPrompt`]
//!
//! Rejected credentials fall through to the next step. A successful
//! password login caches the negotiated PAM password for next time.

use std::path::Path;

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::credentials::CredentialStore;
use super::lifecycle::{Session, SessionOptions};
use crate::client::GridClient;
use crate::environment::expand_tilde;
use crate::error::{ErrorKind, Result, SessionError};

/// Source of a password when nothing else worked
pub trait PasswordPrompt {
    /// Ask for the password, displaying `message`
    fn prompt(&mut self, message: &str) -> Result<Zeroizing<String>>;
}

impl<F> PasswordPrompt for F
where
    F: FnMut(&str) -> Result<Zeroizing<String>>,
{
    fn prompt(&mut self, message: &str) -> Result<Zeroizing<String>> {
        self(message)
    }
}

/// Prompt shown before asking for a password
pub const PASSWORD_PROMPT: &str = "Your iRODS password: ";

/// Log in using the environment document at `environment_file`
pub fn authenticate<C, P>(
    client: C,
    environment_file: &Path,
    password: Option<&str>,
    prompt: &mut P,
) -> Result<Session<C>>
where
    C: GridClient + Clone,
    P: PasswordPrompt + ?Sized,
{
    let environment_file = expand_tilde(environment_file);
    if !environment_file.is_file() {
        return Err(SessionError::Configuration(format!(
            "File not found: {}",
            environment_file.display()
        )));
    }
    let options = || SessionOptions::new().with_environment_file(&environment_file);

    let cache = CredentialStore::at_default_location(Some(environment_file.as_path()));
    if cache.exists() {
        match Session::open(client.clone(), options()) {
            Ok(session) => {
                info!("Authenticated with cached credential");
                return Ok(session);
            }
            Err(e) if is_rejection(&e) => debug!("Cached credential not usable: {}", e),
            Err(e) => return Err(e),
        }
    }

    if let Some(password) = password.filter(|p| !p.is_empty()) {
        match login(client.clone(), options().with_password(password)) {
            Ok(session) => return Ok(session),
            Err(e) if is_rejection(&e) => warn!("Supplied password not accepted: {}", e),
            Err(e) => return Err(e),
        }
    }

    let password = prompt.prompt(PASSWORD_PROMPT)?;
    login(client, options().with_password(password.as_str()))
}

fn login<C: GridClient>(client: C, options: SessionOptions) -> Result<Session<C>> {
    let session = Session::open(client, options)?;
    if session.strategy().is_some_and(|s| s.caches_secret()) {
        session.write_cached_secret()?;
    }
    Ok(session)
}

fn is_rejection(error: &SessionError) -> bool {
    matches!(error.kind(), ErrorKind::Authentication | ErrorKind::Credential)
}
