//! iRODS Session Management
//!
//! Turns a connection environment plus either a password or a cached
//! credential into a live, validated session handle.
//!
//! # Architecture
//!
//! ```text
//! Session
//!   ├─> environment::load        (mapping or irods_environment.json)
//!   ├─> AuthStrategy::select     (password / cached credential / anonymous)
//!   ├─> GridClient::connect      (external client library)
//!   │     └─> normalize          (library failure -> SessionError)
//!   └─> CredentialStore          (obfuscated .irodsA)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use ibridges_session::session::{Session, SessionOptions};
//!
//! let options = SessionOptions::new()
//!     .with_environment_file("~/.irods/irods_environment.json")
//!     .with_password(password);
//! let session = Session::open(client, options)?;
//! session.write_cached_secret()?;
//!
//! // Later, password-less
//! let session = Session::open(client, SessionOptions::new()
//!     .with_environment_file("~/.irods/irods_environment.json"))?;
//! ```

pub mod authenticate;
pub mod credentials;
pub mod lifecycle;
pub mod normalize;
pub mod obfuscation;
pub mod strategy;

pub use authenticate::{authenticate, PasswordPrompt};
pub use credentials::{CredentialStore, AUTH_FILE_VAR};
pub use lifecycle::{Session, SessionGuard, SessionOptions, SessionState};
pub use normalize::{classify, normalize, FailureCause};
pub use strategy::AuthStrategy;
