//! # ibridges-session
//!
//! Session layer for iRODS grid clients: turns connection parameters plus a
//! password or a cached credential into a live, validated session.
//!
//! - [`environment`] - loading and validating `irods_environment.json`
//! - [`session`] - the session state machine, authentication strategies,
//!   failure normalization and the obfuscated `.irodsA` credential cache
//! - [`permissions`] - ACL view over one collection or data object
//! - [`client`] - the surface consumed from the iRODS client library
//!
//! # Architecture
//!
//! ```text
//! ibridges-session
//!   ├─> Environment Loader (mapping or JSON document)
//!   ├─> Session (Unconnected → Connected → Closed)
//!   │     ├─> AuthStrategy (password / cached credential)
//!   │     ├─> GridClient (external wire protocol)
//!   │     └─> Failure Normalizer (library error → SessionError)
//!   ├─> Credential Store (.irodsA obfuscation)
//!   └─> Permission View (ACL read/write)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Client library seam
pub mod client;

/// CLI configuration
pub mod config;

/// Connection environment loading
pub mod environment;

/// Error types
pub mod error;

/// ACL access
pub mod permissions;

/// Session management and authentication
pub mod session;

/// Utility functions
pub mod utils;

pub use client::{ClientError, ClientErrorKind, GridClient, GridConnection, ServerVersion};
pub use environment::ConnectionEnvironment;
pub use error::{ErrorKind, Result, SessionError};
pub use permissions::Permissions;
pub use session::{authenticate, CredentialStore, FailureCause, Session, SessionOptions};
