//! Grid Client Seam
//!
//! The iRODS wire protocol is provided by an external client library. This
//! module defines the surface the session layer consumes from it, so that any
//! library binding (or a test double) can sit underneath [`crate::session::Session`].
//!
//! # Architecture
//!
//! ```text
//! Session
//!   └─> GridClient::connect(ConnectRequest)
//!         └─> Box<dyn GridConnection>   (one live handle, owned by the Session)
//!               ├─> server_version / host / port / zone / username
//!               ├─> default_resource / pam_passwords_negotiated
//!               └─> collection / data_object / acls / set_acl
//! ```
//!
//! Failures are reported as [`ClientError`] carrying a structured
//! [`ClientErrorKind`] where the library can provide one, plus the raw
//! message for diagnostics.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::environment::ConnectionEnvironment;

/// Structured failure kinds reported by the client library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientErrorKind {
    /// Client/server negotiation refused (CS_NEG_REFUSE vs CS_NEG_REQUIRE)
    NegotiationRefused,
    /// Server does not know the user (CAT_INVALID_USER)
    InvalidUser,
    /// PAM rejected the password (PAM_AUTH_PASSWORD_FAILED)
    PamPasswordFailed,
    /// Cached password has expired (CAT_PASSWORD_EXPIRED)
    PasswordExpired,
    /// Cached credential did not authenticate (CAT_INVALID_AUTHENTICATION)
    InvalidAuthentication,
    /// No cached password available for a non-anonymous login
    NoCachedPassword,
    /// A connection parameter has an unusable value
    InvalidConfigValue,
    /// Collection lookup failed
    CollectionDoesNotExist,
    /// Data object lookup failed
    DataObjectDoesNotExist,
    /// Server rejected an argument (CAT_INVALID_ARGUMENT)
    InvalidArgument,
    /// Transport-level failure
    Network,
    /// Library gave no structured kind
    Unknown,
}

impl ClientErrorKind {
    /// Server-side error code name, as the reference client reports it
    pub fn code(&self) -> &'static str {
        match self {
            Self::NegotiationRefused => "CS_NEG_REFUSE",
            Self::InvalidUser => "CAT_INVALID_USER",
            Self::PamPasswordFailed => "PAM_AUTH_PASSWORD_FAILED",
            Self::PasswordExpired => "CAT_PASSWORD_EXPIRED",
            Self::InvalidAuthentication => "CAT_INVALID_AUTHENTICATION",
            Self::NoCachedPassword => "NonAnonymousLoginWithoutPassword",
            Self::InvalidConfigValue => "InvalidConfigValue",
            Self::CollectionDoesNotExist => "CollectionDoesNotExist",
            Self::DataObjectDoesNotExist => "DataObjectDoesNotExist",
            Self::InvalidArgument => "CAT_INVALID_ARGUMENT",
            Self::Network => "NetworkException",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ClientErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error raised by the client library
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}({message})")]
pub struct ClientError {
    /// Structured kind, `Unknown` when the library could not classify it
    pub kind: ClientErrorKind,
    /// Raw library message
    pub message: String,
}

impl ClientError {
    /// Create a new client error
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Unclassified error carrying only a message
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Unknown, message)
    }

    /// Diagnostic signature: kind code plus raw message
    pub fn signature(&self) -> String {
        self.to_string()
    }
}

/// iRODS server version triple
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerVersion {
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
    /// Patch level
    pub patch: u32,
}

impl ServerVersion {
    /// Create a version triple
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// A zero version means the server never answered the probe
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Kind of namespace node an ACL is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// Directory-like node
    Collection,
    /// File-like leaf
    DataObject,
}

/// Reference to a collection or data object on the grid
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemRef {
    /// Node kind
    pub kind: ItemKind,
    /// Absolute logical path
    pub path: String,
}

impl ItemRef {
    /// Reference a collection
    pub fn collection(path: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Collection,
            path: path.into(),
        }
    }

    /// Reference a data object
    pub fn data_object(path: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::DataObject,
            path: path.into(),
        }
    }

    /// True for collections
    pub fn is_collection(&self) -> bool {
        self.kind == ItemKind::Collection
    }
}

/// One ACL entry on a collection or data object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionEntry {
    /// User or group name
    pub user_name: String,
    /// Zone of the user
    pub user_zone: String,
    /// Access level ("own", "modify_object", "read_object", ...)
    pub access_name: String,
    /// User type ("rodsuser", "rodsgroup", "rodsadmin")
    pub user_type: String,
}

/// ACL change request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclUpdate {
    /// Access level to grant ("own", "write", "read", "null")
    pub access_name: String,
    /// Logical path the ACL applies to
    pub path: String,
    /// User to grant to
    pub user_name: String,
    /// Zone of the user, empty for the local zone
    pub user_zone: String,
}

/// How a connection should authenticate
#[derive(Clone, Copy)]
pub enum ConnectRequest<'a> {
    /// Supply host/port/zone/user and the plaintext password directly
    Password {
        /// Connection parameters
        environment: &'a ConnectionEnvironment,
        /// Plaintext password for this attempt only
        password: &'a str,
    },
    /// Authenticate from the obfuscated auth file
    AuthFile {
        /// Connection parameters
        environment: &'a ConnectionEnvironment,
        /// Environment document the parameters came from, if any
        environment_file: Option<&'a Path>,
        /// Location of the cached credential
        auth_file: &'a Path,
    },
}

impl ConnectRequest<'_> {
    /// Connection parameters of this request
    pub fn environment(&self) -> &ConnectionEnvironment {
        match self {
            Self::Password { environment, .. } | Self::AuthFile { environment, .. } => environment,
        }
    }
}

impl fmt::Debug for ConnectRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { environment, .. } => f
                .debug_struct("Password")
                .field("environment", environment)
                .field("password", &"<redacted>")
                .finish(),
            Self::AuthFile {
                environment,
                environment_file,
                auth_file,
            } => f
                .debug_struct("AuthFile")
                .field("environment", environment)
                .field("environment_file", environment_file)
                .field("auth_file", auth_file)
                .finish(),
        }
    }
}

impl fmt::Debug for dyn GridConnection + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridConnection").finish_non_exhaustive()
    }
}

/// Entry point of the client library
pub trait GridClient {
    /// Open an authenticated connection
    fn connect(&self, request: &ConnectRequest<'_>) -> Result<Box<dyn GridConnection>, ClientError>;
}

/// A live connection handle
pub trait GridConnection: Send {
    /// Probe the server version; fails if the far end is gone
    fn server_version(&self) -> Result<ServerVersion, ClientError>;

    /// Server host name
    fn host(&self) -> String;

    /// Server port
    fn port(&self) -> u16;

    /// Zone the user authenticated in
    fn zone(&self) -> String;

    /// Authenticated user name
    fn username(&self) -> String;

    /// Default storage resource, if the server has one configured
    fn default_resource(&self) -> Option<String>;

    /// PAM passwords handed out by the server during this authentication
    fn pam_passwords_negotiated(&self) -> Vec<String>;

    /// Release the handle and discard per-connection configuration
    fn cleanup(&mut self);

    /// Look up a collection
    fn collection(&self, path: &str) -> Result<ItemRef, ClientError>;

    /// Look up a data object
    fn data_object(&self, path: &str) -> Result<ItemRef, ClientError>;

    /// Inheritance flag of a collection
    fn inheritance(&self, collection: &ItemRef) -> Result<bool, ClientError>;

    /// ACL entries of a collection or data object
    fn acls(&self, item: &ItemRef) -> Result<Vec<PermissionEntry>, ClientError>;

    /// Apply an ACL change
    fn set_acl(&self, update: &AclUpdate, recursive: bool, admin: bool) -> Result<(), ClientError>;

    /// Permission name mapping advertised by the library, when it has one
    fn available_permissions(&self) -> Option<BTreeMap<String, String>>;
}
