//! Session Error Types
//!
//! Every failure surfaced by the session layer is one of these variants.
//! Library-level errors are reclassified by [`crate::session::normalize`]
//! before they reach callers; anything the normalizer does not recognise is
//! passed through unchanged as [`SessionError::Connection`].

use std::path::PathBuf;

use thiserror::Error;

use crate::client::ClientError;
use crate::session::normalize::FailureCause;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Session layer error types
#[derive(Error, Debug)]
pub enum SessionError {
    /// Missing or malformed connection environment
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Environment document exists but is not valid JSON
    #[error("Configuration error: cannot parse {path:?}: {source}")]
    EnvironmentParse {
        /// Document that failed to parse
        path: PathBuf,
        /// Parser error
        #[source]
        source: serde_json::Error,
    },

    /// Normalized credential or negotiation failure
    #[error("{cause}; {signature}")]
    Authentication {
        /// User-facing cause
        cause: FailureCause,
        /// Original library signature, for diagnostics
        signature: String,
    },

    /// Authentication path that is not implemented (anonymous login)
    #[error("Authentication for user '{0}' is not implemented")]
    UnsupportedAuth(String),

    /// Operation needs a live connection
    #[error("No active iRODS session")]
    NotConnected,

    /// ACL change named a user the server does not know
    #[error("ACL error: user unknown ({0})")]
    AclUnknownUser(String),

    /// ACL change with an unknown permission or path
    #[error("ACL error: permission {permission} or path {path} not known")]
    AclInvalidArgument {
        /// Requested permission
        permission: String,
        /// Target path
        path: String,
    },

    /// Auth file exists but cannot be decoded
    #[error("Auth file {path:?} is malformed: {reason}")]
    MalformedAuthFile {
        /// Auth file location
        path: PathBuf,
        /// Decoder complaint
        reason: String,
    },

    /// Unrecognised library failure, passed through unchanged
    #[error(transparent)]
    Connection(#[from] ClientError),

    /// IO error
    #[error("IO error on {path:?}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Error classification for callers deciding how to react
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Broken or missing configuration
    Configuration,
    /// Credentials or negotiation rejected
    Authentication,
    /// Unsupported login path
    UnsupportedAuth,
    /// No live session
    NotConnected,
    /// ACL mutation rejected
    Acl,
    /// Cached credential problems
    Credential,
    /// Pass-through library failure
    Connection,
    /// Filesystem failure
    Io,
}

impl SessionError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) | Self::EnvironmentParse { .. } => ErrorKind::Configuration,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::UnsupportedAuth(_) => ErrorKind::UnsupportedAuth,
            Self::NotConnected => ErrorKind::NotConnected,
            Self::AclUnknownUser(_) | Self::AclInvalidArgument { .. } => ErrorKind::Acl,
            Self::MalformedAuthFile { .. } => ErrorKind::Credential,
            Self::Connection(_) => ErrorKind::Connection,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Normalized cause, for authentication errors
    pub fn cause(&self) -> Option<FailureCause> {
        match self {
            Self::Authentication { cause, .. } => Some(*cause),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
