//! Failure Normalization
//!
//! Maps the long tail of library-level connection and authentication
//! failures onto a small, stable set of user-facing causes.
//!
//! | library failure | cause |
//! |---|---|
//! | negotiation refused | host/port/negotiation policy misconfigured |
//! | invalid user | user credentials are not accepted |
//! | PAM password failure | wrong password |
//! | expired cached password | cached password is expired |
//! | invalid cached authentication | cached password is wrong |
//! | no cached password | no cached password found |
//!
//! Classification uses the structured [`ClientErrorKind`] first and only
//! falls back to matching the signature text when the library reported
//! [`ClientErrorKind::Unknown`]. Unrecognised failures pass through as
//! [`SessionError::Connection`]; an unusable environment value becomes
//! [`SessionError::Configuration`].

use std::fmt;

use tracing::debug;

use crate::client::{ClientError, ClientErrorKind};
use crate::error::SessionError;

/// User-actionable authentication failure causes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCause {
    /// Client and server TLS negotiation policies disagree, or host/port are wrong
    NegotiationMisconfigured,
    /// The server does not accept the user
    CredentialsRejected,
    /// PAM rejected the supplied password
    WrongPassword,
    /// The cached password has expired
    CachedPasswordExpired,
    /// The cached password no longer authenticates
    CachedPasswordWrong,
    /// Cached strategy chosen but no auth file to read
    NoCachedPassword,
}

impl FailureCause {
    /// Human-readable cause
    pub fn message(&self) -> &'static str {
        match self {
            Self::NegotiationMisconfigured => "host/port/negotiation policy misconfigured",
            Self::CredentialsRejected => "user credentials are not accepted",
            Self::WrongPassword => "wrong password",
            Self::CachedPasswordExpired => "cached password is expired",
            Self::CachedPasswordWrong => "cached password is wrong",
            Self::NoCachedPassword => "no cached password found",
        }
    }

    fn from_kind(kind: ClientErrorKind) -> Option<Self> {
        match kind {
            ClientErrorKind::NegotiationRefused => Some(Self::NegotiationMisconfigured),
            ClientErrorKind::InvalidUser => Some(Self::CredentialsRejected),
            ClientErrorKind::PamPasswordFailed => Some(Self::WrongPassword),
            ClientErrorKind::PasswordExpired => Some(Self::CachedPasswordExpired),
            ClientErrorKind::InvalidAuthentication => Some(Self::CachedPasswordWrong),
            ClientErrorKind::NoCachedPassword => Some(Self::NoCachedPassword),
            _ => None,
        }
    }

    fn from_signature(signature: &str) -> Option<Self> {
        const SIGNATURES: [(&str, FailureCause); 6] = [
            ("CS_NEG_REFUSE", FailureCause::NegotiationMisconfigured),
            ("CAT_INVALID_USER", FailureCause::CredentialsRejected),
            ("PAM_AUTH_PASSWORD_FAILED", FailureCause::WrongPassword),
            ("CAT_PASSWORD_EXPIRED", FailureCause::CachedPasswordExpired),
            ("CAT_INVALID_AUTHENTICATION", FailureCause::CachedPasswordWrong),
            ("NonAnonymousLoginWithoutPassword", FailureCause::NoCachedPassword),
        ];

        SIGNATURES
            .iter()
            .find(|(needle, _)| signature.contains(needle))
            .map(|(_, cause)| *cause)
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Cause for a library failure, if it is one of the known ones
pub fn classify(error: &ClientError) -> Option<FailureCause> {
    match error.kind {
        ClientErrorKind::Unknown => FailureCause::from_signature(&error.message),
        kind => FailureCause::from_kind(kind),
    }
}

/// Reclassify a library failure into the session error taxonomy
pub fn normalize(error: ClientError) -> SessionError {
    if error.kind == ClientErrorKind::InvalidConfigValue {
        return SessionError::Configuration(format!(
            "Unexpected value in irods_environment.json: {}",
            error.message
        ));
    }

    match classify(&error) {
        Some(cause) => {
            debug!("Normalized {} to '{}'", error.kind, cause);
            SessionError::Authentication {
                cause,
                signature: error.signature(),
            }
        }
        None => SessionError::Connection(error),
    }
}
