//! Authentication Strategy Selection
//!
//! Decides how a [`super::Session`] authenticates:
//! - Password: a plaintext password was supplied for this attempt
//! - Cached credential: no password, read the obfuscated auth file
//! - Anonymous: recognised but not implemented

use std::fmt;

/// User name reserved for anonymous access
pub const ANONYMOUS_USER: &str = "anonymous";

/// Authentication strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    /// host/port/zone/user plus plaintext password
    Password,
    /// Environment only; the library reads the cached auth file
    CachedCredential,
    /// Anonymous login
    Anonymous,
}

impl AuthStrategy {
    /// Pick the strategy for a user and an optional password
    ///
    /// An empty password counts as no password.
    pub fn select(user_name: &str, password: Option<&str>) -> Self {
        if user_name == ANONYMOUS_USER {
            return Self::Anonymous;
        }

        match password {
            Some(p) if !p.is_empty() => Self::Password,
            _ => Self::CachedCredential,
        }
    }

    /// Human-readable strategy name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::CachedCredential => "cached credential",
            Self::Anonymous => "anonymous",
        }
    }

    /// Whether a PAM password negotiated under this strategy is worth caching
    pub fn caches_secret(&self) -> bool {
        matches!(self, Self::Password)
    }
}

impl fmt::Display for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
