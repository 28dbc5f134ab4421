//! Utility Functions
//!
//! User-friendly error formatting for the CLI.
//!
//! ```rust,ignore
//! use ibridges_session::utils::format_user_error;
//!
//! if let Err(e) = run() {
//!     eprintln!("{}", format_user_error(&e));
//! }
//! ```
//!
//! Failure families with context-aware help:
//! - Authentication → wrong or expired password, negotiation policy
//! - Configuration → environment document location and contents
//! - Cached credential → stale or foreign `.irodsA`
//! - ACL → unknown user, permission or path

pub mod errors;

pub use errors::format_user_error;
