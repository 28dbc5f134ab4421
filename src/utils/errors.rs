//! User-Friendly Error Formatting
//!
//! Turns a session failure into a boxed message with troubleshooting hints
//! chosen by its [`ErrorKind`] and, for authentication failures, its
//! [`FailureCause`].

use std::fmt::Write;

use crate::error::{ErrorKind, SessionError};
use crate::session::FailureCause;

/// Format error for user consumption
pub fn format_user_error(error: &anyhow::Error) -> String {
    let mut output = String::new();

    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "╔════════════════════════════════════════════════════════════╗"
    )
    .ok();
    writeln!(
        &mut output,
        "║                     ERROR                                  ║"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();
    writeln!(&mut output).ok();

    let session_error = error.chain().find_map(|e| e.downcast_ref::<SessionError>());

    match session_error.map(|e| (e.kind(), e.cause())) {
        Some((ErrorKind::Authentication, Some(cause))) => format_authentication_error(&mut output, cause),
        Some((ErrorKind::Configuration, _)) => format_configuration_error(&mut output),
        Some((ErrorKind::Credential, _)) => format_credential_error(&mut output),
        Some((ErrorKind::Acl, _)) => format_acl_error(&mut output),
        Some((ErrorKind::UnsupportedAuth, _)) => format_unsupported_error(&mut output),
        _ => format_generic_error(&mut output, &error.to_string()),
    }

    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Technical Details:").ok();
    writeln!(&mut output).ok();
    writeln!(&mut output, "{:#}", error).ok();
    writeln!(&mut output).ok();

    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Need Help?").ok();
    writeln!(&mut output, "  - Run with --verbose for detailed logs: ibridges -vv").ok();
    writeln!(
        &mut output,
        "  - Compare your settings with: ibridges env show"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();

    output
}

fn format_authentication_error(output: &mut String, cause: FailureCause) {
    writeln!(output, "Authentication Failed: {}", cause).ok();
    writeln!(output).ok();

    match cause {
        FailureCause::NegotiationMisconfigured => {
            writeln!(output, "The client and server could not agree on a connection.").ok();
            writeln!(output).ok();
            writeln!(output, "  1. Check irods_host and irods_port").ok();
            writeln!(output, "  2. irods_client_server_policy must be compatible with the server").ok();
            writeln!(
                output,
                "     → CS_NEG_REQUIRE on one side cannot meet CS_NEG_REFUSE on the other"
            )
            .ok();
        }
        FailureCause::CredentialsRejected => {
            writeln!(output, "The server does not accept this user.").ok();
            writeln!(output).ok();
            writeln!(output, "  1. Check irods_user_name and irods_zone_name").ok();
            writeln!(output, "  2. Ask your data steward whether the account exists").ok();
        }
        FailureCause::WrongPassword => {
            writeln!(output, "The password was not accepted.").ok();
            writeln!(output).ok();
            writeln!(output, "  1. Re-enter the password; check caps lock").ok();
            writeln!(output, "  2. Some portals issue a separate data-access password").ok();
        }
        FailureCause::CachedPasswordExpired | FailureCause::CachedPasswordWrong => {
            writeln!(output, "The cached password can no longer be used.").ok();
            writeln!(output).ok();
            writeln!(output, "  1. Remove it: ibridges auth clear").ok();
            writeln!(output, "  2. Log in again with your password").ok();
        }
        FailureCause::NoCachedPassword => {
            writeln!(output, "No password was given and none is cached.").ok();
            writeln!(output).ok();
            writeln!(output, "  1. Log in once with your password to create the cache").ok();
            writeln!(output, "  2. Or store it directly: ibridges auth store").ok();
        }
    }
}

fn format_configuration_error(output: &mut String) {
    writeln!(output, "Configuration Error").ok();
    writeln!(output).ok();
    writeln!(output, "Problem with the iRODS environment.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Environment file not found").ok();
    writeln!(output, "     → Default location: ~/.irods/irods_environment.json").ok();
    writeln!(output, "     → Or specify: ibridges --env /path/to/irods_environment.json").ok();
    writeln!(output, "     → Or set IRODS_ENVIRONMENT_FILE").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Invalid JSON").ok();
    writeln!(output, "     → The document must be a single JSON object").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Unusable value").ok();
    writeln!(output, "     → irods_port must be a number, irods_home an absolute path").ok();
    writeln!(output, "     → irods_default_resource must be set for uploads").ok();
}

fn format_credential_error(output: &mut String) {
    writeln!(output, "Cached Credential Error").ok();
    writeln!(output).ok();
    writeln!(output, "The auth file (.irodsA) could not be decoded.").ok();
    writeln!(output).ok();
    writeln!(output, "  1. It may have been written by another user account").ok();
    writeln!(output, "  2. Remove it with: ibridges auth clear").ok();
}

fn format_acl_error(output: &mut String) {
    writeln!(output, "Permission Change Rejected").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Check the user name and zone").ok();
    writeln!(output, "  2. Valid permissions: null, read, write, own").ok();
    writeln!(output, "  3. Check that the path exists").ok();
}

fn format_unsupported_error(output: &mut String) {
    writeln!(output, "Unsupported Login").ok();
    writeln!(output).ok();
    writeln!(output, "Anonymous access is not available.").ok();
    writeln!(output, "Set irods_user_name to your own account.").ok();
}

fn format_generic_error(output: &mut String, error: &str) {
    writeln!(output, "iRODS Error").ok();
    writeln!(output).ok();
    writeln!(output, "Error: {}", error).ok();
    writeln!(output).ok();
    writeln!(output, "Troubleshooting:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Check network access to the iRODS server").ok();
    writeln!(output, "  2. Check the server status with your data steward").ok();
}
