mod common;

use common::{write_environment, write_environment_with, FakeGrid};
use ibridges_session::client::ClientErrorKind;
use ibridges_session::session::{AuthStrategy, SessionState};
use ibridges_session::{
    ClientError, ConnectionEnvironment, CredentialStore, ErrorKind, FailureCause, ServerVersion,
    Session, SessionError, SessionOptions,
};
use serde_json::json;
use tempfile::TempDir;

const PASSWORD: &str = "correct horse";

fn options(dir: &TempDir) -> SessionOptions {
    SessionOptions::new()
        .with_environment_file(write_environment(dir.path()))
        .with_auth_file(dir.path().join(".irodsA"))
}

#[test]
fn test_cached_credential_login() {
    let dir = TempDir::new().unwrap();
    let grid = FakeGrid::new();
    CredentialStore::new(dir.path().join(".irodsA"))
        .write(PASSWORD)
        .unwrap();

    let session = Session::open(grid.clone(), options(&dir)).unwrap();

    assert!(session.has_valid_session());
    assert_eq!(session.state(), SessionState::Connected);
    assert_eq!(session.strategy(), Some(AuthStrategy::CachedCredential));
    assert_eq!(grid.state().cached_logins, 1);
    assert_eq!(grid.state().password_logins, 0);
}

#[test]
fn test_wrong_password_is_normalized() {
    let dir = TempDir::new().unwrap();
    let grid = FakeGrid::new();

    let err = Session::open(grid.clone(), options(&dir).with_password("tr0ub4dor"))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(err.cause(), Some(FailureCause::WrongPassword));
    assert!(err.to_string().starts_with("wrong password"));
}

#[test]
fn test_failed_connect_leaves_session_unconnected() {
    let dir = TempDir::new().unwrap();
    let grid = FakeGrid::new();
    let mut session = Session::new(grid.clone(), options(&dir).with_password("nope")).unwrap();

    assert!(session.connect().is_err());
    assert_eq!(session.state(), SessionState::Unconnected);
    assert!(session.connection().is_none());
    assert!(!session.has_valid_session());
}

#[test]
fn test_missing_cache_is_normalized() {
    let dir = TempDir::new().unwrap();

    let err = Session::open(FakeGrid::new(), options(&dir)).unwrap_err();
    assert_eq!(err.cause(), Some(FailureCause::NoCachedPassword));
}

#[test]
fn test_stale_cache_is_normalized() {
    let dir = TempDir::new().unwrap();
    CredentialStore::new(dir.path().join(".irodsA"))
        .write("last-years-password")
        .unwrap();

    let err = Session::open(FakeGrid::new(), options(&dir)).unwrap_err();
    assert_eq!(err.cause(), Some(FailureCause::CachedPasswordWrong));
}

#[test]
fn test_close_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let grid = FakeGrid::new();
    let mut session = Session::open(grid.clone(), options(&dir).with_password(PASSWORD)).unwrap();

    session.close();
    assert!(!session.has_valid_session());
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(session.strategy(), None);

    session.close();
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(grid.state().cleanups, 1);
}

#[test]
fn test_close_before_connect_is_noop() {
    let dir = TempDir::new().unwrap();
    let grid = FakeGrid::new();
    let mut session = Session::new(grid.clone(), options(&dir)).unwrap();

    session.close();
    assert_eq!(session.state(), SessionState::Unconnected);
    assert_eq!(grid.state().cleanups, 0);
}

#[test]
fn test_reconnect_after_close() {
    let dir = TempDir::new().unwrap();
    let grid = FakeGrid::new();
    let mut session = Session::open(grid.clone(), options(&dir).with_password(PASSWORD)).unwrap();

    session.close();
    session.connect().unwrap();

    assert_eq!(session.state(), SessionState::Connected);
    assert!(session.has_valid_session());
    assert_eq!(grid.state().connects, 2);
}

#[test]
fn test_connect_when_valid_is_noop() {
    let dir = TempDir::new().unwrap();
    let grid = FakeGrid::new();
    let mut session = Session::open(grid.clone(), options(&dir).with_password(PASSWORD)).unwrap();

    session.connect().unwrap();
    assert_eq!(grid.state().connects, 1);
}

#[test]
fn test_dead_handle_is_replaced() {
    let dir = TempDir::new().unwrap();
    let grid = FakeGrid::new();
    let mut session = Session::open(grid.clone(), options(&dir).with_password(PASSWORD)).unwrap();

    grid.state().alive = false;
    assert!(!session.has_valid_session());

    session.connect().unwrap();
    assert!(session.has_valid_session());
    assert_eq!(grid.state().connects, 2);
    assert_eq!(grid.state().cleanups, 1);
}

#[test]
fn test_failed_reconnect_after_dead_handle() {
    let dir = TempDir::new().unwrap();
    let grid = FakeGrid::new();
    let mut session = Session::open(grid.clone(), options(&dir).with_password(PASSWORD)).unwrap();

    grid.state().alive = false;
    grid.state().forced_failure = Some(ClientError::new(ClientErrorKind::Network, "timed out"));

    let err = session.connect().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(session.strategy(), None);
    assert!(session.connection().is_none());
    assert_eq!(grid.state().cleanups, 1);
}

#[test]
fn test_write_cached_secret_roundtrip() {
    let dir = TempDir::new().unwrap();
    let grid = FakeGrid::new();
    let session = Session::open(grid.clone(), options(&dir).with_password(PASSWORD)).unwrap();

    assert!(session.write_cached_secret().unwrap());

    let cached = CredentialStore::new(dir.path().join(".irodsA"))
        .read()
        .unwrap()
        .unwrap();
    assert_eq!(cached.as_str(), "pam-negotiated-7f3a");
    drop(session);

    let session = Session::open(grid.clone(), options(&dir)).unwrap();
    assert_eq!(session.strategy(), Some(AuthStrategy::CachedCredential));
}

#[test]
fn test_write_cached_secret_without_pam_password() {
    let dir = TempDir::new().unwrap();
    let grid = FakeGrid::new();
    grid.state().pam_password = None;
    let session = Session::open(grid.clone(), options(&dir).with_password(PASSWORD)).unwrap();

    assert!(!session.write_cached_secret().unwrap());
    assert!(!dir.path().join(".irodsA").exists());
}

#[test]
fn test_write_cached_secret_when_unconnected() {
    let dir = TempDir::new().unwrap();
    let session = Session::new(FakeGrid::new(), options(&dir)).unwrap();

    assert!(!session.write_cached_secret().unwrap());
}

#[test]
fn test_home_is_derived_when_absent() {
    let dir = TempDir::new().unwrap();
    let mut session = Session::new(FakeGrid::new(), options(&dir).with_password(PASSWORD)).unwrap();
    assert_eq!(session.home(), None);

    session.connect().unwrap();
    assert_eq!(session.home(), Some("/tempZone/home/alice"));
}

#[test]
fn test_home_from_environment_is_kept() {
    let dir = TempDir::new().unwrap();
    let env_file = write_environment_with(
        dir.path(),
        json!({ "irods_home": "/tempZone/home/research" }),
    );
    let options = SessionOptions::new()
        .with_environment_file(env_file)
        .with_password(PASSWORD);

    let session = Session::open(FakeGrid::new(), options).unwrap();
    assert_eq!(session.home(), Some("/tempZone/home/research"));
}

#[test]
fn test_home_override_wins() {
    let dir = TempDir::new().unwrap();
    let env_file = write_environment_with(
        dir.path(),
        json!({ "irods_home": "/tempZone/home/research" }),
    );
    let options = SessionOptions::new()
        .with_environment_file(env_file)
        .with_password(PASSWORD)
        .with_irods_home("/tempZone/projects/p1");

    let session = Session::open(FakeGrid::new(), options).unwrap();
    assert_eq!(session.home(), Some("/tempZone/projects/p1"));
}

#[test]
fn test_missing_environment_file_never_connects() {
    let dir = TempDir::new().unwrap();
    let grid = FakeGrid::new();
    let options = SessionOptions::new()
        .with_environment_file(dir.path().join("missing.json"))
        .with_password(PASSWORD);

    let err = Session::open(grid.clone(), options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(grid.state().connects, 0);
}

#[test]
fn test_no_environment_source() {
    let err = Session::new(FakeGrid::new(), SessionOptions::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_environment_file_supersedes_mapping() {
    let dir = TempDir::new().unwrap();
    let mapping = ConnectionEnvironment {
        irods_host: Some("stale.example.org".to_string()),
        irods_default_resource: Some("mappingResc".to_string()),
        ..Default::default()
    };
    let options = SessionOptions::new()
        .with_environment(mapping)
        .with_environment_file(write_environment(dir.path()));

    let grid = FakeGrid::new();
    let mut session = Session::new(grid.clone(), options.with_password(PASSWORD)).unwrap();
    let env = session.environment();
    assert_eq!(env.irods_host.as_deref(), Some("irods.example.org"));
    assert_eq!(env.irods_default_resource, None);
    assert!(env.extra.contains_key("ui_tabs"));

    session.connect().unwrap();
    assert_eq!(grid.state().requested_host.as_deref(), Some("irods.example.org"));
}

#[test]
fn test_relative_home_override_rejected() {
    let dir = TempDir::new().unwrap();

    let err = Session::new(FakeGrid::new(), options(&dir).with_irods_home("home/alice")).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("home/alice"));
}

#[test]
fn test_in_memory_environment() {
    let grid = FakeGrid::new();
    let mapping = ConnectionEnvironment {
        irods_host: Some("irods.example.org".to_string()),
        irods_port: Some(1247),
        irods_zone_name: Some("tempZone".to_string()),
        irods_user_name: Some("alice".to_string()),
        ..Default::default()
    };

    let session = Session::open(
        grid.clone(),
        SessionOptions::new()
            .with_environment(mapping)
            .with_password(PASSWORD),
    )
    .unwrap();
    assert_eq!(session.environment_file(), None);
    assert_eq!(session.username(), "alice");
}

#[test]
fn test_anonymous_login_is_unsupported() {
    let dir = TempDir::new().unwrap();
    let grid = FakeGrid::new();
    let env_file = write_environment_with(dir.path(), json!({ "irods_user_name": "anonymous" }));
    let options = SessionOptions::new()
        .with_environment_file(env_file)
        .with_password(PASSWORD);

    let err = Session::open(grid.clone(), options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedAuth);
    assert_eq!(grid.state().connects, 0);
}

#[test]
fn test_unknown_failure_passes_through() {
    let dir = TempDir::new().unwrap();
    let grid = FakeGrid::new();
    let failure = ClientError::new(ClientErrorKind::Network, "no route to host");
    grid.state().forced_failure = Some(failure.clone());

    match Session::open(grid, options(&dir).with_password(PASSWORD)) {
        Err(SessionError::Connection(inner)) => assert_eq!(inner, failure),
        other => panic!("Expected pass-through, got {:?}", other),
    }
}

#[test]
fn test_negotiation_signature_is_normalized() {
    let dir = TempDir::new().unwrap();
    let grid = FakeGrid::new();
    grid.state().forced_failure = Some(ClientError::unknown(
        "Client-Server negotiation failure: CS_NEG_REFUSE,CS_NEG_REQUIRE",
    ));

    let err = Session::open(grid, options(&dir).with_password(PASSWORD)).unwrap_err();
    assert_eq!(err.cause(), Some(FailureCause::NegotiationMisconfigured));
    assert!(err.to_string().contains("CS_NEG_REFUSE"));
}

#[test]
fn test_accessors_when_unconnected() {
    let dir = TempDir::new().unwrap();
    let session = Session::new(FakeGrid::new(), options(&dir)).unwrap();

    assert_eq!(session.host(), "");
    assert_eq!(session.port(), 0);
    assert_eq!(session.username(), "");
    assert_eq!(session.zone(), "");
    assert_eq!(session.server_version().unwrap(), ServerVersion::default());
    assert_eq!(
        session.default_resource().unwrap_err().kind(),
        ErrorKind::Configuration
    );
}

#[test]
fn test_accessors_when_connected() {
    let dir = TempDir::new().unwrap();
    let session = Session::open(FakeGrid::new(), options(&dir).with_password(PASSWORD)).unwrap();

    assert_eq!(session.host(), "irods.example.org");
    assert_eq!(session.port(), 1247);
    assert_eq!(session.zone(), "tempZone");
    assert_eq!(session.server_version().unwrap(), ServerVersion::new(4, 3, 1));
    assert_eq!(session.default_resource().unwrap(), "demoResc");
}

#[test]
fn test_missing_default_resource() {
    let dir = TempDir::new().unwrap();
    let grid = FakeGrid::new();
    grid.state().default_resource = None;
    let session = Session::open(grid, options(&dir).with_password(PASSWORD)).unwrap();

    let err = session.default_resource().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("irods_default_resource"));
}

#[test]
fn test_scope_closes_on_success() {
    let dir = TempDir::new().unwrap();
    let grid = FakeGrid::new();
    let mut session = Session::new(grid.clone(), options(&dir).with_password(PASSWORD)).unwrap();

    let zone = session.with_connection(|s| Ok(s.zone())).unwrap();

    assert_eq!(zone, "tempZone");
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(grid.state().cleanups, 1);
}

#[test]
fn test_scope_closes_on_error() {
    let dir = TempDir::new().unwrap();
    let grid = FakeGrid::new();
    let mut session = Session::open(grid.clone(), options(&dir).with_password(PASSWORD)).unwrap();

    let result: Result<(), SessionError> =
        session.with_connection(|_| Err(SessionError::NotConnected));

    assert!(result.is_err());
    assert_eq!(session.state(), SessionState::Closed);
    assert!(!session.has_valid_session());
    assert_eq!(grid.state().connects, 1);
}

#[test]
fn test_scope_reconnects_after_close() {
    let dir = TempDir::new().unwrap();
    let grid = FakeGrid::new();
    let mut session = Session::open(grid.clone(), options(&dir).with_password(PASSWORD)).unwrap();
    session.close();

    {
        let guard = session.scoped().unwrap();
        assert!(guard.has_valid_session());
    }

    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(grid.state().connects, 2);
}

#[test]
fn test_drop_releases_handle() {
    let dir = TempDir::new().unwrap();
    let grid = FakeGrid::new();
    let session = Session::open(grid.clone(), options(&dir).with_password(PASSWORD)).unwrap();

    drop(session);
    assert_eq!(grid.state().cleanups, 1);
}

#[test]
fn test_debug_output_hides_password() {
    let dir = TempDir::new().unwrap();
    let options = options(&dir).with_password(PASSWORD);
    assert!(!format!("{:?}", options).contains(PASSWORD));

    let session = Session::new(FakeGrid::new(), options).unwrap();
    assert!(!format!("{:?}", session).contains(PASSWORD));
}
