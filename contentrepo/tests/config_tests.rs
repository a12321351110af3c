//! Configuration loading and wiring tests
//!
//! Tests touching process environment variables run serially.

#[path = "testutils/mod.rs"]
mod testutils;

use contentrepo::config::{
    ENV_BORROW_TIMEOUT_MS, ENV_IDLE_TIMEOUT_MS, ENV_MAX_SESSIONS, ENV_SESSION_MODE,
};
use contentrepo::repository::{Node, StaticCredentialsProvider};
use contentrepo::{
    create_template, ConfigError, Credentials, ExhaustedAction, MemoryRepository,
    RepositoryConfig, SessionMode,
};
use serial_test::serial;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

const ALL_VARS: [&str; 4] = [
    ENV_SESSION_MODE,
    ENV_MAX_SESSIONS,
    ENV_BORROW_TIMEOUT_MS,
    ENV_IDLE_TIMEOUT_MS,
];

fn clear_env() {
    for name in ALL_VARS {
        std::env::remove_var(name);
    }
}

fn write_config(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(
        r#"{
            "session_mode": "pooled",
            "pool": {
                "max_sessions_per_workspace": 4,
                "exhausted_action": "fail",
                "idle_timeout": null,
                "shutdown_timeout": 250
            },
            "prewarm_workspaces": ["default", "archive"]
        }"#,
    );

    let config = RepositoryConfig::from_file(file.path()).unwrap();
    assert_eq!(config.pool.max_sessions_per_workspace, 4);
    assert_eq!(config.pool.exhausted_action, ExhaustedAction::Fail);
    assert_eq!(config.pool.idle_timeout, None);
    assert_eq!(config.pool.shutdown_timeout, Some(Duration::from_millis(250)));
    assert_eq!(config.prewarm_workspaces, vec!["default", "archive"]);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = RepositoryConfig::from_file(dir.path().join("absent.json"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_malformed_file_is_parse_error() {
    let file = write_config("{ not json");
    assert!(matches!(
        RepositoryConfig::from_file(file.path()),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    clear_env();
    let file = write_config(r#"{"pool": {"max_sessions_per_workspace": 2}}"#);
    std::env::set_var(ENV_SESSION_MODE, "simple");
    std::env::set_var(ENV_MAX_SESSIONS, "16");
    std::env::set_var(ENV_BORROW_TIMEOUT_MS, "750");
    std::env::set_var(ENV_IDLE_TIMEOUT_MS, "60000");

    let config = RepositoryConfig::load(file.path());
    clear_env();
    let config = config.unwrap();

    assert_eq!(config.session_mode, SessionMode::Simple);
    assert_eq!(config.pool.max_sessions_per_workspace, 16);
    assert_eq!(config.pool.borrow_timeout, Some(Duration::from_millis(750)));
    assert_eq!(config.pool.idle_timeout, Some(Duration::from_secs(60)));
}

#[test]
#[serial]
fn test_invalid_environment_values_are_rejected() {
    clear_env();
    std::env::set_var(ENV_MAX_SESSIONS, "many");
    let result = RepositoryConfig::from_env();
    clear_env();
    match result {
        Err(ConfigError::InvalidValue { name, .. }) => assert_eq!(name, ENV_MAX_SESSIONS),
        other => panic!("unexpected result: {:?}", other),
    }

    std::env::set_var(ENV_SESSION_MODE, "clustered");
    let result = RepositoryConfig::from_env();
    clear_env();
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

    std::env::set_var(ENV_MAX_SESSIONS, "0");
    let result = RepositoryConfig::from_env();
    clear_env();
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
#[serial]
fn test_empty_environment_keeps_defaults() {
    clear_env();
    std::env::set_var(ENV_BORROW_TIMEOUT_MS, "  ");
    let result = RepositoryConfig::from_env();
    clear_env();
    assert_eq!(result.unwrap(), RepositoryConfig::default());
}

#[test]
fn test_create_template_end_to_end() {
    testutils::init_logging();
    let repository = MemoryRepository::new()
        .with_workspace("default")
        .with_account("system", "system")
        .with_account("alice", "alice");
    let credentials = Arc::new(
        StaticCredentialsProvider::new(Credentials::new("system", "system"))
            .with_user(Credentials::new("alice", "alice")),
    );
    let config = RepositoryConfig::from_json_str(
        r#"{"pool": {"min_idle_per_workspace": 1}, "prewarm_workspaces": ["default"]}"#,
    )
    .unwrap();

    let template = create_template(&config, Arc::new(repository.clone()), credentials).unwrap();
    template.init().unwrap();
    assert_eq!(repository.stats().logins, 1);

    let (user, path) = template
        .with_root("default", |session, root| {
            use contentrepo::repository::Session;
            Ok((session.user_id().to_string(), root.path()?))
        })
        .unwrap();
    assert_eq!(user, "alice");
    assert_eq!(path, "/");
    assert_eq!(repository.stats().logins, 1);

    template.shutdown().unwrap();
    assert_eq!(repository.stats().live_sessions, 0);
}
