//! Integration tests: run the sopdrop binary and check exit codes and
//! output. Every invocation gets its own SOPDROP_HOME so nothing touches
//! the real ~/.sopdrop.

use std::process::Command;

fn sopdrop(home: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sopdrop"));
    cmd.env("SOPDROP_HOME", home);
    cmd.env_remove("SOPDROP_SERVER_URL");
    cmd
}

fn temp_home() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}

#[test]
fn test_help() {
    let home = temp_home();
    let out = sopdrop(home.path()).arg("--help").output().unwrap();
    assert!(out.status.success(), "sopdrop --help should succeed");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("install"));
    assert!(stdout.contains("search"));
    assert!(stdout.contains("cache"));
    assert!(stdout.contains("config"));
}

#[test]
fn test_version() {
    let home = temp_home();
    let out = sopdrop(home.path()).arg("--version").output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("sopdrop"));
}

#[test]
fn test_config_show_defaults() {
    let home = temp_home();
    let out = sopdrop(home.path()).args(["config", "show"]).output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("https://sopdrop.com"));
    assert!(stdout.contains("token: not set"));
}

#[test]
fn test_config_server_round_trip() {
    let home = temp_home();
    let out = sopdrop(home.path())
        .args(["config", "server", "https://registry.example.com/"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let out = sopdrop(home.path()).args(["config", "show"]).output().unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("https://registry.example.com"));
    assert!(!stdout.contains("https://sopdrop.com"));
}

#[test]
fn test_env_var_overrides_configured_server() {
    let home = temp_home();
    sopdrop(home.path())
        .args(["config", "server", "https://registry.example.com"])
        .output()
        .unwrap();

    let out = sopdrop(home.path())
        .env("SOPDROP_SERVER_URL", "https://staging.example.com")
        .args(["config", "show"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("https://staging.example.com"));
}

#[test]
fn test_cache_status_empty() {
    let home = temp_home();
    let out = sopdrop(home.path()).arg("cache").output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Cache is empty"));
}

#[test]
fn test_cache_clear_empty() {
    let home = temp_home();
    let out = sopdrop(home.path()).args(["cache", "clear"]).output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("already empty"));
}

#[test]
fn test_logout_without_token_succeeds() {
    let home = temp_home();
    let out = sopdrop(home.path()).arg("logout").output().unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("Logged out."));
}

#[test]
fn test_install_rejects_malformed_ref() {
    let home = temp_home();
    for bad in ["not-a-ref", "a/b@x", "a/b/c"] {
        let out = sopdrop(home.path()).args(["install", bad]).output().unwrap();
        assert!(!out.status.success(), "'{}' should be rejected", bad);
        let stderr = String::from_utf8_lossy(&out.stderr);
        assert!(stderr.contains("Parse error"), "stderr was: {}", stderr);
    }
}

#[test]
fn test_info_rejects_versioned_slug() {
    let home = temp_home();
    let out = sopdrop(home.path())
        .args(["info", "ana/melt@1.0.0"])
        .output()
        .unwrap();
    assert!(!out.status.success());
}

#[test]
fn test_network_failure_is_reported_not_swallowed() {
    // An unroutable server must produce a connection error and a non-zero
    // exit, without any retry hanging the command.
    let home = temp_home();
    let out = sopdrop(home.path())
        .env("SOPDROP_SERVER_URL", "http://127.0.0.1:1")
        .env("SOPDROP_HTTP_TIMEOUT_MS", "2000")
        .args(["info", "ana/melt"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Connection error"), "stderr was: {}", stderr);
}
