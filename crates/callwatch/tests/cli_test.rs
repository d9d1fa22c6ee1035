//! Integration tests for the `callwatch` binary.
//!
//! Argument parsing, configuration and the one-shot commands, run against
//! a mock backend. Nothing here touches the user's real configuration.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `callwatch` binary with env isolation.
fn callwatch_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("callwatch");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("CALLWATCH_PROFILE")
        .env_remove("CALLWATCH_BACKEND")
        .env_remove("CALLWATCH_OUTPUT")
        .env_remove("CALLWATCH_TIMEOUT")
        .env_remove("CALLWATCH_DEFAULT_PROFILE");
    cmd
}

fn sample_records() -> serde_json::Value {
    json!([
        {
            "id": 1,
            "latitude": 51.5072,
            "longitude": -0.1276,
            "severity": 1,
            "metadata": "Cat stuck in tree",
            "created_at": "2024-01-15T09:00:00Z"
        },
        {
            "id": 2,
            "latitude": 51.5155,
            "longitude": -0.0922,
            "severity": 4,
            "metadata": "Structure fire, people trapped",
            "created_at": "2024-01-15T09:05:00Z"
        }
    ])
}

async fn backend_with_calls() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/callers/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_records()))
        .mount(&server)
        .await;
    server
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = callwatch_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
}

#[test]
fn help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    callwatch_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("list")
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("report"))
            .and(predicate::str::contains("health")),
    );
}

#[test]
fn completions_bash() {
    let home = tempfile::tempdir().unwrap();
    callwatch_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn severity_out_of_range_is_a_usage_error() {
    let home = tempfile::tempdir().unwrap();
    callwatch_cmd(home.path())
        .args(["report", "--lat", "1", "--lon", "1", "--severity", "9", "-d", "x"])
        .assert()
        .code(2);
}

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn config_path_follows_xdg() {
    let home = tempfile::tempdir().unwrap();
    callwatch_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("callwatch").and(predicate::str::contains("config.toml")));
}

#[test]
fn config_show_includes_profiles() {
    let home = tempfile::tempdir().unwrap();
    let dir = home.path().join("callwatch");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        "[profiles.county]\nbackend = \"https://dispatch.example.org\"\n",
    )
    .unwrap();

    callwatch_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[profiles.county]")
                .and(predicate::str::contains("https://dispatch.example.org")),
        );
}

#[test]
fn unknown_profile_fails_with_usage_code() {
    let home = tempfile::tempdir().unwrap();
    callwatch_cmd(home.path())
        .args(["--profile", "nowhere", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Profile 'nowhere' not found"));
}

#[test]
fn unsupported_backend_scheme() {
    let home = tempfile::tempdir().unwrap();
    callwatch_cmd(home.path())
        .args(["--backend", "ftp://example.org", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unsupported scheme"));
}

#[test]
fn unreachable_backend_is_a_connection_error() {
    let home = tempfile::tempdir().unwrap();
    callwatch_cmd(home.path())
        .args(["--backend", "http://127.0.0.1:9", "--timeout", "5", "list"])
        .assert()
        .code(7);
}

// ── list ────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn list_filters_by_urgency_as_json() {
    let server = backend_with_calls().await;
    let home = tempfile::tempdir().unwrap();

    let output = callwatch_cmd(home.path())
        .args(["--backend", &server.uri(), "-o", "json", "list", "-u", "critical"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let calls: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let calls = calls.as_array().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["id"], "2");
    assert_eq!(calls[0]["urgency"], "critical");
}

#[tokio::test(flavor = "multi_thread")]
async fn list_table_ends_with_filter_summary() {
    let server = backend_with_calls().await;
    let home = tempfile::tempdir().unwrap();

    callwatch_cmd(home.path())
        .args(["--backend", &server.uri(), "list", "--search", "FIRE"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Structure fire")
                .and(predicate::str::contains("Cat stuck").not())
                .and(predicate::str::contains("1 of 2 calls"))
                .and(predicate::str::contains("Search: \"FIRE\"")),
        );
}

#[tokio::test(flavor = "multi_thread")]
async fn list_plain_prints_ids() {
    let server = backend_with_calls().await;
    let home = tempfile::tempdir().unwrap();

    callwatch_cmd(home.path())
        .args(["--backend", &server.uri(), "-o", "plain", "list"])
        .assert()
        .success()
        .stdout("1\n2\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn list_surfaces_backend_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/callers/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    callwatch_cmd(home.path())
        .args(["--backend", &server.uri(), "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("HTTP 500"));
}

// ── report / health ─────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn report_posts_the_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/callers/"))
        .and(body_partial_json(json!({
            "latitude": -33.8688,
            "severity": 4,
            "metadata": "Flash flooding on George St"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 77,
            "latitude": -33.8688,
            "longitude": 151.2093,
            "severity": 4,
            "metadata": "Flash flooding on George St",
            "created_at": "2024-02-02T02:02:02Z"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    callwatch_cmd(home.path())
        .args([
            "--backend",
            &server.uri(),
            "report",
            "--lat",
            "-33.8688",
            "--lon",
            "151.2093",
            "--severity",
            "4",
            "-d",
            "Flash flooding on George St",
        ])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("ID:          77")
                .and(predicate::str::contains("Urgency:     critical")),
        );
}

#[tokio::test(flavor = "multi_thread")]
async fn health_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    callwatch_cmd(home.path())
        .args(["--backend", &server.uri(), "health"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("healthy"));
}

#[tokio::test(flavor = "multi_thread")]
async fn unhealthy_backend_exits_with_connection_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "unhealthy", "message": "database offline"})),
        )
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    callwatch_cmd(home.path())
        .args(["--backend", &server.uri(), "health"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Backend is unhealthy"));
}
