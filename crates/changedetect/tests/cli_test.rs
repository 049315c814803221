//! Integration tests for the `changedetect` CLI binary.
//!
//! Argument parsing, help output, completions and config handling run
//! without an instance; the rest run against a wiremock server.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WATCH_UUID: &str = "095be615-a8ad-4c33-8e9c-c7612fbf6c9f";

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `changedetect` binary with env isolation.
///
/// Clears all `CHANGEDETECT_*` env vars and points the config file at
/// `config_path` so tests never touch the user's real configuration.
fn cd_cmd(config_path: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("changedetect");
    cmd.env("CHANGEDETECT_CONFIG", config_path)
        .env("HOME", "/tmp/changedetect-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/changedetect-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("CHANGEDETECT_PROFILE")
        .env_remove("CHANGEDETECT_URL")
        .env_remove("CHANGEDETECT_API_KEY")
        .env_remove("CHANGEDETECT_OUTPUT")
        .env_remove("CHANGEDETECT_INSECURE")
        .env_remove("CHANGEDETECT_TIMEOUT")
        .env_remove("RUST_LOG")
        .write_stdin("");
    cmd
}

/// Command wired to `server` through the URL and API key flags.
fn cd_at(dir: &tempfile::TempDir, server: &MockServer) -> assert_cmd::Command {
    let mut cmd = cd_cmd(&dir.path().join("config.toml"));
    cmd.args(["--base-url", &server.uri(), "--api-key", "test-key"]);
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

async fn mount_instance(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/watch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            WATCH_UUID: {
                "url": "https://example.com",
                "title": "Example",
                "last_changed": 1_700_000_000,
                "last_checked": 1_700_000_600,
                "last_error": false,
                "paused": true
            }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "t1": { "title": "Shops", "notification_urls": [], "notification_muted": false }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/systeminfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "watch_count": 1,
            "tag_count": 1,
            "version": "0.45.1",
            "uptime": 90061.0
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/notifications"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "notification_urls": ["mailto://ops@example.com"] })),
        )
        .mount(server)
        .await;
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = cd_cmd(&dir.path().join("config.toml")).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    cd_cmd(&dir.path().join("config.toml"))
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("changedetection.io")
                .and(predicate::str::contains("watches"))
                .and(predicate::str::contains("tags"))
                .and(predicate::str::contains("monitor")),
        );
}

#[test]
fn test_watches_subcommands_exist() {
    let dir = tempfile::tempdir().unwrap();
    cd_cmd(&dir.path().join("config.toml"))
        .args(["watches", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("pause")
                .and(predicate::str::contains("mute"))
                .and(predicate::str::contains("diff"))
                .and(predicate::str::contains("snapshot"))
                .and(predicate::str::contains("favicon")),
        );
}

#[test]
fn test_completions_bash() {
    let dir = tempfile::tempdir().unwrap();
    cd_cmd(&dir.path().join("config.toml"))
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("changedetect"));
}

#[test]
fn test_invalid_output_format() {
    let dir = tempfile::tempdir().unwrap();
    let output = cd_cmd(&dir.path().join("config.toml"))
        .args(["--output", "invalid", "watches", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("possible values"));
}

#[test]
fn test_missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    cd_cmd(&dir.path().join("config.toml"))
        .args(["watches", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_url_without_key_fails_with_auth_code() {
    let dir = tempfile::tempdir().unwrap();
    cd_cmd(&dir.path().join("config.toml"))
        .args(["--base-url", "http://127.0.0.1:9", "system", "info"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No API key"));
}

#[test]
fn test_call_list_needs_no_instance() {
    let dir = tempfile::tempdir().unwrap();
    cd_cmd(&dir.path().join("config.toml"))
        .args(["-o", "plain", "call", "--list"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("create_watch")
                .and(predicate::str::contains("get_diff"))
                .and(predicate::str::contains("bulk_import")),
        );
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_without_file() {
    let dir = tempfile::tempdir().unwrap();
    cd_cmd(&dir.path().join("config.toml"))
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]"));
}

#[test]
fn test_config_set_then_show() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");

    cd_cmd(&config)
        .args(["config", "set", "base_url", "http://cd.local:5000"])
        .assert()
        .success();
    cd_cmd(&config)
        .args(["config", "set", "api_key", "hunter2"])
        .assert()
        .success();
    cd_cmd(&config)
        .args(["config", "set", "scan_interval", "300"])
        .assert()
        .success();

    cd_cmd(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[profiles.default]")
                .and(predicate::str::contains("http://cd.local:5000"))
                .and(predicate::str::contains("scan_interval = 300"))
                .and(predicate::str::contains("hunter2").not()),
        );
    assert!(std::fs::read_to_string(&config).unwrap().contains("hunter2"));
}

#[test]
fn test_config_set_rejects_bad_values() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");

    cd_cmd(&config)
        .args(["config", "set", "colour", "red"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown config key"));
    cd_cmd(&config)
        .args(["config", "set", "base_url", "ftp://cd.local"])
        .assert()
        .code(2);
    cd_cmd(&config)
        .args(["config", "set", "timeout", "soon"])
        .assert()
        .code(2);
}

#[test]
fn test_config_use_unknown_profile() {
    let dir = tempfile::tempdir().unwrap();
    cd_cmd(&dir.path().join("config.toml"))
        .args(["config", "use", "office"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("office"));
}

// ── Against an instance ─────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_watches_list_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/watch"))
        .and(header("x-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            WATCH_UUID: { "url": "https://example.com", "title": "Example", "paused": true }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    let output = cd_at(&dir, &server)
        .args(["-o", "json", "watches", "list"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let listed: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listed[0]["uuid"], WATCH_UUID);
    assert_eq!(listed[0]["title"], "Example");
    assert_eq!(listed[0]["paused"], true);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watches_list_table() {
    let server = MockServer::start().await;
    mount_instance(&server).await;
    let dir = tempfile::tempdir().unwrap();

    cd_at(&dir, &server)
        .args(["watches", "list"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Example")
                .and(predicate::str::contains("paused"))
                .and(predicate::str::contains("UUID")),
        );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_profile_with_env_key() {
    let server = MockServer::start().await;
    mount_instance(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        format!(
            "default_profile = \"home\"\n\n[profiles.home]\nbase_url = \"{}\"\napi_key_env = \"CD_TEST_KEY\"\n",
            server.uri()
        ),
    )
    .unwrap();

    cd_cmd(&config)
        .env("CD_TEST_KEY", "test-key")
        .args(["-o", "plain", "tags", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("t1"));

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.headers["x-api-key"] == "test-key"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_system_info_table() {
    let server = MockServer::start().await;
    mount_instance(&server).await;
    let dir = tempfile::tempdir().unwrap();

    cd_at(&dir, &server)
        .args(["system", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.45.1").and(predicate::str::contains("1d 1h 1m")));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pause_and_mute() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/watch/{WATCH_UUID}")))
        .and(query_param("paused", "paused"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/watch/{WATCH_UUID}")))
        .and(query_param("muted", "unmuted"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    cd_at(&dir, &server)
        .args(["watches", "pause", WATCH_UUID])
        .assert()
        .success()
        .stderr(predicate::str::contains("Watch paused"));
    cd_at(&dir, &server)
        .args(["watches", "unmute", WATCH_UUID])
        .assert()
        .success();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_create_watch_rejects_non_http_url() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    cd_at(&dir, &server)
        .args(["watches", "create", "file:///etc/passwd"])
        .assert()
        .code(2);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_diff_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/watch/abc/difference/previous/latest"))
        .and(query_param("format", "htmlcolor"))
        .and(query_param("word_diff", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<ins>new</ins>"))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    cd_at(&dir, &server)
        .args(["watches", "diff", "abc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<ins>new</ins>"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_missing_watch_exits_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/watch/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string("No watch exists with the UUID"))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    cd_at(&dir, &server)
        .args(["watches", "get", "gone"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_key_exits_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/systeminfo"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Invalid access - API key invalid."))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    cd_at(&dir, &server)
        .args(["system", "info"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Authentication failed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_requires_yes_without_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/watch/abc"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    cd_at(&dir, &server)
        .args(["watches", "delete", "abc"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--yes"));
    cd_at(&dir, &server)
        .args(["--yes", "watches", "delete", "abc"])
        .assert()
        .success();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_import_from_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/import"))
        .and(query_param("dedupe", "true"))
        .and(body_string("https://a.example\nhttps://b.example"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["u1", "u2"])))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let urls = dir.path().join("urls.txt");
    std::fs::write(&urls, "https://a.example\n\n  https://b.example  \n").unwrap();

    cd_at(&dir, &server)
        .args(["-o", "plain", "import", "--file"])
        .arg(&urls)
        .assert()
        .success()
        .stdout(predicate::str::contains("u1\nu2"));
}

// ── Services & entities ─────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_call_create_watch_refreshes() {
    let server = MockServer::start().await;
    mount_instance(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/watch"))
        .and(body_json(json!({ "url": "https://example.com" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "uuid": "new" })))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();

    cd_at(&dir, &server)
        .args([
            "-o",
            "plain",
            "call",
            "create_watch",
            "--data",
            r#"{"url": "https://example.com"}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("new"));

    let polls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "GET" && r.url.path() == "/api/v1/watch")
        .count();
    assert_eq!(polls, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_call_unknown_service() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    cd_at(&dir, &server)
        .args(["call", "reboot"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("reboot"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_call_invalid_payload() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    cd_at(&dir, &server)
        .args(["call", "create_watch", "--data", r#"{"url": "not a url"}"#])
        .assert()
        .code(2);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_entities_json() {
    let server = MockServer::start().await;
    mount_instance(&server).await;
    let dir = tempfile::tempdir().unwrap();

    let output = cd_at(&dir, &server)
        .args(["-o", "json", "entities"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let entities: Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<&str> = entities
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["unique_id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"systeminfo_watch_count"));
    assert!(ids.contains(&format!("watch_{WATCH_UUID}").as_str()));
    assert!(ids.contains(&format!("recheck_{WATCH_UUID}").as_str()));
}

#[test]
fn test_entities_fail_when_instance_unreachable() {
    let dir = tempfile::tempdir().unwrap();

    cd_cmd(&dir.path().join("config.toml"))
        .args([
            "--base-url",
            "http://127.0.0.1:9",
            "--api-key",
            "k",
            "--timeout",
            "2",
            "entities",
        ])
        .assert()
        .code(7);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_monitor_stops_after_polls() {
    let server = MockServer::start().await;
    mount_instance(&server).await;
    let dir = tempfile::tempdir().unwrap();

    cd_at(&dir, &server)
        .args(["-o", "plain", "monitor", "--interval", "1", "--polls", "2"])
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .success()
        .stdout(predicate::str::contains("systeminfo_version"));

    let polls = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "GET" && r.url.path() == "/api/v1/watch")
        .count();
    assert!(polls >= 2, "expected at least two polls, saw {polls}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_monitor_reports_entities_going_unavailable() {
    let server = MockServer::start().await;
    // The setup poll succeeds, the next one fails.
    Mock::given(method("GET"))
        .and(path("/api/v1/watch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            WATCH_UUID: { "url": "https://example.com", "title": "Example" }
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/watch"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .with_priority(2)
        .mount(&server)
        .await;
    mount_instance(&server).await;
    let dir = tempfile::tempdir().unwrap();

    cd_at(&dir, &server)
        .args(["-o", "plain", "monitor", "--interval", "1", "--polls", "2"])
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .success()
        .stdout(predicate::str::contains("Example: unknown -> unavailable"))
        .stderr(predicate::str::contains("Update failed (1 in a row)"));
}
