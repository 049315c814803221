// Shared wiremock fixtures for the core integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use changedetect_api::ChangeDetectionClient;
use changedetect_core::{Coordinator, EntryConfig, PollScope};

pub const WATCH_UUID: &str = "095be615-a8ad-4c33-8e9c-c7612fbf6c9f";

/// Mount the four read endpoints a poll hits.
pub async fn mount_instance(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/watch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            WATCH_UUID: {
                "url": "https://example.com",
                "title": "Example",
                "last_changed": 1_700_000_000,
                "last_checked": 1_700_000_600,
                "last_error": false
            }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/systeminfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "watch_count": 3,
            "tag_count": 1,
            "version": "0.45.1",
            "uptime": 1234.5
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/notifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "notification_urls": [] })))
        .mount(server)
        .await;
}

/// Answer `GET /watch` after `delay`, ahead of the regular fixture.
pub async fn mount_slow_watch_list(server: &MockServer, delay: Duration) {
    Mock::given(method("GET"))
        .and(path("/api/v1/watch"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(delay),
        )
        .with_priority(1)
        .mount(server)
        .await;
}

/// A local URL nothing listens on: bind an ephemeral port, then release it.
pub fn refused_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn entry_config(uri: &str) -> EntryConfig {
    let mut config = EntryConfig::new(uri.parse().unwrap(), SecretString::from("test-key".to_owned()));
    // Long enough that the interval task never fires during a test.
    config.scan_interval = Duration::from_secs(3600);
    config
}

pub fn coordinator(server: &MockServer) -> Coordinator {
    let key = SecretString::from("test-key".to_owned());
    let client =
        ChangeDetectionClient::with_client(reqwest::Client::new(), &server.uri(), &key).unwrap();
    Coordinator::new(client, Duration::from_secs(3600), PollScope::default())
}

/// Number of `GET /watch` list requests the server has seen, i.e. polls.
pub async fn watch_polls(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "GET" && r.url.path() == "/api/v1/watch")
        .count()
}
