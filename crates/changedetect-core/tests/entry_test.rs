#![allow(clippy::unwrap_used)]
// Entry setup/unload and the config flow.

mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use changedetect_core::entity::press_button;
use changedetect_core::{
    CoreError, EntryOptions, EntryRegistry, Platform, config_flow, flow_error_key, setup_entry,
    unload_entry, update_options, validate_connection,
};

use common::{
    WATCH_UUID, entry_config, mount_instance, mount_slow_watch_list, refused_uri, watch_polls,
};

// ── Setup / unload ──────────────────────────────────────────────────

#[tokio::test]
async fn test_setup_registers_and_renders_entities() {
    let server = MockServer::start().await;
    mount_instance(&server).await;
    let registry = EntryRegistry::new();

    let entities = setup_entry(&registry, "entry-1", entry_config(&server.uri()), None)
        .await
        .unwrap();

    // one sensor + one button per watch, plus four system sensors
    assert_eq!(entities.len(), 6);
    assert_eq!(
        entities
            .iter()
            .filter(|e| e.platform == Platform::Button)
            .count(),
        1
    );
    assert!(entities.iter().all(|e| e.available));

    let handles = registry.require("entry-1").unwrap();
    assert_eq!(handles.device.identifier, ("changedetection".into(), "entry-1".into()));
    assert_eq!(handles.device.sw_version.as_deref(), Some("0.45.1"));
    assert_eq!(registry.entry_ids(), vec!["entry-1".to_owned()]);

    unload_entry(&registry, "entry-1").await.unwrap();
    assert!(registry.is_empty());

    let err = unload_entry(&registry, "entry-1").await.unwrap_err();
    assert!(matches!(err, CoreError::EntryNotFound { .. }));
}

#[tokio::test]
async fn test_failed_first_poll_registers_nothing() {
    let registry = EntryRegistry::new();

    let err = setup_entry(&registry, "entry-1", entry_config(&refused_uri()), None)
        .await
        .unwrap_err();

    match err {
        CoreError::SetupFailed { ref message } => {
            assert!(message.contains("Connection error"), "got: {message}");
        }
        other => panic!("expected SetupFailed, got: {other:?}"),
    }
    assert!(registry.is_empty());
    assert!(registry.get("entry-1").is_none());
}

#[tokio::test]
async fn test_duplicate_entry_id_rejected() {
    let server = MockServer::start().await;
    mount_instance(&server).await;
    let registry = EntryRegistry::new();

    setup_entry(&registry, "entry-1", entry_config(&server.uri()), None)
        .await
        .unwrap();
    let err = setup_entry(&registry, "entry-1", entry_config(&server.uri()), None)
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::AlreadyConfigured { .. }));
    unload_entry(&registry, "entry-1").await.unwrap();
}

#[tokio::test]
async fn test_concurrent_setup_keeps_one_poller() {
    let server = MockServer::start().await;
    mount_instance(&server).await;
    mount_slow_watch_list(&server, Duration::from_millis(200)).await;
    let registry = EntryRegistry::new();
    let mut config = entry_config(&server.uri());
    config.scan_interval = Duration::from_millis(100);

    let (a, b) = tokio::join!(
        setup_entry(&registry, "entry-1", config.clone(), None),
        setup_entry(&registry, "entry-1", config, None),
    );

    assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
    let err = a.err().or(b.err()).unwrap();
    assert!(matches!(err, CoreError::AlreadyConfigured { .. }), "got: {err:?}");
    assert_eq!(registry.len(), 1);

    unload_entry(&registry, "entry-1").await.unwrap();
    let polls = watch_polls(&server).await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(watch_polls(&server).await, polls, "a poller outlived its entry");
}

#[tokio::test]
async fn test_shared_http_session() {
    let server = MockServer::start().await;
    mount_instance(&server).await;
    let registry = EntryRegistry::new();
    let http = reqwest::Client::new();

    setup_entry(&registry, "a", entry_config(&server.uri()), Some(http.clone()))
        .await
        .unwrap();
    unload_entry(&registry, "a").await.unwrap();

    // The host's session outlives the entry.
    let resp = http.get(format!("{}/api/v1/tags", server.uri())).send().await.unwrap();
    assert!(resp.status().is_success());
}

#[tokio::test]
async fn test_options_update_rebuilds_coordinator() {
    let server = MockServer::start().await;
    mount_instance(&server).await;
    let registry = EntryRegistry::new();
    setup_entry(&registry, "entry-1", entry_config(&server.uri()), None)
        .await
        .unwrap();
    let before = registry.require("entry-1").unwrap().coordinator;

    // Same interval: nothing happens.
    update_options(
        &registry,
        "entry-1",
        EntryOptions {
            scan_interval: Duration::from_secs(3600),
        },
    )
    .await
    .unwrap();
    assert_eq!(watch_polls(&server).await, 1);

    update_options(
        &registry,
        "entry-1",
        EntryOptions {
            scan_interval: Duration::from_secs(1800),
        },
    )
    .await
    .unwrap();

    let after = registry.require("entry-1").unwrap();
    assert_eq!(after.coordinator.scan_interval(), Duration::from_secs(1800));
    assert_eq!(before.scan_interval(), Duration::from_secs(3600));
    assert!(after.coordinator.data().is_some());
    assert_eq!(watch_polls(&server).await, 2);

    unload_entry(&registry, "entry-1").await.unwrap();
}

#[tokio::test]
async fn test_unload_during_options_update() {
    let server = MockServer::start().await;
    mount_instance(&server).await;
    let registry = EntryRegistry::new();
    setup_entry(&registry, "entry-1", entry_config(&server.uri()), None)
        .await
        .unwrap();
    mount_slow_watch_list(&server, Duration::from_millis(200)).await;

    let unload = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        unload_entry(&registry, "entry-1").await
    };
    let (updated, unloaded) = tokio::join!(
        update_options(
            &registry,
            "entry-1",
            EntryOptions {
                scan_interval: Duration::from_millis(100),
            },
        ),
        unload,
    );

    unloaded.unwrap();
    let err = updated.unwrap_err();
    assert!(matches!(err, CoreError::EntryNotFound { .. }), "got: {err:?}");
    assert!(registry.is_empty());

    let polls = watch_polls(&server).await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(watch_polls(&server).await, polls, "a poller outlived its entry");
}

#[tokio::test]
async fn test_event_subscribers_survive_options_update() {
    let server = MockServer::start().await;
    mount_instance(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "watches": {} })))
        .mount(&server)
        .await;
    let registry = EntryRegistry::new();
    setup_entry(&registry, "entry-1", entry_config(&server.uri()), None)
        .await
        .unwrap();
    let mut events = registry.require("entry-1").unwrap().services.events();

    update_options(
        &registry,
        "entry-1",
        EntryOptions {
            scan_interval: Duration::from_secs(1800),
        },
    )
    .await
    .unwrap();
    registry
        .require("entry-1")
        .unwrap()
        .services
        .call_by_name("search", json!({ "query": "example" }))
        .await
        .unwrap();

    let event = events.try_recv().unwrap();
    assert_eq!(event.event_type(), "changedetection_search_results");
    unload_entry(&registry, "entry-1").await.unwrap();
}

#[tokio::test]
async fn test_recheck_button_press() {
    let server = MockServer::start().await;
    mount_instance(&server).await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/watch/{WATCH_UUID}")))
        .and(query_param("recheck", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;
    let registry = EntryRegistry::new();
    setup_entry(&registry, "entry-1", entry_config(&server.uri()), None)
        .await
        .unwrap();
    let handles = registry.require("entry-1").unwrap();

    press_button(&handles.coordinator, &format!("recheck_{WATCH_UUID}"))
        .await
        .unwrap();
    let err = press_button(&handles.coordinator, "watch_x").await.unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));

    unload_entry(&registry, "entry-1").await.unwrap();
}

// ── Config flow ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_validate_connection_title() {
    let server = MockServer::start().await;
    mount_instance(&server).await;

    let info = validate_connection(&entry_config(&server.uri()), None)
        .await
        .unwrap();

    assert_eq!(info.title, "ChangeDetection.io (3 watches)");
    assert_eq!(info.unique_id, server.uri());
}

#[tokio::test]
async fn test_validate_connection_missing_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/systeminfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "0.40" })))
        .mount(&server)
        .await;

    let info = validate_connection(&entry_config(&server.uri()), None)
        .await
        .unwrap();
    assert_eq!(info.title, "ChangeDetection.io (0 watches)");
}

#[tokio::test]
async fn test_config_flow_rejects_configured_instance() {
    let server = MockServer::start().await;
    mount_instance(&server).await;
    let registry = EntryRegistry::new();
    setup_entry(&registry, "entry-1", entry_config(&server.uri()), None)
        .await
        .unwrap();

    let with_slash = format!("{}/", server.uri());
    let err = config_flow(&registry, &entry_config(&with_slash), None)
        .await
        .unwrap_err();

    assert_eq!(flow_error_key(&err), "already_configured");
    unload_entry(&registry, "entry-1").await.unwrap();
}

#[tokio::test]
async fn test_config_flow_bad_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/systeminfo"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Invalid access - API key invalid."))
        .mount(&server)
        .await;

    let err = config_flow(&EntryRegistry::new(), &entry_config(&server.uri()), None)
        .await
        .unwrap_err();
    assert_eq!(flow_error_key(&err), "invalid_auth");
}
