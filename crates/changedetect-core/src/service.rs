// ── Service calls ──
//
// Named operations a host can invoke with a loose JSON payload. Each
// payload is validated against a per-service schema before any request is
// made. Writes ask the coordinator for a refresh afterwards; reads that
// produce data publish it as a domain event as well as returning it.

use std::collections::BTreeMap;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};
use tokio::sync::broadcast;
use tracing::{debug, info};
use url::Url;

use changedetect_api::{
    CreateTagRequest, CreateWatchRequest, DiffFormat, DiffOptions, FetchBackend, HttpMethod,
    ImportOptions, Payload, Processor, UpdateTagRequest, UpdateWatchRequest,
};

use crate::coordinator::Coordinator;
use crate::entity::DOMAIN;
use crate::error::CoreError;

const EVENT_CHANNEL_SIZE: usize = 64;

// ── Service names ────────────────────────────────────────────────

/// Every service exposed under the `changedetection` domain.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Service {
    CreateWatch,
    DeleteWatch,
    UpdateWatch,
    RecheckWatch,
    PauseWatch,
    UnpauseWatch,
    MuteWatch,
    UnmuteWatch,
    GetSnapshot,
    GetDiff,
    CreateTag,
    DeleteTag,
    UpdateTag,
    RecheckTag,
    MuteTag,
    UnmuteTag,
    Search,
    BulkImport,
    AddNotifications,
    ReplaceNotifications,
    DeleteNotifications,
}

impl Service {
    /// Whether the call changes remote state that the snapshot mirrors.
    pub fn refreshes(self) -> bool {
        !matches!(
            self,
            Self::RecheckWatch | Self::RecheckTag | Self::GetSnapshot | Self::GetDiff | Self::Search
        )
    }

    /// Human phrasing used in failure messages ("Failed to <operation>").
    pub fn operation(self) -> String {
        let name: &'static str = self.into();
        name.replace('_', " ")
    }
}

// ── Domain events ────────────────────────────────────────────────

/// Results published on the event channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    SnapshotReceived {
        uuid: String,
        timestamp: String,
        content: Payload,
    },
    DiffReceived {
        uuid: String,
        from_timestamp: String,
        to_timestamp: String,
        content: Payload,
    },
    SearchResults {
        query: String,
        results: Value,
    },
    ImportCompleted {
        imported_uuids: Vec<String>,
    },
}

impl DomainEvent {
    /// Fully qualified event type, e.g. `changedetection_diff_received`.
    pub fn event_type(&self) -> String {
        let suffix = match self {
            Self::SnapshotReceived { .. } => "snapshot_received",
            Self::DiffReceived { .. } => "diff_received",
            Self::SearchResults { .. } => "search_results",
            Self::ImportCompleted { .. } => "import_completed",
        };
        format!("{DOMAIN}_{suffix}")
    }
}

// ── Payload schemas ──────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

fn one_or_many<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    OneOrMany::deserialize(d).map(Into::into)
}

fn opt_one_or_many<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
    Ok(Option::<OneOrMany>::deserialize(d)?.map(Into::into))
}

fn check_http_url<E: serde::de::Error>(raw: &str) -> Result<String, E> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| E::custom(format!("invalid url {raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(E::custom(format!("invalid url {raw:?}: scheme must be http or https")));
    }
    Ok(trimmed.to_owned())
}

fn http_url<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    check_http_url(&String::deserialize(d)?)
}

fn opt_http_url<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Option::<String>::deserialize(d)?
        .map(|raw| check_http_url(&raw))
        .transpose()
}

fn non_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let s = String::deserialize(d)?;
    if s.trim().is_empty() {
        return Err(D::Error::custom("must not be empty"));
    }
    Ok(s)
}

fn latest() -> String {
    "latest".to_owned()
}

fn previous() -> String {
    "previous".to_owned()
}

fn yes() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateWatchData {
    #[serde(deserialize_with = "http_url")]
    url: String,
    title: Option<String>,
    tag: Option<String>,
    #[serde(default, deserialize_with = "opt_one_or_many")]
    tags: Option<Vec<String>>,
    method: Option<HttpMethod>,
    fetch_backend: Option<FetchBackend>,
    processor: Option<Processor>,
    headers: Option<BTreeMap<String, String>>,
    body: Option<String>,
    proxy: Option<String>,
    #[serde(default, deserialize_with = "opt_one_or_many")]
    notification_urls: Option<Vec<String>>,
    notification_title: Option<String>,
    notification_body: Option<String>,
    notification_format: Option<String>,
}

impl From<CreateWatchData> for CreateWatchRequest {
    fn from(d: CreateWatchData) -> Self {
        Self {
            url: d.url,
            title: d.title,
            tag: d.tag,
            tags: d.tags,
            method: d.method,
            fetch_backend: d.fetch_backend,
            processor: d.processor,
            headers: d.headers,
            body: d.body,
            proxy: d.proxy,
            time_between_check: None,
            notification_urls: d.notification_urls,
            notification_title: d.notification_title,
            notification_body: d.notification_body,
            notification_format: d.notification_format,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateWatchData {
    #[serde(deserialize_with = "non_empty")]
    uuid: String,
    #[serde(default, deserialize_with = "opt_http_url")]
    url: Option<String>,
    title: Option<String>,
    paused: Option<bool>,
    notification_muted: Option<bool>,
    tag: Option<String>,
    #[serde(default, deserialize_with = "opt_one_or_many")]
    tags: Option<Vec<String>>,
    method: Option<HttpMethod>,
    fetch_backend: Option<FetchBackend>,
    processor: Option<Processor>,
    proxy: Option<String>,
}

impl UpdateWatchData {
    fn split(self) -> (String, UpdateWatchRequest) {
        let req = UpdateWatchRequest {
            url: self.url,
            title: self.title,
            paused: self.paused,
            notification_muted: self.notification_muted,
            tag: self.tag,
            tags: self.tags,
            method: self.method,
            fetch_backend: self.fetch_backend,
            processor: self.processor,
            proxy: self.proxy,
            ..UpdateWatchRequest::default()
        };
        (self.uuid, req)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UuidData {
    #[serde(deserialize_with = "non_empty")]
    uuid: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SnapshotData {
    #[serde(deserialize_with = "non_empty")]
    uuid: String,
    #[serde(default = "latest")]
    timestamp: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DiffData {
    #[serde(deserialize_with = "non_empty")]
    uuid: String,
    #[serde(default = "previous")]
    from_timestamp: String,
    #[serde(default = "latest")]
    to_timestamp: String,
    #[serde(default)]
    format: DiffFormat,
    #[serde(default)]
    word_diff: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateTagData {
    #[serde(deserialize_with = "non_empty")]
    title: String,
    #[serde(default, deserialize_with = "opt_one_or_many")]
    notification_urls: Option<Vec<String>>,
    notification_muted: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateTagData {
    #[serde(deserialize_with = "non_empty")]
    uuid: String,
    title: Option<String>,
    #[serde(default, deserialize_with = "opt_one_or_many")]
    notification_urls: Option<Vec<String>>,
    notification_muted: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchData {
    query: String,
    tag: Option<String>,
    #[serde(default)]
    partial: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ImportData {
    #[serde(deserialize_with = "non_empty")]
    urls_text: String,
    tag_uuids: Option<String>,
    tag: Option<String>,
    proxy: Option<String>,
    #[serde(default = "yes")]
    dedupe: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NotificationUrlsData {
    #[serde(deserialize_with = "one_or_many")]
    notification_urls: Vec<String>,
}

fn parse<T: DeserializeOwned>(service: Service, data: Value) -> Result<T, CoreError> {
    let data = if data.is_null() {
        Value::Object(Map::new())
    } else {
        data
    };
    serde_json::from_value(data).map_err(|e| CoreError::Validation {
        message: format!("{service}: {e}"),
    })
}

// ── Dispatcher ───────────────────────────────────────────────────

/// Outcome of one call before the refresh/event bookkeeping.
struct Outcome {
    response: Option<Value>,
    event: Option<DomainEvent>,
}

impl Outcome {
    fn none() -> Self {
        Self {
            response: None,
            event: None,
        }
    }

    fn payload(payload: Payload) -> Self {
        Self {
            response: Some(payload.into_json()),
            event: None,
        }
    }
}

/// Routes service calls for one entry onto its client and coordinator.
#[derive(Clone)]
pub struct ServiceDispatcher {
    coordinator: Coordinator,
    events: broadcast::Sender<DomainEvent>,
}

impl ServiceDispatcher {
    pub fn new(coordinator: Coordinator) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            coordinator,
            events,
        }
    }

    /// Dispatcher bound to `coordinator` that publishes on this one's
    /// event channel, so existing subscribers keep receiving.
    pub fn with_coordinator(&self, coordinator: Coordinator) -> Self {
        Self {
            coordinator,
            events: self.events.clone(),
        }
    }

    /// Subscribe to domain events produced by service calls.
    pub fn events(&self) -> broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    /// Invoke a service by its wire name.
    pub async fn call_by_name(&self, name: &str, data: Value) -> Result<Option<Value>, CoreError> {
        let service: Service = name.parse().map_err(|_| CoreError::UnknownService {
            name: name.to_owned(),
        })?;
        self.call(service, data).await
    }

    /// Validate `data`, run the service, refresh after writes and publish
    /// any resulting event. Returns the service's response, if it has one.
    pub async fn call(&self, service: Service, data: Value) -> Result<Option<Value>, CoreError> {
        debug!(%service, "service call");
        let outcome = self.execute(service, data).await?;

        if service.refreshes() {
            self.coordinator.request_refresh().await;
        }
        if let Some(event) = outcome.event {
            info!(event_type = %event.event_type(), "publishing event");
            // No subscribers is fine; the response still carries the data.
            let _ = self.events.send(event);
        }
        Ok(outcome.response)
    }

    async fn execute(&self, service: Service, data: Value) -> Result<Outcome, CoreError> {
        match service {
            Service::CreateWatch
            | Service::DeleteWatch
            | Service::UpdateWatch
            | Service::RecheckWatch
            | Service::PauseWatch
            | Service::UnpauseWatch
            | Service::MuteWatch
            | Service::UnmuteWatch => self.watch_call(service, data).await,
            Service::GetSnapshot | Service::GetDiff => self.history_call(service, data).await,
            Service::CreateTag
            | Service::DeleteTag
            | Service::UpdateTag
            | Service::RecheckTag
            | Service::MuteTag
            | Service::UnmuteTag => self.tag_call(service, data).await,
            Service::Search | Service::BulkImport => self.instance_call(service, data).await,
            Service::AddNotifications
            | Service::ReplaceNotifications
            | Service::DeleteNotifications => self.notification_call(service, data).await,
        }
    }

    async fn watch_call(&self, service: Service, data: Value) -> Result<Outcome, CoreError> {
        let client = self.coordinator.client();
        let fail = |e| CoreError::service(service.operation(), e);

        if service == Service::CreateWatch {
            let data: CreateWatchData = parse(service, data)?;
            let created = client.create_watch(&data.into()).await.map_err(fail)?;
            return Ok(Outcome::payload(created));
        }
        if service == Service::UpdateWatch {
            let (uuid, req) = parse::<UpdateWatchData>(service, data)?.split();
            let updated = client.update_watch(&uuid, &req).await.map_err(fail)?;
            return Ok(Outcome::payload(updated));
        }

        let UuidData { uuid } = parse(service, data)?;
        let result = match service {
            Service::DeleteWatch => {
                client.delete_watch(&uuid).await.map_err(fail)?;
                return Ok(Outcome::none());
            }
            Service::RecheckWatch => client.recheck_watch(&uuid).await,
            Service::PauseWatch => client.set_watch_paused(&uuid, true).await,
            Service::UnpauseWatch => client.set_watch_paused(&uuid, false).await,
            Service::MuteWatch => client.set_watch_muted(&uuid, true).await,
            _ => client.set_watch_muted(&uuid, false).await,
        };
        result.map(Outcome::payload).map_err(fail)
    }

    async fn history_call(&self, service: Service, data: Value) -> Result<Outcome, CoreError> {
        let client = self.coordinator.client();
        let fail = |e| CoreError::service(service.operation(), e);

        let event = if service == Service::GetSnapshot {
            let SnapshotData { uuid, timestamp } = parse(service, data)?;
            let content = client
                .watch_snapshot(&uuid, &timestamp, false)
                .await
                .map_err(fail)?;
            DomainEvent::SnapshotReceived {
                uuid,
                timestamp,
                content,
            }
        } else {
            let data: DiffData = parse(service, data)?;
            let options = DiffOptions {
                format: data.format,
                word_diff: data.word_diff,
                ..DiffOptions::default()
            };
            let content = client
                .watch_diff(&data.uuid, &data.from_timestamp, &data.to_timestamp, &options)
                .await
                .map_err(fail)?;
            DomainEvent::DiffReceived {
                uuid: data.uuid,
                from_timestamp: data.from_timestamp,
                to_timestamp: data.to_timestamp,
                content,
            }
        };

        Ok(Outcome {
            response: Some(json!(event)),
            event: Some(event),
        })
    }

    async fn tag_call(&self, service: Service, data: Value) -> Result<Outcome, CoreError> {
        let client = self.coordinator.client();
        let fail = |e| CoreError::service(service.operation(), e);

        if service == Service::CreateTag {
            let data: CreateTagData = parse(service, data)?;
            let req = CreateTagRequest {
                title: data.title,
                notification_urls: data.notification_urls,
                notification_muted: data.notification_muted,
            };
            return client
                .create_tag(&req)
                .await
                .map(Outcome::payload)
                .map_err(fail);
        }
        if service == Service::UpdateTag {
            let data: UpdateTagData = parse(service, data)?;
            let req = UpdateTagRequest {
                title: data.title,
                notification_urls: data.notification_urls,
                notification_muted: data.notification_muted,
            };
            return client
                .update_tag(&data.uuid, &req)
                .await
                .map(Outcome::payload)
                .map_err(fail);
        }

        let UuidData { uuid } = parse(service, data)?;
        let result = match service {
            Service::DeleteTag => {
                client.delete_tag(&uuid).await.map_err(fail)?;
                return Ok(Outcome::none());
            }
            Service::RecheckTag => client.recheck_tag(&uuid).await,
            Service::MuteTag => client.set_tag_muted(&uuid, true).await,
            _ => client.set_tag_muted(&uuid, false).await,
        };
        result.map(Outcome::payload).map_err(fail)
    }

    async fn instance_call(&self, service: Service, data: Value) -> Result<Outcome, CoreError> {
        let client = self.coordinator.client();
        let fail = |e| CoreError::service(service.operation(), e);

        let event = if service == Service::Search {
            let data: SearchData = parse(service, data)?;
            let results = client
                .search(&data.query, data.tag.as_deref(), data.partial)
                .await
                .map_err(fail)?;
            DomainEvent::SearchResults {
                query: data.query,
                results,
            }
        } else {
            let data: ImportData = parse(service, data)?;
            let options = ImportOptions {
                tag_uuids: data.tag_uuids,
                tag: data.tag,
                proxy: data.proxy,
                dedupe: data.dedupe,
            };
            let imported_uuids = client
                .bulk_import(&data.urls_text, &options)
                .await
                .map_err(fail)?;
            info!(count = imported_uuids.len(), "bulk import finished");
            DomainEvent::ImportCompleted { imported_uuids }
        };

        Ok(Outcome {
            response: Some(json!(event)),
            event: Some(event),
        })
    }

    async fn notification_call(&self, service: Service, data: Value) -> Result<Outcome, CoreError> {
        let client = self.coordinator.client();
        let fail = |e| CoreError::service(service.operation(), e);
        let NotificationUrlsData { notification_urls } = parse(service, data)?;

        let result = match service {
            Service::AddNotifications => client
                .add_notifications(&notification_urls)
                .await
                .map(Outcome::payload),
            Service::ReplaceNotifications => client
                .replace_notifications(&notification_urls)
                .await
                .map(Outcome::payload),
            _ => client
                .delete_notifications(&notification_urls)
                .await
                .map(|()| Outcome::none()),
        };
        result.map_err(fail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    #[test]
    fn service_names_round_trip() {
        assert_eq!(Service::iter().count(), 21);
        assert_eq!(Service::CreateWatch.to_string(), "create_watch");
        assert_eq!(
            "replace_notifications".parse::<Service>().unwrap(),
            Service::ReplaceNotifications
        );
        assert!("reboot".parse::<Service>().is_err());
    }

    #[test]
    fn only_writes_refresh() {
        let read_only: Vec<Service> = Service::iter().filter(|s| !s.refreshes()).collect();
        assert_eq!(
            read_only,
            vec![
                Service::RecheckWatch,
                Service::GetSnapshot,
                Service::GetDiff,
                Service::RecheckTag,
                Service::Search,
            ]
        );
    }

    #[test]
    fn operation_phrasing() {
        assert_eq!(Service::CreateWatch.operation(), "create watch");
        assert_eq!(Service::BulkImport.operation(), "bulk import");
        assert_eq!(Service::DeleteNotifications.operation(), "delete notifications");
    }

    #[test]
    fn create_watch_requires_http_url() {
        let err = parse::<CreateWatchData>(Service::CreateWatch, json!({ "url": "ftp://x" }))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));

        let err =
            parse::<CreateWatchData>(Service::CreateWatch, json!({ "title": "x" })).unwrap_err();
        assert!(err.to_string().contains("url"));
    }

    #[test]
    fn create_watch_keeps_url_verbatim() {
        let data: CreateWatchData =
            parse(Service::CreateWatch, json!({ "url": "https://example.com" })).unwrap();
        let req = CreateWatchRequest::from(data);
        assert_eq!(
            serde_json::to_value(req).unwrap(),
            json!({ "url": "https://example.com" })
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = parse::<UuidData>(Service::PauseWatch, json!({ "uuid": "a", "force": true }))
            .unwrap_err();
        assert!(err.to_string().contains("force"));
    }

    #[test]
    fn enumerations_are_checked() {
        let err = parse::<CreateWatchData>(
            Service::CreateWatch,
            json!({ "url": "https://example.com", "method": "PATCH" }),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));

        let err = parse::<DiffData>(Service::GetDiff, json!({ "uuid": "a", "format": "pdf" }))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
    }

    #[test]
    fn diff_defaults() {
        let data: DiffData = parse(Service::GetDiff, json!({ "uuid": "abc" })).unwrap();
        assert_eq!(data.from_timestamp, "previous");
        assert_eq!(data.to_timestamp, "latest");
        assert_eq!(data.format, DiffFormat::HtmlColor);
        assert!(!data.word_diff);
    }

    #[test]
    fn snapshot_and_import_defaults() {
        let snap: SnapshotData = parse(Service::GetSnapshot, json!({ "uuid": "abc" })).unwrap();
        assert_eq!(snap.timestamp, "latest");

        let import: ImportData =
            parse(Service::BulkImport, json!({ "urls_text": "https://a.example" })).unwrap();
        assert!(import.dedupe);
    }

    #[test]
    fn single_string_accepted_as_list() {
        let data: NotificationUrlsData = parse(
            Service::AddNotifications,
            json!({ "notification_urls": "mailto://ops@example.com" }),
        )
        .unwrap();
        assert_eq!(data.notification_urls, vec!["mailto://ops@example.com".to_owned()]);

        let data: CreateTagData =
            parse(Service::CreateTag, json!({ "title": "t", "notification_urls": ["a", "b"] }))
                .unwrap();
        assert_eq!(data.notification_urls.unwrap().len(), 2);
    }

    #[test]
    fn missing_payload_is_validation_error() {
        let err = parse::<UuidData>(Service::DeleteWatch, Value::Null).unwrap_err();
        assert!(err.to_string().contains("delete_watch"));
    }

    #[test]
    fn event_types_are_namespaced() {
        let event = DomainEvent::ImportCompleted {
            imported_uuids: vec![],
        };
        assert_eq!(event.event_type(), "changedetection_import_completed");
        assert_eq!(json!(event), json!({ "imported_uuids": [] }));
    }
}
