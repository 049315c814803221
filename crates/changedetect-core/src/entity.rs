// ── Entities ──
//
// Sensors and buttons derived from the coordinator snapshot. System
// sensors come from a static description table; per-watch entities are
// generated for every watch present at render time. Rendering is a pure
// function of (snapshot, update status), so hosts can re-render on every
// snapshot change.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use strum::{AsRefStr, Display};

use changedetect_api::{Payload, SystemInfo, Watch};

use crate::coordinator::Coordinator;
use crate::error::CoreError;
use crate::snapshot::Snapshot;

pub const DOMAIN: &str = "changedetection";
pub const DEFAULT_NAME: &str = "ChangeDetection.io";

// ── Descriptors ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Platform {
    Sensor,
    Button,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceClass {
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StateClass {
    Measurement,
}

/// The single device every entity of an entry is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// `(domain, entry_id)`
    pub identifier: (String, String),
    pub name: String,
    pub manufacturer: String,
    pub sw_version: Option<String>,
    pub configuration_url: Option<String>,
}

impl DeviceInfo {
    pub fn for_entry(entry_id: &str, base_url: &str, snapshot: Option<&Snapshot>) -> Self {
        Self {
            identifier: (DOMAIN.to_owned(), entry_id.to_owned()),
            name: DEFAULT_NAME.to_owned(),
            manufacturer: "changedetection.io".to_owned(),
            sw_version: snapshot.and_then(|s| s.systeminfo.version.clone()),
            configuration_url: Some(base_url.to_owned()),
        }
    }
}

/// Rendered state of one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub unique_id: String,
    pub name: String,
    pub platform: Platform,
    pub icon: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<DeviceClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<StateClass>,
    /// `None` renders as "unknown".
    pub state: Option<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    pub available: bool,
}

// ── System sensors ───────────────────────────────────────────────

/// Static description of a system-info sensor.
pub struct SystemSensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub state_class: Option<StateClass>,
    pub value: fn(&SystemInfo) -> Option<Value>,
    pub attributes: fn(&SystemInfo) -> BTreeMap<String, Value>,
}

fn no_attributes(_: &SystemInfo) -> BTreeMap<String, Value> {
    BTreeMap::new()
}

fn count_attributes(info: &SystemInfo) -> BTreeMap<String, Value> {
    BTreeMap::from([
        ("watch_count".to_owned(), json!(info.watch_count)),
        ("tag_count".to_owned(), json!(info.tag_count)),
    ])
}

pub static SYSTEM_SENSORS: &[SystemSensorDescription] = &[
    SystemSensorDescription {
        key: "watch_count",
        name: "Watch Count",
        icon: "mdi:counter",
        state_class: Some(StateClass::Measurement),
        value: |info| info.watch_count.map(Value::from),
        attributes: no_attributes,
    },
    SystemSensorDescription {
        key: "tag_count",
        name: "Tag Count",
        icon: "mdi:tag-multiple",
        state_class: Some(StateClass::Measurement),
        value: |info| info.tag_count.map(Value::from),
        attributes: no_attributes,
    },
    SystemSensorDescription {
        key: "version",
        name: "Version",
        icon: "mdi:information",
        state_class: None,
        value: |info| info.version.clone().map(Value::from),
        attributes: count_attributes,
    },
    SystemSensorDescription {
        key: "uptime",
        name: "Uptime",
        icon: "mdi:timer-outline",
        state_class: None,
        value: |info| info.uptime.map(Value::from),
        attributes: no_attributes,
    },
];

fn render_system_sensor(
    desc: &SystemSensorDescription,
    info: Option<&SystemInfo>,
    available: bool,
) -> EntityState {
    EntityState {
        unique_id: format!("systeminfo_{}", desc.key),
        name: format!("{DEFAULT_NAME} {}", desc.name),
        platform: Platform::Sensor,
        icon: desc.icon,
        device_class: None,
        state_class: desc.state_class,
        state: info.and_then(desc.value),
        attributes: info.map(desc.attributes).unwrap_or_default(),
        available,
    }
}

// ── Watch entities ───────────────────────────────────────────────

fn rfc3339(secs: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(secs, 0).map(|t| t.to_rfc3339())
}

fn watch_attributes(uuid: &str, watch: &Watch) -> BTreeMap<String, Value> {
    BTreeMap::from([
        ("uuid".to_owned(), json!(uuid)),
        ("url".to_owned(), json!(watch.url)),
        ("link".to_owned(), json!(watch.link)),
        ("page_title".to_owned(), json!(watch.page_title)),
        ("paused".to_owned(), json!(watch.paused)),
        ("notification_muted".to_owned(), json!(watch.notification_muted)),
        ("method".to_owned(), json!(watch.method)),
        ("fetch_backend".to_owned(), json!(watch.fetch_backend)),
        (
            "last_checked".to_owned(),
            json!(watch.last_checked.and_then(rfc3339)),
        ),
        ("last_error".to_owned(), json!(watch.last_error)),
        ("tags".to_owned(), json!(watch.tags)),
    ])
}

fn render_watch_sensor(uuid: &str, watch: &Watch, available: bool) -> EntityState {
    EntityState {
        unique_id: format!("watch_{uuid}"),
        name: watch.display_name(uuid),
        platform: Platform::Sensor,
        icon: "mdi:web",
        device_class: Some(DeviceClass::Timestamp),
        state_class: None,
        state: watch.last_changed.and_then(rfc3339).map(Value::from),
        attributes: watch_attributes(uuid, watch),
        available,
    }
}

fn render_recheck_button(uuid: &str, watch: &Watch, available: bool) -> EntityState {
    EntityState {
        unique_id: format!("recheck_{uuid}"),
        name: format!("{} Recheck", watch.display_name(uuid)),
        platform: Platform::Button,
        icon: "mdi:refresh",
        device_class: None,
        state_class: None,
        state: None,
        attributes: BTreeMap::new(),
        available,
    }
}

// ── Rendering ────────────────────────────────────────────────────

/// Render every entity for a snapshot.
///
/// Watch entities follow the snapshot's watch set; system sensors are
/// always present. Everything is unavailable while the last poll failed.
pub fn render(snapshot: Option<&Snapshot>, last_update_success: bool) -> Vec<EntityState> {
    let available = last_update_success && snapshot.is_some();
    let mut entities = Vec::new();

    if let Some(snapshot) = snapshot {
        for (uuid, watch) in &snapshot.watches {
            entities.push(render_watch_sensor(uuid, watch, available));
            entities.push(render_recheck_button(uuid, watch, available));
        }
    }

    let info = snapshot.map(|s| &s.systeminfo);
    entities.extend(
        SYSTEM_SENSORS
            .iter()
            .map(|desc| render_system_sensor(desc, info, available)),
    );
    entities
}

/// Render the coordinator's current state.
pub fn render_current(coordinator: &Coordinator) -> Vec<EntityState> {
    let snapshot = coordinator.data();
    render(snapshot.as_deref(), coordinator.last_update_success())
}

/// Press a recheck button by its unique id (`recheck_{uuid}`).
///
/// Rechecks do not change polled data, so no refresh follows.
pub async fn press_button(coordinator: &Coordinator, unique_id: &str) -> Result<Payload, CoreError> {
    let uuid = unique_id
        .strip_prefix("recheck_")
        .ok_or_else(|| CoreError::Validation {
            message: format!("not a button: {unique_id}"),
        })?;
    coordinator
        .client()
        .recheck_watch(uuid)
        .await
        .map_err(|e| CoreError::service("recheck watch", e))
}
