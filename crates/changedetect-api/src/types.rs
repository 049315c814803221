// Wire types for the changedetection.io REST API.
//
// Responses differ between server versions, so nearly every field is
// optional and unknown fields land in `extra`. Request bodies skip unset
// fields so the server keeps its own defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};

// ── Lenient field decoding ───────────────────────────────────────────

/// Treat an explicit `null` as the type's default.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Unix timestamps arrive as integers or floats; `0` means "never".
fn unix_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let secs = match raw {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().map(|f| f.trunc() as i64),
        _ => None,
    };
    Ok(secs.filter(|s| *s > 0))
}

/// `last_error` is `false` when the last check succeeded.
fn error_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    })
}

// ── Watch ────────────────────────────────────────────────────────────

/// A monitored URL as reported by `GET /watch` or `GET /watch/{uuid}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Watch {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub page_title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub paused: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub notification_muted: bool,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub fetch_backend: Option<String>,
    #[serde(default, deserialize_with = "unix_timestamp")]
    pub last_checked: Option<i64>,
    #[serde(default, deserialize_with = "unix_timestamp")]
    pub last_changed: Option<i64>,
    #[serde(default, deserialize_with = "error_text")]
    pub last_error: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Watch {
    /// Human-facing name: title, then page title, then a short UUID label.
    pub fn display_name(&self, uuid: &str) -> String {
        [self.title.as_deref(), self.page_title.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map_or_else(
                || format!("Watch {}", uuid.chars().take(8).collect::<String>()),
                str::to_owned,
            )
    }
}

// ── Tag ──────────────────────────────────────────────────────────────

/// A named group of watches sharing notification settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub notification_urls: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub notification_muted: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── System info ──────────────────────────────────────────────────────

/// `GET /systeminfo`. Every field is optional; older servers omit `uptime`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    #[serde(default)]
    pub watch_count: Option<u64>,
    #[serde(default)]
    pub tag_count: Option<u64>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub uptime: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Enumerations ─────────────────────────────────────────────────────

/// HTTP method the service uses to fetch the watched URL.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

/// Fetcher used by the service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FetchBackend {
    HtmlRequests,
    HtmlWebdriver,
}

/// Change processor applied to fetched content.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Processor {
    TextJsonDiff,
    RestockDiff,
}

/// Output format of `GET /watch/{uuid}/difference/{from}/{to}`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DiffFormat {
    Text,
    Html,
    #[default]
    HtmlColor,
    Markdown,
}

// ── Watch requests ───────────────────────────────────────────────────

/// Recheck interval; unset units are left to the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBetweenCheck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weeks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds: Option<u32>,
}

/// Body of `POST /watch`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateWatchRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_backend: Option<FetchBackend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor: Option<Processor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_between_check: Option<TimeBetweenCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_format: Option<String>,
}

impl CreateWatchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// Body of `PUT /watch/{uuid}`. Only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateWatchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_muted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_backend: Option<FetchBackend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor: Option<Processor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_between_check: Option<TimeBetweenCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_format: Option<String>,
}

// ── Tag requests ─────────────────────────────────────────────────────

/// Body of `POST /tag`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTagRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_muted: Option<bool>,
}

/// Body of `PUT /tag/{uuid}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTagRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_muted: Option<bool>,
}

// ── Query options ────────────────────────────────────────────────────

/// Query options for the difference endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOptions {
    pub format: DiffFormat,
    pub word_diff: bool,
    pub no_markup: bool,
    /// Diff algorithm name as understood by the server (`diffLines`, ...).
    pub diff_type: String,
    pub changes_only: bool,
    pub ignore_whitespace: bool,
    pub removed: bool,
    pub added: bool,
    pub replaced: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            format: DiffFormat::HtmlColor,
            word_diff: false,
            no_markup: false,
            diff_type: "diffLines".into(),
            changes_only: true,
            ignore_whitespace: false,
            removed: true,
            added: true,
            replaced: true,
        }
    }
}

impl DiffOptions {
    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("format", self.format.to_string()),
            ("word_diff", self.word_diff.to_string()),
            ("no_markup", self.no_markup.to_string()),
            ("type", self.diff_type.clone()),
            ("changesOnly", self.changes_only.to_string()),
            ("ignoreWhitespace", self.ignore_whitespace.to_string()),
            ("removed", self.removed.to_string()),
            ("added", self.added.to_string()),
            ("replaced", self.replaced.to_string()),
        ]
    }
}

/// Query options for `POST /import`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Comma-separated tag UUIDs applied to every imported watch.
    pub tag_uuids: Option<String>,
    /// Tag name applied to every imported watch.
    pub tag: Option<String>,
    pub proxy: Option<String>,
    pub dedupe: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            tag_uuids: None,
            tag: None,
            proxy: None,
            dedupe: true,
        }
    }
}

impl ImportOptions {
    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(ref uuids) = self.tag_uuids {
            params.push(("tag_uuids", uuids.clone()));
        }
        if let Some(ref tag) = self.tag {
            params.push(("tag", tag.clone()));
        }
        if let Some(ref proxy) = self.proxy {
            params.push(("proxy", proxy.clone()));
        }
        params.push(("dedupe", self.dedupe.to_string()));
        params
    }
}

// ── Notifications ────────────────────────────────────────────────────

/// `GET /notifications` answers either a bare list or a wrapped object.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum NotificationUrls {
    Wrapped {
        #[serde(default, deserialize_with = "null_default")]
        notification_urls: Vec<String>,
    },
    List(Vec<String>),
}

impl From<NotificationUrls> for Vec<String> {
    fn from(value: NotificationUrls) -> Self {
        match value {
            NotificationUrls::Wrapped { notification_urls } => notification_urls,
            NotificationUrls::List(urls) => urls,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct NotificationUrlsBody<'a> {
    pub notification_urls: &'a [String],
}
