// Hand-crafted async HTTP client for the changedetection.io REST API.
//
// Base path: /api/v1/
// Auth: x-api-key header

use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::{DEFAULT_TIMEOUT, TransportConfig};

const API_KEY_HEADER: &str = "x-api-key";
const API_PREFIX: &str = "/api/v1";

// ── Payload ──────────────────────────────────────────────────────────

/// A decoded response body.
///
/// JSON when the response declared `application/json`, raw text or bytes
/// otherwise. Serializes as the JSON value, the string, or a byte array.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    Text(String),
    Binary(Bytes),
}

impl Payload {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The payload as a JSON value, wrapping text in a string.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => serde_json::Value::String(text),
            Self::Binary(bytes) => serde_json::Value::Array(
                bytes.iter().map(|b| serde_json::Value::from(*b)).collect(),
            ),
        }
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Json(value) => value.serialize(serializer),
            Self::Text(text) => serializer.serialize_str(text),
            Self::Binary(bytes) => serializer.serialize_bytes(bytes),
        }
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"))
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for one changedetection.io instance.
///
/// Every call is a single attempt under a fixed timeout; retrying is the
/// caller's business. The underlying `reqwest::Client` may be shared with
/// the rest of the host process.
#[derive(Clone)]
pub struct ChangeDetectionClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: HeaderValue,
    timeout: Duration,
}

impl std::fmt::Debug for ChangeDetectionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeDetectionClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ChangeDetectionClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client with its own HTTP session from a transport config.
    pub fn new(
        base_url: &str,
        api_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, api_key)?.with_timeout(transport.timeout))
    }

    /// Wrap a session owned by the host. The client never closes it.
    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        api_key: &SecretString,
    ) -> Result<Self, Error> {
        let mut api_key =
            HeaderValue::from_str(api_key.expose_secret()).map_err(|_| Error::InvalidApiKey)?;
        api_key.set_sensitive(true);

        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            api_key,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Instance root with `/api/v1/` appended unless already present.
    ///
    /// `http://host:5000` and `http://host:5000/api/v1/` both become
    /// `http://host:5000/api/v1/`.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw.trim())?;
        let path = url.path().trim_end_matches('/').to_owned();

        if path.ends_with(API_PREFIX) {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}{API_PREFIX}/"));
        }
        url.set_query(None);
        url.set_fragment(None);

        Ok(url)
    }

    /// The normalized API root (always ends with `/api/v1/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"watch/{uuid}"`) onto the API root.
    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── Request plumbing ─────────────────────────────────────────────

    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, Error> {
        let url = self.url(path)?;
        debug!("{method} {url}");

        Ok(self
            .http
            .request(method, url)
            .header(API_KEY_HEADER, self.api_key.clone())
            .header(ACCEPT, "application/json")
            .timeout(self.timeout))
    }

    fn map_transport(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }

    /// Send and reject any non-2xx status, keeping its body verbatim.
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, Error> {
        let resp = req.send().await.map_err(|e| self.map_transport(e))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let url = resp.url().to_string();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => format!("<unreadable body: {e}>"),
        };
        debug!(status = status.as_u16(), %url, "API request rejected");
        Err(Error::Api {
            status: status.as_u16(),
            url,
            body,
        })
    }

    async fn read_text(&self, resp: reqwest::Response) -> Result<String, Error> {
        resp.text().await.map_err(|e| self.map_transport(e))
    }

    /// Send and decode a JSON body into `T`.
    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, Error> {
        let resp = self.send(req).await?;
        let body = self.read_text(resp).await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }

    /// Send and decode according to the declared content type.
    pub(crate) async fn fetch_payload(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<Payload, Error> {
        let resp = self.send(req).await?;
        let json = is_json(resp.headers());
        let body = self.read_text(resp).await?;

        if !json {
            return Ok(Payload::Text(body));
        }
        serde_json::from_str(&body)
            .map(Payload::Json)
            .map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body,
            })
    }

    /// Send and return the raw body bytes.
    pub(crate) async fn fetch_bytes(&self, req: reqwest::RequestBuilder) -> Result<Bytes, Error> {
        let resp = self.send(req).await?;
        resp.bytes().await.map_err(|e| self.map_transport(e))
    }

    /// Send and discard the body.
    pub(crate) async fn fetch_empty(&self, req: reqwest::RequestBuilder) -> Result<(), Error> {
        self.send(req).await.map(drop)
    }
}
