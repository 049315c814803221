// ── Runtime entry configuration ──
//
// Describes how to reach one changedetection.io instance and how often to
// poll it. Carries the API key but never touches disk; the CLI builds an
// `EntryConfig` from its profile and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use changedetect_api::{TlsMode, TransportConfig};
use secrecy::SecretString;
use url::Url;

pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_TIMEOUT: Duration = changedetect_api::transport::DEFAULT_TIMEOUT;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

/// Configuration for one entry.
#[derive(Debug, Clone)]
pub struct EntryConfig {
    /// Instance root, e.g. `http://localhost:5000`.
    pub base_url: Url,
    pub api_key: SecretString,
    /// Poll interval. Fixed for the coordinator's lifetime.
    pub scan_interval: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
    pub tls: TlsVerification,
    /// Include `GET /tags` in every poll.
    pub fetch_tags: bool,
    /// Include `GET /notifications` in every poll.
    pub fetch_notifications: bool,
}

impl EntryConfig {
    pub fn new(base_url: Url, api_key: SecretString) -> Self {
        Self {
            base_url,
            api_key,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            tls: TlsVerification::default(),
            fetch_tags: true,
            fetch_notifications: true,
        }
    }

    /// Identity of the instance: the base URL without trailing slashes.
    pub fn unique_id(&self) -> String {
        self.base_url.as_str().trim_end_matches('/').to_owned()
    }

    /// Transport settings for building a dedicated HTTP session.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }
}

/// Options that can change after setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryOptions {
    pub scan_interval: Duration,
}
