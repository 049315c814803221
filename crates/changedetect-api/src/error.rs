use thiserror::Error;

/// Top-level error type for the `changedetect-api` crate.
///
/// Every client operation fails with this one type: transport problems
/// (connection refused, DNS, timeouts) and non-2xx responses alike.
/// `changedetect-core` wraps it into coordinator and service failures.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("Connection error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Request timed out.
    #[error("Timeout error: no response within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup error (unreadable or invalid CA certificate).
    #[error("TLS error: {0}")]
    Tls(String),

    /// The API key cannot be sent as an HTTP header value.
    #[error("Invalid API key: not a valid header value")]
    InvalidApiKey,

    // ── API ─────────────────────────────────────────────────────────
    /// Non-2xx response. The body is kept verbatim and never decoded.
    #[error("API error {status} for {url}: {body}")]
    Api {
        status: u16,
        url: String,
        body: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if the service rejected the API key.
    pub fn is_auth_error(&self) -> bool {
        matches!(self.status(), Some(401 | 403)) || matches!(self, Self::InvalidApiKey)
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns `true` if the failure is on the way to the service rather
    /// than a rejection by it.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
