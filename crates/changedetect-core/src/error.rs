// ── Core error types ──
//
// Errors surfaced by the coordinator, service dispatcher and entry
// lifecycle. Client failures keep their `changedetect_api::Error` intact
// so callers can still ask for the status code or transient-ness.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Client errors ────────────────────────────────────────────────
    #[error(transparent)]
    Api(#[from] changedetect_api::Error),

    // ── Coordinator errors ───────────────────────────────────────────
    /// A poll failed; the previous snapshot is kept.
    #[error("Error communicating with API: {message}")]
    UpdateFailed { message: String },

    /// The first poll during entry setup failed; nothing was registered.
    #[error("Setup failed: {message}")]
    SetupFailed { message: String },

    // ── Service errors ───────────────────────────────────────────────
    #[error("Failed to {operation}: {source}")]
    ServiceFailed {
        operation: String,
        #[source]
        source: changedetect_api::Error,
    },

    #[error("Invalid service data: {message}")]
    Validation { message: String },

    #[error("Unknown service: {name}")]
    UnknownService { name: String },

    // ── Entry lifecycle ──────────────────────────────────────────────
    #[error("No entry configured with id {entry_id}")]
    EntryNotFound { entry_id: String },

    #[error("Already configured: {unique_id}")]
    AlreadyConfigured { unique_id: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Wrap a client failure from a named service operation.
    pub fn service(operation: impl Into<String>, source: changedetect_api::Error) -> Self {
        Self::ServiceFailed {
            operation: operation.into(),
            source,
        }
    }

    /// The underlying client error, if any.
    pub fn api_error(&self) -> Option<&changedetect_api::Error> {
        match self {
            Self::Api(e) | Self::ServiceFailed { source: e, .. } => Some(e),
            _ => None,
        }
    }
}

impl From<crate::coordinator::UpdateFailed> for CoreError {
    fn from(err: crate::coordinator::UpdateFailed) -> Self {
        Self::UpdateFailed {
            message: err.message,
        }
    }
}
