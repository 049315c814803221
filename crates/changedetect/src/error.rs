//! CLI error types with miette diagnostics.
//!
//! Maps client, core and config errors into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use changedetect_config::ConfigError;
use changedetect_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to changedetection.io at {url}")]
    #[diagnostic(
        code(changedetect::connection_failed),
        help(
            "Check that the instance is running and reachable.\n\
             URL: {url}\n\
             Try: changedetect system info --insecure"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("TLS setup failed: {reason}")]
    #[diagnostic(
        code(changedetect::tls_error),
        help(
            "Use --insecure (-k) to accept a self-signed certificate,\n\
             or point ca_cert in your profile at a readable PEM file."
        )
    )]
    TlsError { reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(changedetect::timeout),
        help("Increase timeout with --timeout or check the instance's responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed")]
    #[diagnostic(
        code(changedetect::auth_failed),
        help(
            "Verify the API key under Settings > API on your instance.\n\
             Run: changedetect config set-key"
        )
    )]
    AuthFailed,

    #[error("No API key configured for profile '{profile}'")]
    #[diagnostic(
        code(changedetect::no_credentials),
        help(
            "Configure credentials with: changedetect config init\n\
             Or set the CHANGEDETECT_API_KEY environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(changedetect::not_found),
        help("Run: changedetect {list_command} to see what exists")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{identifier} is already configured")]
    #[diagnostic(code(changedetect::conflict))]
    Conflict { identifier: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("API error ({status}): {message}")]
    #[diagnostic(code(changedetect::api_error))]
    ApiError { status: u16, message: String },

    #[error("{message}")]
    #[diagnostic(code(changedetect::service_failed))]
    ServiceFailed { message: String },

    #[error("Unexpected response: {message}")]
    #[diagnostic(
        code(changedetect::bad_response),
        help("Re-run with -vv to log the raw response body.")
    )]
    BadResponse { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(changedetect::validation))]
    Validation { field: String, reason: String },

    #[error("Unknown service '{name}'")]
    #[diagnostic(
        code(changedetect::unknown_service),
        help("Run: changedetect call --list")
    )]
    UnknownService { name: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(changedetect::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: changedetect config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(changedetect::no_config),
        help(
            "Create one with: changedetect config init\n\
             Expected at: {path}\n\
             Or pass --base-url and --api-key."
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(changedetect::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(changedetect::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(changedetect::json), help("Check the JSON payload and try again."))]
    Json(#[from] serde_json::Error),

    #[error("YAML output failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::AuthFailed | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ApiError { status: 404, .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::UnknownService { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// A not-found error for a watch, tag or other listed resource.
    pub fn not_found(resource_type: &str, identifier: &str, list_command: &str) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
            list_command: list_command.into(),
        }
    }
}

// ── Client error → CliError mapping ──────────────────────────────────

impl From<changedetect_api::Error> for CliError {
    fn from(err: changedetect_api::Error) -> Self {
        use changedetect_api::Error as ApiErr;

        if err.is_auth_error() {
            return Self::AuthFailed;
        }
        match err {
            ApiErr::Transport(e) => Self::ConnectionFailed {
                url: e
                    .url()
                    .map_or_else(|| "(unknown)".into(), ToString::to_string),
                reason: e.to_string(),
            },
            ApiErr::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            ApiErr::Tls(reason) => Self::TlsError { reason },
            ApiErr::InvalidUrl(e) => Self::Validation {
                field: "base_url".into(),
                reason: e.to_string(),
            },
            ApiErr::InvalidApiKey => Self::Validation {
                field: "api_key".into(),
                reason: "not a valid header value".into(),
            },
            ApiErr::Api { status, url, body } => {
                let message = if body.trim().is_empty() {
                    url
                } else {
                    body.trim().to_owned()
                };
                Self::ApiError { status, message }
            }
            ApiErr::Deserialization { message, .. } => Self::BadResponse { message },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Api(e) => e.into(),
            CoreError::ServiceFailed { source, .. }
                if source.is_auth_error() || source.is_transient() =>
            {
                source.into()
            }
            e @ CoreError::ServiceFailed { .. } => Self::ServiceFailed {
                message: e.to_string(),
            },
            CoreError::UpdateFailed { message } | CoreError::SetupFailed { message } => {
                Self::ConnectionFailed {
                    url: "(configured instance)".into(),
                    reason: message,
                }
            }
            CoreError::Validation { message } => Self::Validation {
                field: "data".into(),
                reason: message,
            },
            CoreError::UnknownService { name } => Self::UnknownService { name },
            CoreError::EntryNotFound { entry_id } => Self::NotFound {
                resource_type: "entry".into(),
                identifier: entry_id,
                list_command: "config profiles".into(),
            },
            CoreError::AlreadyConfigured { unique_id } => Self::Conflict {
                identifier: unique_id,
            },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::ProfileNotFound { name } => Self::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config(Box::new(other)),
        }
    }
}
