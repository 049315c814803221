//! Shared helpers for command handlers.

use std::io::Read;
use std::path::Path;

use changedetect_api::{ChangeDetectionClient, Payload};
use changedetect_core::EntryConfig;

use crate::error::CliError;

/// Build a client with the entry's own HTTP session.
pub fn build_client(config: &EntryConfig) -> Result<ChangeDetectionClient, CliError> {
    Ok(ChangeDetectionClient::new(
        config.base_url.as_str(),
        &config.api_key,
        &config.transport(),
    )?)
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal the prompt cannot be answered, so `--yes` is required.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read and parse a JSON file for `--from-file` flags.
pub fn read_json_file(path: &Path) -> Result<serde_json::Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Read a file, or stdin when no path is given.
pub fn read_text(path: Option<&Path>) -> Result<String, CliError> {
    match path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Printable form of a response body: text verbatim, JSON pretty-printed.
pub fn payload_text(payload: &Payload) -> Result<String, CliError> {
    Ok(match payload {
        Payload::Text(text) => text.clone(),
        Payload::Json(value) => serde_json::to_string_pretty(value)?,
        Payload::Binary(bytes) => format!("<{} bytes>", bytes.len()),
    })
}

/// Status line on stderr unless `--quiet`.
pub fn done(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{message}");
    }
}

/// Format a unix timestamp as local RFC 3339, or `-` when unset.
pub fn format_timestamp(ts: Option<i64>) -> String {
    ts.and_then(|t| chrono::DateTime::from_timestamp(t, 0))
        .map_or_else(
            || "-".into(),
            |dt| dt.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_timestamp_is_dash() {
        assert_eq!(format_timestamp(None), "-");
        assert_ne!(format_timestamp(Some(1_700_000_000)), "-");
    }

    #[test]
    fn text_payload_is_verbatim() {
        let out = payload_text(&Payload::Text("OK".into())).ok();
        assert_eq!(out.as_deref(), Some("OK"));
    }
}
