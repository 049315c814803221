//! CLI configuration: a thin wrapper around `changedetect_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--base-url, --api-key, etc.).

use std::time::Duration;

use secrecy::SecretString;

use changedetect_core::{EntryConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use changedetect_config::{
    Config, Profile, config_path, load_config_or_default, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Comma-separated profile names for help text.
pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Build an `EntryConfig` from the config file, profile, and CLI overrides.
///
/// Flags take priority over the profile. Without a profile, `--base-url`
/// and `--api-key` (or their env vars) must both be present.
pub fn resolve_entry_config(global: &GlobalOpts) -> Result<EntryConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut entry = if let Some(profile) = cfg.profiles.get(&profile_name) {
        let mut profile = profile.clone();
        if let Some(ref url) = global.base_url {
            profile.base_url.clone_from(url);
        }
        let api_key = match global.api_key {
            Some(ref key) => SecretString::from(key.clone()),
            None => changedetect_config::resolve_api_key(&profile, &profile_name)?,
        };
        changedetect_config::profile_to_entry_config(&profile, &cfg.defaults, api_key)?
    } else {
        if global.profile.is_some() {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        let url = global.base_url.as_deref().ok_or_else(|| CliError::NoConfig {
            path: config_path().display().to_string(),
        })?;
        let api_key = global
            .api_key
            .clone()
            .ok_or(CliError::NoCredentials {
                profile: profile_name,
            })?;
        let mut entry = EntryConfig::new(
            changedetect_config::parse_base_url(url)?,
            SecretString::from(api_key),
        );
        entry.timeout = Duration::from_secs(cfg.defaults.timeout);
        entry.scan_interval = Duration::from_secs(cfg.defaults.scan_interval);
        if cfg.defaults.insecure {
            entry.tls = TlsVerification::DangerAcceptInvalid;
        }
        entry
    };

    if global.insecure {
        entry.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        entry.timeout = Duration::from_secs(secs);
    }
    tracing::debug!(
        profile = %active_profile_name(global, &cfg),
        base_url = %entry.base_url,
        "resolved entry config"
    );
    Ok(entry)
}
