//! Config subcommand handlers.

use dialoguer::{Confirm, Input, Password, Select};
use secrecy::SecretString;

use changedetect_core::{EntryConfig, EntryRegistry, config_flow, flow_error_key};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "scan_interval = {}", cfg.defaults.scan_interval);

    for (name, p) in &cfg.profiles {
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "base_url = \"{}\"", p.base_url);
        if p.api_key.is_some() {
            let _ = writeln!(out, "api_key = \"****\"");
        }
        if let Some(ref env) = p.api_key_env {
            let _ = writeln!(out, "api_key_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(interval) = p.scan_interval {
            let _ = writeln!(out, "scan_interval = {interval}");
        }
        if let Some(tags) = p.fetch_tags {
            let _ = writeln!(out, "fetch_tags = {tags}");
        }
        if let Some(notifications) = p.fetch_notifications {
            let _ = writeln!(out, "fetch_notifications = {notifications}");
        }
    }

    out
}

fn save_config(cfg: &Config) -> Result<(), CliError> {
    let path = config::save_config(cfg)?;
    tracing::debug!(path = %path.display(), "config saved");
    Ok(())
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: key.into(),
        reason: format!("must be {expected}"),
    })
}

fn profile_not_found(name: String, cfg: &Config) -> CliError {
    CliError::ProfileNotFound {
        name,
        available: config::available_profiles(cfg),
    }
}

/// Offer to store the API key in the system keyring.
///
/// Returns `Some(key)` if the user chose plaintext, `None` if stored in keyring.
fn prompt_key_storage(profile_name: &str, key: &str) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the API key?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        changedetect_config::store_api_key(profile_name, key)?;
        eprintln!("   ✓ API key stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(key.to_owned()))
    }
}

// ── Init ────────────────────────────────────────────────────────────

async fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::load_config_or_default();
    eprintln!("changedetect configuration wizard");
    eprintln!("   Config path: {}\n", config::config_path().display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default(global.profile.clone().unwrap_or_else(|| "default".into()))
        .interact_text()
        .map_err(prompt_err)?;

    let base_url: String = Input::new()
        .with_prompt("Instance URL")
        .default("http://localhost:5000".into())
        .interact_text()
        .map_err(prompt_err)?;
    let url = changedetect_config::parse_base_url(&base_url)?;

    let key = Password::new()
        .with_prompt("API key")
        .interact()
        .map_err(prompt_err)?;
    if key.is_empty() {
        return Err(CliError::Validation {
            field: "api_key".into(),
            reason: "API key cannot be empty".into(),
        });
    }

    // One profile per instance.
    let mut entry = EntryConfig::new(url, SecretString::from(key.clone()));
    let unique_id = entry.unique_id();
    if let Some((other, _)) = cfg.profiles.iter().find(|(name, p)| {
        **name != profile_name && p.base_url.trim_end_matches('/') == unique_id
    }) {
        return Err(CliError::Conflict {
            identifier: format!("{unique_id} (profile '{other}')"),
        });
    }

    if global.insecure {
        entry.tls = changedetect_core::TlsVerification::DangerAcceptInvalid;
    }
    match config_flow(&EntryRegistry::new(), &entry, None).await {
        Ok(info) => eprintln!("   ✓ Connected: {}", info.title),
        Err(e) => {
            eprintln!("   ✗ Connection check failed ({}): {e}", flow_error_key(&e));
            let keep = Confirm::new()
                .with_prompt("Save the profile anyway?")
                .default(false)
                .interact()
                .map_err(prompt_err)?;
            if !keep {
                return Err(e.into());
            }
        }
    }

    let api_key = prompt_key_storage(&profile_name, &key)?;
    cfg.profiles.insert(
        profile_name.clone(),
        Profile {
            base_url: unique_id,
            api_key,
            insecure: global.insecure.then_some(true),
            ..Profile::default()
        },
    );
    if cfg.profiles.len() == 1 || cfg.default_profile.is_none() {
        cfg.default_profile = Some(profile_name.clone());
    }
    save_config(&cfg)?;
    eprintln!("\n✓ Profile '{profile_name}' saved");
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global).await,

        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            print!("{}", format_config_redacted(&cfg));
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();

            match key.as_str() {
                "base_url" | "base-url" | "url" => {
                    changedetect_config::parse_base_url(&value)?;
                    profile.base_url = value;
                }
                "api_key" | "api-key" => profile.api_key = Some(value),
                "api_key_env" | "api-key-env" => profile.api_key_env = Some(value),
                "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
                "insecure" => profile.insecure = Some(parse_value(&key, &value, "'true' or 'false'")?),
                "timeout" => profile.timeout = Some(parse_value(&key, &value, "a number (seconds)")?),
                "scan_interval" | "scan-interval" => {
                    profile.scan_interval = Some(parse_value(&key, &value, "a number (seconds)")?);
                }
                "fetch_tags" | "fetch-tags" => {
                    profile.fetch_tags = Some(parse_value(&key, &value, "'true' or 'false'")?);
                }
                "fetch_notifications" | "fetch-notifications" => {
                    profile.fetch_notifications =
                        Some(parse_value(&key, &value, "'true' or 'false'")?);
                }
                other => {
                    return Err(CliError::Validation {
                        field: other.into(),
                        reason: format!(
                            "unknown config key '{other}'. Valid keys: base_url, api_key, \
                             api_key_env, ca_cert, insecure, timeout, scan_interval, fetch_tags, \
                             fetch_notifications"
                        ),
                    });
                }
            }

            save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: changedetect config init");
            } else {
                for (name, p) in &cfg.profiles {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}\t{}", p.base_url);
                }
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(profile_not_found(name, &cfg));
            }
            cfg.default_profile = Some(name.clone());
            save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        ConfigCommand::SetKey => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(profile_not_found(profile_name, &cfg));
            }
            let key = Password::new()
                .with_prompt(format!("API key for '{profile_name}'"))
                .interact()
                .map_err(prompt_err)?;
            changedetect_config::store_api_key(&profile_name, &key)?;
            eprintln!("✓ API key stored in system keyring");
            Ok(())
        }
    }
}
