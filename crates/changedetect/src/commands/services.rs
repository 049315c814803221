//! `call`: run a named service through the dispatcher.

use serde::Serialize;
use serde_json::Value;
use strum::IntoEnumIterator;
use tabled::Tabled;
use tracing::info;

use changedetect_core::{Coordinator, EntryConfig, PollScope, Service, ServiceDispatcher};

use crate::cli::{CallArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct ServiceInfo {
    name: String,
    refreshes: bool,
}

#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "Service")]
    name: String,
    #[tabled(rename = "Refreshes")]
    refreshes: String,
}

/// Table of service names and whether each refreshes afterwards.
pub fn list(global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let services: Vec<ServiceInfo> = Service::iter()
        .map(|s| ServiceInfo {
            name: s.to_string(),
            refreshes: s.refreshes(),
        })
        .collect();
    let out = output::render_list(
        &global.output,
        &services,
        |s| ServiceRow {
            name: s.name.clone(),
            refreshes: output::flag(s.refreshes, color),
        },
        |s| s.name.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn payload(args: &CallArgs) -> Result<Value, CliError> {
    if let Some(ref path) = args.from_file {
        return util::read_json_file(path);
    }
    match args.data.as_deref() {
        Some(raw) => serde_json::from_str(raw).map_err(|e| CliError::Validation {
            field: "data".into(),
            reason: format!("invalid JSON: {e}"),
        }),
        None => Ok(Value::Null),
    }
}

pub async fn handle(config: EntryConfig, args: CallArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let Some(ref name) = args.service else {
        return Err(CliError::Validation {
            field: "service".into(),
            reason: "a service name is required (see --list)".into(),
        });
    };
    let data = payload(&args)?;

    // Writes refresh afterwards; tags and notifications are not needed for that.
    let client = util::build_client(&config)?;
    let coordinator = Coordinator::new(
        client,
        config.scan_interval,
        PollScope {
            tags: false,
            notifications: false,
        },
    );
    let services = ServiceDispatcher::new(coordinator);
    let mut events = services.events();

    let response = services.call_by_name(name, data).await?;
    while let Ok(event) = events.try_recv() {
        info!(event_type = %event.event_type(), "event fired");
    }

    match response {
        Some(value) => {
            let out = output::render_single(
                &global.output,
                &value,
                |v| match v {
                    Value::String(s) => s.clone(),
                    other => serde_json::to_string_pretty(other).unwrap_or_default(),
                },
                |v| v.get("uuid").and_then(Value::as_str).unwrap_or_default().to_owned(),
            )?;
            output::print_output(&out, global.quiet);
        }
        None if !matches!(global.output, OutputFormat::Table | OutputFormat::Plain) => {
            output::print_output("null", global.quiet);
        }
        None => {}
    }
    util::done(&format!("Called {name}"), global.quiet);
    Ok(())
}
