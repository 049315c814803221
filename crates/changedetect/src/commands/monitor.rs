//! `entities` and `monitor`: run the entry lifecycle against one instance.

use std::collections::BTreeMap;
use std::time::Duration;

use owo_colors::OwoColorize;
use serde_json::Value;
use tabled::Tabled;
use tracing::debug;

use changedetect_core::{EntityState, EntryConfig, EntryRegistry, setup_entry, unload_entry};

use crate::cli::{GlobalOpts, MonitorArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

/// Entry id for the single entry the CLI runs.
const ENTRY_ID: &str = "cli";

#[derive(Tabled)]
struct EntityRow {
    #[tabled(rename = "Platform")]
    platform: String,
    #[tabled(rename = "Unique ID")]
    unique_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Available")]
    available: String,
}

fn state_text(state: Option<&Value>) -> String {
    match state {
        None | Some(Value::Null) => "unknown".into(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn print_entities(entities: &[EntityState], global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        entities,
        |e| EntityRow {
            platform: e.platform.to_string(),
            unique_id: e.unique_id.clone(),
            name: e.name.clone(),
            state: state_text(e.state.as_ref()),
            available: output::flag(e.available, color),
        },
        |e| e.unique_id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// State as shown in change lines; an unavailable entity has no state.
fn shown_state(entity: &EntityState) -> String {
    if entity.available {
        state_text(entity.state.as_ref())
    } else {
        "unavailable".into()
    }
}

/// Print entities whose state or availability changed since the last poll.
fn print_changes(
    previous: &BTreeMap<String, EntityState>,
    current: &[EntityState],
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    for entity in current {
        let before = previous.get(&entity.unique_id);
        if before.is_some_and(|b| b.state == entity.state && b.available == entity.available) {
            continue;
        }
        let line = match global.output {
            OutputFormat::Table | OutputFormat::Plain => {
                let old = before.map_or_else(|| "new".into(), shown_state);
                let new = shown_state(entity);
                let stamp = chrono::Local::now().format("%H:%M:%S").to_string();
                if color {
                    format!("{} {}: {} -> {}", stamp.dimmed(), entity.name, old, new.bold())
                } else {
                    format!("{stamp} {}: {old} -> {new}", entity.name)
                }
            }
            _ => serde_json::to_string(entity)?,
        };
        output::print_output(&line, global.quiet);
    }
    Ok(())
}

fn by_id(entities: Vec<EntityState>) -> BTreeMap<String, EntityState> {
    entities
        .into_iter()
        .map(|e| (e.unique_id.clone(), e))
        .collect()
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn entities(config: EntryConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let registry = EntryRegistry::new();
    let entities = setup_entry(&registry, ENTRY_ID, config, None).await?;
    let printed = print_entities(&entities, global);
    unload_entry(&registry, ENTRY_ID).await?;
    printed
}

pub async fn monitor(
    mut config: EntryConfig,
    args: MonitorArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(secs) = args.interval {
        config.scan_interval = Duration::from_secs(secs);
    }

    let registry = EntryRegistry::new();
    let entities = setup_entry(&registry, ENTRY_ID, config, None).await?;
    let handles = registry.require(ENTRY_ID)?;
    print_entities(&entities, global)?;
    if !global.quiet {
        eprintln!(
            "Polling every {}s, Ctrl-C to stop",
            handles.coordinator.scan_interval().as_secs()
        );
    }

    let mut snapshots = handles.coordinator.subscribe();
    let mut status = handles.coordinator.status();
    let mut previous = by_id(entities);
    let mut polls: u32 = 1;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        if args.polls.is_some_and(|max| polls >= max) {
            break Ok(());
        }
        tokio::select! {
            _ = &mut ctrl_c => {
                debug!("interrupted");
                break Ok(());
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                // Every poll, good or bad, updates the status.
                polls += 1;
                let s = status.borrow_and_update().clone();
                if !s.last_update_success && !global.quiet {
                    eprintln!(
                        "Update failed ({} in a row): {}",
                        s.consecutive_failures,
                        s.last_error.unwrap_or_default()
                    );
                }
            }
        }

        // Availability follows the status, so re-render on either channel.
        let current = handles.entities();
        if let Err(e) = print_changes(&previous, &current, global) {
            break Err(e);
        }
        previous = by_id(current);
    };

    unload_entry(&registry, ENTRY_ID).await?;
    result
}
