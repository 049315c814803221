//! Watch command handlers.

use serde::Serialize;
use tabled::Tabled;

use changedetect_api::{
    ChangeDetectionClient, CreateWatchRequest, DiffFormat, DiffOptions, Payload,
    UpdateWatchRequest, Watch,
};

use crate::cli::{DiffFormatArg, GlobalOpts, WatchesArgs, WatchesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

/// A watch together with its UUID, for list output.
#[derive(Serialize)]
struct WatchEntry<'a> {
    uuid: &'a str,
    #[serde(flatten)]
    watch: &'a Watch,
}

#[derive(Tabled)]
struct WatchRow {
    #[tabled(rename = "UUID")]
    uuid: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Last Checked")]
    last_checked: String,
    #[tabled(rename = "Last Changed")]
    last_changed: String,
}

impl WatchRow {
    fn new(entry: &WatchEntry<'_>, color: bool) -> Self {
        let w = entry.watch;
        Self {
            uuid: entry.uuid.to_owned(),
            name: w.display_name(entry.uuid),
            url: w.url.clone().unwrap_or_default(),
            state: output::state_label(
                w.paused,
                w.notification_muted,
                w.last_error.is_some(),
                color,
            ),
            last_checked: util::format_timestamp(w.last_checked),
            last_changed: util::format_timestamp(w.last_changed),
        }
    }
}

#[derive(Serialize)]
struct HistoryEntry {
    timestamp: String,
    location: String,
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Location")]
    location: String,
}

impl From<&HistoryEntry> for HistoryRow {
    fn from(h: &HistoryEntry) -> Self {
        Self {
            timestamp: h.timestamp.clone(),
            date: util::format_timestamp(h.timestamp.parse().ok()),
            location: h.location.clone(),
        }
    }
}

fn detail(uuid: &str, w: &Watch) -> String {
    output::detail(&[
        ("UUID", uuid.to_owned()),
        ("Name", w.display_name(uuid)),
        ("URL", w.url.clone().unwrap_or_default()),
        ("Paused", w.paused.to_string()),
        ("Muted", w.notification_muted.to_string()),
        ("Method", w.method.clone().unwrap_or_else(|| "-".into())),
        ("Fetcher", w.fetch_backend.clone().unwrap_or_else(|| "-".into())),
        ("Tags", w.tags.join(", ")),
        ("Last checked", util::format_timestamp(w.last_checked)),
        ("Last changed", util::format_timestamp(w.last_changed)),
        ("Last error", w.last_error.clone().unwrap_or_else(|| "-".into())),
    ])
}

fn diff_format(arg: DiffFormatArg) -> DiffFormat {
    match arg {
        DiffFormatArg::Text => DiffFormat::Text,
        DiffFormatArg::Html => DiffFormat::Html,
        DiffFormatArg::Htmlcolor => DiffFormat::HtmlColor,
        DiffFormatArg::Markdown => DiffFormat::Markdown,
    }
}

fn require_http_url(raw: &str) -> Result<(), CliError> {
    changedetect_config::parse_base_url(raw)
        .map(drop)
        .map_err(|e| CliError::Validation {
            field: "url".into(),
            reason: e.to_string(),
        })
}

/// Print a write response: structured formats get the body, tables a
/// status line.
fn print_response(payload: Payload, message: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let value = payload.into_json();
    let out = output::render_single(
        &global.output,
        &value,
        |_| String::new(),
        |v| v.get("uuid").and_then(|u| u.as_str()).unwrap_or_default().to_owned(),
    )?;
    output::print_output(&out, global.quiet);
    util::done(message, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(
    client: &ChangeDetectionClient,
    args: WatchesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        WatchesCommand::List { tag, recheck_all } => {
            let watches = client.list_watches(tag.as_deref(), recheck_all).await?;
            let entries: Vec<WatchEntry<'_>> = watches
                .iter()
                .map(|(uuid, watch)| WatchEntry { uuid, watch })
                .collect();
            let out = output::render_list(
                &global.output,
                &entries,
                |e| WatchRow::new(e, color),
                |e| e.uuid.to_owned(),
            )?;
            output::print_output(&out, global.quiet);
            if recheck_all {
                util::done(&format!("Queued recheck of {} watches", entries.len()), global.quiet);
            }
            Ok(())
        }

        WatchesCommand::Get { uuid } => {
            let watch = client.get_watch(&uuid).await.map_err(|e| {
                if e.is_not_found() {
                    CliError::not_found("watch", &uuid, "watches list")
                } else {
                    e.into()
                }
            })?;
            let out = output::render_single(
                &global.output,
                &watch,
                |w| detail(&uuid, w),
                |_| uuid.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        WatchesCommand::Create {
            url,
            title,
            tags,
            from_file,
        } => {
            let body: CreateWatchRequest = if let Some(ref path) = from_file {
                serde_json::from_value(util::read_json_file(path)?)?
            } else {
                CreateWatchRequest {
                    title,
                    tags: (!tags.is_empty()).then_some(tags),
                    ..CreateWatchRequest::new(url.unwrap_or_default())
                }
            };
            require_http_url(&body.url)?;
            let payload = client.create_watch(&body).await?;
            print_response(payload, "Watch created", global)
        }

        WatchesCommand::Update {
            uuid,
            url,
            title,
            paused,
            muted,
            from_file,
        } => {
            let body: UpdateWatchRequest = if let Some(ref path) = from_file {
                serde_json::from_value(util::read_json_file(path)?)?
            } else {
                UpdateWatchRequest {
                    url,
                    title,
                    paused,
                    notification_muted: muted,
                    ..UpdateWatchRequest::default()
                }
            };
            if let Some(ref url) = body.url {
                require_http_url(url)?;
            }
            if body == UpdateWatchRequest::default() {
                return Err(CliError::Validation {
                    field: "update".into(),
                    reason: "nothing to change".into(),
                });
            }
            let payload = client.update_watch(&uuid, &body).await?;
            print_response(payload, "Watch updated", global)
        }

        WatchesCommand::Delete { uuid } => {
            if !util::confirm(
                &format!("Delete watch {uuid} and its history?"),
                "watches delete",
                global.yes,
            )? {
                return Ok(());
            }
            client.delete_watch(&uuid).await?;
            util::done("Watch deleted", global.quiet);
            Ok(())
        }

        WatchesCommand::Pause { uuid } => {
            client.set_watch_paused(&uuid, true).await?;
            util::done("Watch paused", global.quiet);
            Ok(())
        }

        WatchesCommand::Unpause { uuid } => {
            client.set_watch_paused(&uuid, false).await?;
            util::done("Watch unpaused", global.quiet);
            Ok(())
        }

        WatchesCommand::Mute { uuid } => {
            client.set_watch_muted(&uuid, true).await?;
            util::done("Watch muted", global.quiet);
            Ok(())
        }

        WatchesCommand::Unmute { uuid } => {
            client.set_watch_muted(&uuid, false).await?;
            util::done("Watch unmuted", global.quiet);
            Ok(())
        }

        WatchesCommand::Recheck { uuid } => {
            client.recheck_watch(&uuid).await?;
            util::done("Recheck queued", global.quiet);
            Ok(())
        }

        WatchesCommand::History { uuid } => {
            let history = client.watch_history(&uuid).await?;
            let entries: Vec<HistoryEntry> = history
                .into_iter()
                .map(|(timestamp, location)| HistoryEntry {
                    timestamp,
                    location,
                })
                .collect();
            let out = output::render_list(
                &global.output,
                &entries,
                |h| HistoryRow::from(h),
                |h| h.timestamp.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        WatchesCommand::Snapshot {
            uuid,
            timestamp,
            html,
        } => {
            let payload = client.watch_snapshot(&uuid, &timestamp, html).await?;
            output::print_output(&util::payload_text(&payload)?, global.quiet);
            Ok(())
        }

        WatchesCommand::Diff {
            uuid,
            from,
            to,
            format,
            word_diff,
        } => {
            let options = DiffOptions {
                format: diff_format(format),
                word_diff,
                ..DiffOptions::default()
            };
            let payload = client.watch_diff(&uuid, &from, &to, &options).await?;
            output::print_output(&util::payload_text(&payload)?, global.quiet);
            Ok(())
        }

        WatchesCommand::Favicon { uuid, out } => {
            let bytes = client.watch_favicon(&uuid).await?;
            std::fs::write(&out, &bytes)?;
            util::done(
                &format!("Saved {} bytes to {}", bytes.len(), out.display()),
                global.quiet,
            );
            Ok(())
        }
    }
}
