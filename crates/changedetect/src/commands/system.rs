//! System info, search and bulk import handlers.

use changedetect_api::{ChangeDetectionClient, ImportOptions, SystemInfo};

use crate::cli::{GlobalOpts, ImportArgs, SystemArgs, SystemCommand};
use crate::error::CliError;
use crate::output;

use super::util;

fn format_uptime(secs: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
    let total = secs.max(0.0) as u64;
    let (days, rem) = (total / 86_400, total % 86_400);
    let (hours, rem) = (rem / 3600, rem % 3600);
    let minutes = rem / 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else {
        format!("{hours}h {minutes}m")
    }
}

fn info_detail(info: &SystemInfo) -> String {
    let count = |c: Option<u64>| c.map_or_else(|| "-".into(), |c| c.to_string());
    output::detail(&[
        ("Version", info.version.clone().unwrap_or_else(|| "-".into())),
        ("Watches", count(info.watch_count)),
        ("Tags", count(info.tag_count)),
        ("Uptime", info.uptime.map_or_else(|| "-".into(), format_uptime)),
    ])
}

pub async fn handle(
    client: &ChangeDetectionClient,
    args: SystemArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SystemCommand::Info => {
            let info = client.systeminfo().await?;
            let out = output::render_single(&global.output, &info, info_detail, |i| {
                i.version.clone().unwrap_or_default()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

/// Search results vary in shape between server versions; tables show the
/// raw JSON and plain output lists matching watch UUIDs.
pub async fn search(
    client: &ChangeDetectionClient,
    query: &str,
    tag: Option<&str>,
    partial: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let results = client.search(query, tag, partial).await?;
    let out = output::render_single(
        &global.output,
        &results,
        |r| serde_json::to_string_pretty(r).unwrap_or_default(),
        |r| {
            r.get("watches")
                .and_then(|w| w.as_object())
                .map(|w| w.keys().cloned().collect::<Vec<_>>().join("\n"))
                .unwrap_or_default()
        },
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn import(
    client: &ChangeDetectionClient,
    args: ImportArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let text = util::read_text(args.file.as_deref())?;
    let urls: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if urls.is_empty() {
        return Err(CliError::Validation {
            field: "import".into(),
            reason: "no URLs to import".into(),
        });
    }

    let options = ImportOptions {
        tag_uuids: args.tag_uuids,
        tag: args.tag,
        proxy: args.proxy,
        dedupe: !args.no_dedupe,
    };
    let created = client.bulk_import(&urls.join("\n"), &options).await?;

    let out = output::render_single(
        &global.output,
        &created,
        |c| c.join("\n"),
        |c| c.join("\n"),
    )?;
    output::print_output(&out, global.quiet);
    util::done(
        &format!("Imported {} of {} URLs", created.len(), urls.len()),
        global.quiet,
    );
    Ok(())
}
