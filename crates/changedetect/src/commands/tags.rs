//! Tag command handlers.

use serde::Serialize;
use tabled::Tabled;

use changedetect_api::{ChangeDetectionClient, CreateTagRequest, Tag, UpdateTagRequest};

use crate::cli::{GlobalOpts, TagsArgs, TagsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct TagEntry<'a> {
    uuid: &'a str,
    #[serde(flatten)]
    tag: &'a Tag,
}

#[derive(Tabled)]
struct TagRow {
    #[tabled(rename = "UUID")]
    uuid: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Notify URLs")]
    notification_urls: usize,
    #[tabled(rename = "Muted")]
    muted: String,
}

fn tag_row(entry: &TagEntry<'_>, color: bool) -> TagRow {
    TagRow {
        uuid: entry.uuid.to_owned(),
        title: entry.tag.title.clone().unwrap_or_default(),
        notification_urls: entry.tag.notification_urls.len(),
        muted: output::flag(entry.tag.notification_muted, color),
    }
}

fn not_found(uuid: &str) -> impl FnOnce(changedetect_api::Error) -> CliError + '_ {
    move |e| {
        if e.is_not_found() {
            CliError::not_found("tag", uuid, "tags list")
        } else {
            e.into()
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &ChangeDetectionClient,
    args: TagsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        TagsCommand::List => {
            let tags = client.list_tags().await?;
            let entries: Vec<TagEntry<'_>> = tags
                .iter()
                .map(|(uuid, tag)| TagEntry { uuid, tag })
                .collect();
            let out = output::render_list(
                &global.output,
                &entries,
                |e| tag_row(e, color),
                |e| e.uuid.to_owned(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TagsCommand::Get { uuid } => {
            let tag = client.get_tag(&uuid).await.map_err(not_found(&uuid))?;
            let out = output::render_single(
                &global.output,
                &tag,
                |t| {
                    output::detail(&[
                        ("UUID", uuid.clone()),
                        ("Title", t.title.clone().unwrap_or_default()),
                        ("Muted", t.notification_muted.to_string()),
                        ("Notification URLs", t.notification_urls.join("\n")),
                    ])
                },
                |_| uuid.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TagsCommand::Create {
            title,
            notification_urls,
        } => {
            let body = CreateTagRequest {
                title,
                notification_urls: (!notification_urls.is_empty()).then_some(notification_urls),
                ..CreateTagRequest::default()
            };
            let payload = client.create_tag(&body).await?;
            if !matches!(global.output, crate::cli::OutputFormat::Table) {
                let out = output::render_single(
                    &global.output,
                    &payload.into_json(),
                    |_| String::new(),
                    |v| v.get("uuid").and_then(|u| u.as_str()).unwrap_or_default().to_owned(),
                )?;
                output::print_output(&out, global.quiet);
            }
            util::done("Tag created", global.quiet);
            Ok(())
        }

        TagsCommand::Update {
            uuid,
            title,
            notification_urls,
        } => {
            let body = UpdateTagRequest {
                title,
                notification_urls: (!notification_urls.is_empty()).then_some(notification_urls),
                ..UpdateTagRequest::default()
            };
            if body == UpdateTagRequest::default() {
                return Err(CliError::Validation {
                    field: "update".into(),
                    reason: "nothing to change".into(),
                });
            }
            client.update_tag(&uuid, &body).await.map_err(not_found(&uuid))?;
            util::done("Tag updated", global.quiet);
            Ok(())
        }

        TagsCommand::Delete { uuid } => {
            if !util::confirm(
                &format!("Delete tag {uuid}? Watches keep existing."),
                "tags delete",
                global.yes,
            )? {
                return Ok(());
            }
            client.delete_tag(&uuid).await.map_err(not_found(&uuid))?;
            util::done("Tag deleted", global.quiet);
            Ok(())
        }

        TagsCommand::Mute { uuid } => {
            client.set_tag_muted(&uuid, true).await?;
            util::done("Tag muted", global.quiet);
            Ok(())
        }

        TagsCommand::Unmute { uuid } => {
            client.set_tag_muted(&uuid, false).await?;
            util::done("Tag unmuted", global.quiet);
            Ok(())
        }

        TagsCommand::Recheck { uuid } => {
            client.recheck_tag(&uuid).await?;
            util::done("Recheck queued for every watch in the tag", global.quiet);
            Ok(())
        }
    }
}
