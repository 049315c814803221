//! Global notification URL handlers.

use tabled::Tabled;

use changedetect_api::ChangeDetectionClient;

use crate::cli::{GlobalOpts, NotificationsArgs, NotificationsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct NotificationRow {
    #[tabled(rename = "Notification URL")]
    url: String,
}

pub async fn handle(
    client: &ChangeDetectionClient,
    args: NotificationsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        NotificationsCommand::List => {
            let urls = client.get_notifications().await?;
            let out = output::render_list(
                &global.output,
                &urls,
                |u| NotificationRow { url: u.clone() },
                Clone::clone,
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        NotificationsCommand::Add { urls } => {
            client.add_notifications(&urls).await?;
            util::done(&format!("Added {} notification URLs", urls.len()), global.quiet);
            Ok(())
        }

        NotificationsCommand::Replace { urls } => {
            if !util::confirm(
                "Replace every global notification URL?",
                "notifications replace",
                global.yes,
            )? {
                return Ok(());
            }
            client.replace_notifications(&urls).await?;
            util::done("Notification URLs replaced", global.quiet);
            Ok(())
        }

        NotificationsCommand::Delete { urls } => {
            client.delete_notifications(&urls).await?;
            util::done(&format!("Removed {} notification URLs", urls.len()), global.quiet);
            Ok(())
        }
    }
}
