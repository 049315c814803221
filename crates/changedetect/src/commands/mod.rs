//! Command dispatch: bridges CLI args -> client / core calls -> output formatting.

pub mod config_cmd;
pub mod monitor;
pub mod notifications;
pub mod services;
pub mod system;
pub mod tags;
pub mod util;
pub mod watches;

use changedetect_core::EntryConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an instance-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: EntryConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Call(args) => return services::handle(config, args, global).await,
        Command::Entities => return monitor::entities(config, global).await,
        Command::Monitor(args) => return monitor::monitor(config, args, global).await,
        _ => {}
    }

    let client = util::build_client(&config)?;
    match cmd {
        Command::Watches(args) => watches::handle(&client, args, global).await,
        Command::Tags(args) => tags::handle(&client, args, global).await,
        Command::Notifications(args) => notifications::handle(&client, args, global).await,
        Command::System(args) => system::handle(&client, args, global).await,
        Command::Search {
            query,
            tag,
            partial,
        } => system::search(&client, &query, tag.as_deref(), partial, global).await,
        Command::Import(args) => system::import(&client, args, global).await,
        // Handled above or before dispatch
        Command::Call(_)
        | Command::Entities
        | Command::Monitor(_)
        | Command::Config(_)
        | Command::Completions(_) => Ok(()),
    }
}
