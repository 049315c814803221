//! Clap derive structures for the `changedetect` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// changedetect -- manage changedetection.io watches from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "changedetect",
    version,
    about = "Manage changedetection.io watches from the command line",
    long_about = "A CLI for changedetection.io instances.\n\n\
        Talks to the REST API (v1) with an API key, and can run the\n\
        polling coordinator to follow watch state as it changes.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Instance profile to use
    #[arg(long, short = 'p', env = "CHANGEDETECT_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Instance URL (overrides profile)
    #[arg(long, short = 'u', env = "CHANGEDETECT_URL", global = true)]
    pub base_url: Option<String>,

    /// API key (overrides profile)
    #[arg(long, env = "CHANGEDETECT_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CHANGEDETECT_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "CHANGEDETECT_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "CHANGEDETECT_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage watches (monitored URLs)
    #[command(alias = "watch", alias = "w")]
    Watches(WatchesArgs),

    /// Manage tags (watch groups)
    #[command(alias = "tag", alias = "t")]
    Tags(TagsArgs),

    /// Manage global notification URLs
    #[command(alias = "notif")]
    Notifications(NotificationsArgs),

    /// Instance information
    #[command(alias = "sys")]
    System(SystemArgs),

    /// Search watches by URL or title
    Search {
        /// Text to look for
        query: String,

        /// Restrict to a tag (name or UUID)
        #[arg(long)]
        tag: Option<String>,

        /// Match partial words
        #[arg(long)]
        partial: bool,
    },

    /// Import URLs, one per line
    Import(ImportArgs),

    /// Invoke a service by name with a JSON payload
    Call(CallArgs),

    /// Render the entities built from one poll
    Entities,

    /// Poll continuously and print entity changes and events
    Monitor(MonitorArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCHES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchesArgs {
    #[command(subcommand)]
    pub command: WatchesCommand,
}

#[derive(Debug, Subcommand)]
pub enum WatchesCommand {
    /// List watches
    #[command(alias = "ls")]
    List {
        /// Only watches with this tag (name or UUID)
        #[arg(long)]
        tag: Option<String>,

        /// Queue a recheck of every listed watch
        #[arg(long)]
        recheck_all: bool,
    },

    /// Show one watch
    Get { uuid: String },

    /// Create a watch
    Create {
        /// URL to monitor (http or https)
        #[arg(required_unless_present = "from_file")]
        url: Option<String>,

        #[arg(long)]
        title: Option<String>,

        /// Tag names or UUIDs, comma separated
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Create from a JSON file (other flags are ignored)
        #[arg(long, short = 'F', conflicts_with_all = ["url", "title", "tags"])]
        from_file: Option<PathBuf>,
    },

    /// Update fields on a watch
    Update {
        uuid: String,

        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        paused: Option<bool>,

        #[arg(long)]
        muted: Option<bool>,

        /// Update from a JSON file (other flags are ignored)
        #[arg(long, short = 'F', conflicts_with_all = ["url", "title", "paused", "muted"])]
        from_file: Option<PathBuf>,
    },

    /// Delete a watch
    #[command(alias = "rm")]
    Delete { uuid: String },

    /// Pause checking
    Pause { uuid: String },

    /// Resume checking
    Unpause { uuid: String },

    /// Silence notifications
    Mute { uuid: String },

    /// Restore notifications
    Unmute { uuid: String },

    /// Queue an immediate recheck
    Recheck { uuid: String },

    /// List snapshot timestamps
    History { uuid: String },

    /// Print a stored snapshot
    Snapshot {
        uuid: String,

        /// Snapshot timestamp, or `latest`
        #[arg(long, default_value = "latest")]
        timestamp: String,

        /// Return the HTML snapshot
        #[arg(long)]
        html: bool,
    },

    /// Print the difference between two snapshots
    Diff {
        uuid: String,

        /// Start timestamp, or `previous`
        #[arg(long, default_value = "previous")]
        from: String,

        /// End timestamp, or `latest`
        #[arg(long, default_value = "latest")]
        to: String,

        #[arg(long, default_value = "htmlcolor")]
        format: DiffFormatArg,

        /// Word-level diff
        #[arg(long)]
        word_diff: bool,
    },

    /// Save the site favicon
    Favicon {
        uuid: String,

        /// Destination file
        #[arg(long, short = 'O')]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DiffFormatArg {
    Text,
    Html,
    Htmlcolor,
    Markdown,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TAGS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct TagsArgs {
    #[command(subcommand)]
    pub command: TagsCommand,
}

#[derive(Debug, Subcommand)]
pub enum TagsCommand {
    /// List tags
    #[command(alias = "ls")]
    List,

    /// Show one tag
    Get { uuid: String },

    /// Create a tag
    Create {
        title: String,

        /// Notification URLs for the tag
        #[arg(long = "notification-url")]
        notification_urls: Vec<String>,
    },

    /// Rename a tag or change its notification URLs
    Update {
        uuid: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long = "notification-url")]
        notification_urls: Vec<String>,
    },

    /// Delete a tag
    #[command(alias = "rm")]
    Delete { uuid: String },

    /// Silence notifications for every watch in the tag
    Mute { uuid: String },

    /// Restore notifications for the tag
    Unmute { uuid: String },

    /// Recheck every watch in the tag
    Recheck { uuid: String },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  NOTIFICATIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct NotificationsArgs {
    #[command(subcommand)]
    pub command: NotificationsCommand,
}

#[derive(Debug, Subcommand)]
pub enum NotificationsCommand {
    /// List global notification URLs
    #[command(alias = "ls")]
    List,

    /// Append notification URLs
    Add {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Replace all notification URLs
    Replace {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Remove notification URLs
    #[command(alias = "rm")]
    Delete {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SYSTEM / IMPORT / SERVICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SystemArgs {
    #[command(subcommand)]
    pub command: SystemCommand,
}

#[derive(Debug, Subcommand)]
pub enum SystemCommand {
    /// Version, watch and tag counts, uptime
    Info,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// File with one URL per line (reads stdin when omitted)
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,

    /// Tag name applied to every imported watch
    #[arg(long)]
    pub tag: Option<String>,

    /// Tag UUIDs applied to every imported watch, comma separated
    #[arg(long)]
    pub tag_uuids: Option<String>,

    /// Proxy key applied to every imported watch
    #[arg(long)]
    pub proxy: Option<String>,

    /// Import URLs that are already watched
    #[arg(long)]
    pub no_dedupe: bool,
}

#[derive(Debug, Args)]
pub struct CallArgs {
    /// Service name (e.g. `create_watch`, `get_diff`)
    pub service: Option<String>,

    /// JSON payload
    #[arg(long, short = 'd', conflicts_with = "from_file")]
    pub data: Option<String>,

    /// Read the JSON payload from a file
    #[arg(long, short = 'F')]
    pub from_file: Option<PathBuf>,

    /// List available services instead of calling one
    #[arg(long, conflicts_with = "service")]
    pub list: bool,
}

#[derive(Debug, Args)]
pub struct MonitorArgs {
    /// Poll interval in seconds (overrides profile)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Stop after this many completed polls
    #[arg(long)]
    pub polls: Option<u32>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create a profile with guided setup
    Init,

    /// Display current configuration
    Show,

    /// Set a profile value
    Set {
        /// Profile key (e.g., "base_url", "scan_interval")
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the active profile's API key in the system keyring
    SetKey,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
