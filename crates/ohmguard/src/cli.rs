//! Clap derive structures for the `ohmguard` CLI.
//!
//! Defines the command tree, global flags, and shared value types.

use clap::{Args, Parser, Subcommand, ValueEnum};
use ohmguard_core::{AlertStatus, AlertType, StatusFilter};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// ohmguard -- fall-detection alerts from the command line
#[derive(Debug, Parser)]
#[command(
    name = "ohmguard",
    version,
    about = "Follow and acknowledge OhmGuard fall alerts from the command line",
    long_about = "Terminal client for the OhmGuard fall-detection service.\n\n\
        Lists and acknowledges alerts raised by radar sensors, and follows\n\
        new alerts live over the server's event stream.",
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
    /// Server profile to use
    #[arg(long, short = 'p', env = "OHMGUARD_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Server URL (overrides profile)
    #[arg(long, short = 's', env = "OHMGUARD_SERVER", global = true)]
    pub server: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "OHMGUARD_OUTPUT",
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

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "OHMGUARD_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "OHMGUARD_TIMEOUT", global = true)]
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

/// Status filter as typed on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    All,
    New,
    Ack,
    Resolved,
    FalseAlarm,
}

impl From<StatusArg> for StatusFilter {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::All => StatusFilter::All,
            StatusArg::New => StatusFilter::Only(AlertStatus::New),
            StatusArg::Ack => StatusFilter::Only(AlertStatus::Ack),
            StatusArg::Resolved => StatusFilter::Only(AlertStatus::Resolved),
            StatusArg::FalseAlarm => StatusFilter::Only(AlertStatus::FalseAlarm),
        }
    }
}

/// Target status for `alerts update`.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SetStatusArg {
    New,
    Ack,
    Resolved,
    FalseAlarm,
}

impl From<SetStatusArg> for AlertStatus {
    fn from(arg: SetStatusArg) -> Self {
        match arg {
            SetStatusArg::New => AlertStatus::New,
            SetStatusArg::Ack => AlertStatus::Ack,
            SetStatusArg::Resolved => AlertStatus::Resolved,
            SetStatusArg::FalseAlarm => AlertStatus::FalseAlarm,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TypeArg {
    Fall,
    PreFall,
}

impl From<TypeArg> for AlertType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::Fall => AlertType::Fall,
            TypeArg::PreFall => AlertType::PreFall,
        }
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in, log out, show the current user
    Auth(AuthArgs),

    /// List, inspect, and acknowledge alerts
    #[command(alias = "a")]
    Alerts(AlertsArgs),

    /// Follow alerts live until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Register or remove a device push token
    Push(PushArgs),

    /// Check that the server is reachable
    Health,

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  AUTH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Authenticate and keep the session tokens in the system keyring
    Login {
        /// Login email (defaults to the profile's email)
        #[arg(long, short = 'e')]
        email: Option<String>,
    },

    /// Forget the stored session tokens
    Logout,

    /// Show the authenticated user
    Whoami,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ALERTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AlertsArgs {
    #[command(subcommand)]
    pub command: AlertsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AlertsCommand {
    /// List alerts, newest first
    #[command(alias = "ls")]
    List {
        /// Only alerts in this status
        #[arg(long, default_value = "all")]
        status: StatusArg,

        /// Only alerts of this type
        #[arg(long = "type", short = 't')]
        alert_type: Option<TypeArg>,

        /// Maximum number of alerts to fetch (1-500)
        #[arg(long, short = 'l')]
        limit: Option<u32>,
    },

    /// Show one alert in detail
    Show {
        /// Alert ID
        id: String,
    },

    /// Acknowledge an alert
    Ack {
        /// Alert ID
        id: String,
    },

    /// Change an alert's status, assignee, or notes
    Update {
        /// Alert ID
        id: String,

        /// New status
        #[arg(long)]
        status: Option<SetStatusArg>,

        /// Assign to a staff member
        #[arg(long)]
        assign: Option<String>,

        /// Replace the alert's notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Ask the server to raise a demo fall alert
    Simulate,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Only show alerts in this status
    #[arg(long, default_value = "new")]
    pub status: StatusArg,

    /// Reopen the live stream when automatic retries give up
    #[arg(long)]
    pub reconnect: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PUSH TOKENS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PushArgs {
    #[command(subcommand)]
    pub command: PushCommand,
}

#[derive(Debug, Subcommand)]
pub enum PushCommand {
    /// Register a device push token for the current user
    Register {
        /// Push token issued by the platform notification service
        token: String,

        /// Device platform (e.g. ios, android, web)
        #[arg(long)]
        device_type: Option<String>,
    },

    /// Remove a registered push token
    #[command(alias = "rm")]
    Delete {
        /// Push token to remove
        token: String,
    },
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
    /// Create or update a server profile
    Init {
        /// Server base URL
        #[arg(long)]
        server: String,

        /// Login email
        #[arg(long, short = 'e')]
        email: Option<String>,

        /// Mark this profile as the default
        #[arg(long)]
        default: bool,
    },

    /// Display the configuration, secrets masked
    Show,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the profile's password in the system keyring
    SetPassword,

    /// Print the config file location
    Path,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
