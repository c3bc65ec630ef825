use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use medisync_client::{DEFAULT_API_BASE, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_REQUEST_TIMEOUT_MS};
use medisync_session::DEFAULT_LOCALE;

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "medisync",
    about = "Conversational BI client for the MediSync backend",
    version
)]
/// Public struct `Cli` used by the `medisync` binary.
pub struct Cli {
    #[arg(
        long,
        env = "MEDISYNC_API_BASE",
        default_value = DEFAULT_API_BASE,
        help = "Base URL of the MediSync API, including the version prefix"
    )]
    pub api_base: String,

    #[arg(
        long,
        env = "MEDISYNC_LOCALE",
        default_value = DEFAULT_LOCALE,
        help = "Locale tag sent with every query (for example en or ar)"
    )]
    pub locale: String,

    #[arg(
        long = "state-file",
        env = "MEDISYNC_STATE_FILE",
        default_value = ".medisync/state.json",
        help = "JSON file holding the persisted session id and credential"
    )]
    pub state_file: PathBuf,

    #[arg(
        long = "auth-token",
        env = "MEDISYNC_AUTH_TOKEN",
        hide_env_values = true,
        help = "Bearer credential to persist into the state file before running the command"
    )]
    pub auth_token: Option<String>,

    #[arg(
        long = "request-timeout-ms",
        env = "MEDISYNC_REQUEST_TIMEOUT_MS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_MS,
        value_parser = parse_positive_u64,
        help = "Timeout for collection requests in milliseconds"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "connect-timeout-ms",
        env = "MEDISYNC_CONNECT_TIMEOUT_MS",
        default_value_t = DEFAULT_CONNECT_TIMEOUT_MS,
        value_parser = parse_positive_u64,
        help = "TCP connect timeout in milliseconds"
    )]
    pub connect_timeout_ms: u64,

    #[arg(
        long = "stream-idle-timeout-ms",
        env = "MEDISYNC_STREAM_IDLE_TIMEOUT_MS",
        value_parser = parse_positive_u64,
        help = "Abort a query when no stream frame arrives within this many milliseconds"
    )]
    pub stream_idle_timeout_ms: Option<u64>,

    #[arg(long, global = true, help = "Print collection results as JSON")]
    pub json: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Ask a question and stream the answer.
    Ask {
        #[arg(required = true, num_args = 1.., help = "Natural-language question")]
        query: Vec<String>,
    },
    /// Start a new conversation and print its id.
    NewSession,
    /// Pinned dashboard charts.
    Charts(ChartsArgs),
    /// Alert rules.
    Alerts(AlertsArgs),
    /// Scheduled reports.
    Reports(ReportsArgs),
    /// Alert notifications.
    Notifications(NotificationsArgs),
}

#[derive(Debug, Args)]
pub struct ChartsArgs {
    #[command(subcommand)]
    pub command: ChartsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ChartsCommand {
    List,
    Delete {
        id: String,
    },
    /// Re-run a chart's query on the server.
    Refresh {
        id: String,
    },
    /// Reorder charts; unspecified charts keep their relative order at the end.
    Reorder {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },
}

#[derive(Debug, Args)]
pub struct AlertsArgs {
    #[command(subcommand)]
    pub command: AlertsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AlertsCommand {
    List,
    Delete {
        id: String,
    },
    Enable {
        id: String,
    },
    Disable {
        id: String,
    },
    /// Send a test notification for a rule.
    Test {
        id: String,
    },
}

#[derive(Debug, Args)]
pub struct ReportsArgs {
    #[command(subcommand)]
    pub command: ReportsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ReportsCommand {
    List,
    Delete { id: String },
}

#[derive(Debug, Args)]
pub struct NotificationsArgs {
    #[command(subcommand)]
    pub command: NotificationsCommand,
}

#[derive(Debug, Subcommand)]
pub enum NotificationsCommand {
    List,
    Read { id: String },
    ReadAll,
    /// Print the server-side unread total.
    UnreadCount,
}
