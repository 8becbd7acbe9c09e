mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::run::Overrides;
use keymind_storage::{JsonSettingsStore, ListKind};

#[derive(Parser)]
#[command(name = "keymind")]
#[command(about = "Keeps you on the task you declared", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a focus session in the foreground until Ctrl-C
    Run {
        /// What you are working on, e.g. "write quarterly report"
        task: String,
        /// Foreground window sampling interval in milliseconds
        #[arg(long)]
        poll_ms: Option<u64>,
        /// Minimum seconds between two relevance checks
        #[arg(long)]
        debounce_secs: Option<u64>,
        /// Seconds to wait for the AI service before giving up
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Gemini model used for relevance checks
        #[arg(long)]
        model: Option<String>,
    },
    /// Background daemon management
    #[cfg(unix)]
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
    /// (Internal) Run the daemon process
    #[cfg(unix)]
    #[command(hide = true)]
    DaemonInternalStart,
    /// Start a focus session in the running daemon
    #[cfg(unix)]
    Focus {
        /// What you are working on
        task: String,
    },
    /// Stop the focus session in the running daemon
    #[cfg(unix)]
    Unfocus,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Activities that are always relevant
    Allow {
        #[command(subcommand)]
        action: ListAction,
    },
    /// Activities that are never relevant
    Ban {
        #[command(subcommand)]
        action: ListAction,
    },
    /// Browsers whose activities lose a tab instead of the whole window
    Browser {
        #[command(subcommand)]
        action: BrowserAction,
    },
    /// Print the current foreground activity
    Whoami,
}

#[cfg(unix)]
#[derive(Subcommand, Debug)]
enum DaemonAction {
    /// Start the background daemon
    Start,
    /// Stop the background daemon
    Stop,
    /// Show daemon and session status
    Status,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show all settings
    List {
        /// Print the raw settings file content
        #[arg(long)]
        json: bool,
    },
    /// Get a setting (api_key, browser.<name>)
    Get { key: String },
    /// Set a setting (api_key, browser.<name>)
    Set { key: String, value: String },
}

#[derive(Subcommand, Debug)]
enum ListAction {
    /// Add a case-insensitive substring
    Add { entry: String },
    /// Remove an entry
    Remove { entry: String },
}

#[derive(Subcommand, Debug)]
enum BrowserAction {
    /// Treat activities mentioning this name as browser tabs
    Enable { name: String },
    /// Stop treating this name as a browser
    Disable { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(unix)]
    let log_to_console = !matches!(cli.command, Commands::DaemonInternalStart);
    #[cfg(not(unix))]
    let log_to_console = true;

    if log_to_console {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_secs()
            .init();
    }

    match cli.command {
        Commands::Run {
            task,
            poll_ms,
            debounce_secs,
            timeout_secs,
            model,
        } => {
            let overrides = Overrides {
                poll_ms,
                debounce_secs,
                timeout_secs,
                model,
            };
            commands::run::run_focus(task, &overrides).await
        }
        #[cfg(unix)]
        Commands::Daemon { action } => match action {
            DaemonAction::Start => commands::daemon::start_daemon(),
            DaemonAction::Stop => commands::daemon::stop_daemon().await,
            DaemonAction::Status => commands::daemon::show_status().await,
        },
        #[cfg(unix)]
        Commands::DaemonInternalStart => commands::daemon::run_daemon_process().await,
        #[cfg(unix)]
        Commands::Focus { task } => commands::daemon::focus(task).await,
        #[cfg(unix)]
        Commands::Unfocus => commands::daemon::unfocus().await,
        Commands::Config { action } => {
            let store = JsonSettingsStore::open_default()?;
            match action {
                ConfigAction::List { json } => commands::config::handle_config_list(&store, json),
                ConfigAction::Get { key } => commands::config::handle_config_get(&store, &key),
                ConfigAction::Set { key, value } => {
                    commands::config::handle_config_set(&store, &key, &value)
                }
            }
        }
        Commands::Allow { action } => handle_list(ListKind::Allowed, action),
        Commands::Ban { action } => handle_list(ListKind::Banned, action),
        Commands::Browser { action } => {
            let store = JsonSettingsStore::open_default()?;
            match action {
                BrowserAction::Enable { name } => {
                    commands::config::handle_browser(&store, &name, true)
                }
                BrowserAction::Disable { name } => {
                    commands::config::handle_browser(&store, &name, false)
                }
            }
        }
        Commands::Whoami => commands::run::whoami().await,
    }
}

fn handle_list(kind: ListKind, action: ListAction) -> Result<()> {
    let store = JsonSettingsStore::open_default()?;
    match action {
        ListAction::Add { entry } => commands::config::handle_list_add(&store, kind, &entry),
        ListAction::Remove { entry } => commands::config::handle_list_remove(&store, kind, &entry),
    }
}
