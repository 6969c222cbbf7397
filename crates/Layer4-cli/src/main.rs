//! pawnctl CLI - Main entry point

mod cli;

use clap::{Parser, Subcommand};
use pawnctl_core::AddonManager;
use pawnctl_foundation::{EventBus, EventFilter, EventSeverity, PawnctlConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// pawnctl - PAWN game server project tool
#[derive(Parser, Debug)]
#[command(name = "pawnctl")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Project directory (defaults to the current directory)
    #[arg(short = 'C', long, global = true)]
    project: Option<PathBuf>,

    /// Do not scan addon search paths on startup
    #[arg(long, global = true)]
    no_discovery: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage addons
    Addon {
        #[command(subcommand)]
        action: AddonAction,
    },
    /// Compile the gamemode (addons may override)
    Build {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Start the game server (addons may override)
    Start {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Stop the game server (addons may override)
    Stop {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Run a command contributed by an addon
    Run {
        /// Command name
        name: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// List available commands
    Commands,
    /// Emit a custom addon event
    Emit {
        /// Event name
        name: String,
        /// JSON payload
        #[arg(long)]
        data: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum AddonAction {
    /// Install an addon (owner/repo[@ref], GitHub URL or local path)
    Install {
        source: String,
        /// Also install missing dependencies from this GitHub owner
        #[arg(long)]
        deps_from: Option<String>,
    },
    /// Uninstall an addon
    Uninstall { name: String },
    /// List installed addons
    List,
    /// Enable an addon
    Enable { name: String },
    /// Disable an addon (keeps it installed)
    Disable { name: String },
    /// Search installed and discoverable addons
    Search { query: String },
    /// Show addon details
    Info { name: String },
    /// Update a GitHub addon (or all with --all)
    Update {
        name: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// Show dependency resolution for an addon
    Deps { name: String },
    /// Show recorded errors (all addons when no name is given)
    Errors {
        name: Option<String>,
        /// Clear the error history instead of showing it
        #[arg(long)]
        clear: bool,
    },
    /// Clear errors and re-enable a quarantined addon
    Recover { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let project_dir = match args.project {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let config = PawnctlConfig::load().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {}", e);
        PawnctlConfig::new()
    });

    // 격리, 롤백 같은 경고성 이벤트는 바로 보여준다
    let events = Arc::new(EventBus::new());
    events
        .on(EventFilter::all().at_least(EventSeverity::Warning), |event| {
            let detail = event
                .data
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            eprintln!("⚠ {} [{}] {}", event.event_type, event.source, detail);
        })
        .await;

    let manager = AddonManager::builder(config)
        .project_dir(&project_dir)
        .event_bus(events)
        .discovery(!args.no_discovery)
        .build()?;
    manager.initialize().await?;

    match args.command {
        Command::Addon { action } => cli::run_addon(&manager, action).await,
        Command::Build { args } => cli::run_command(&manager, "build", args).await,
        Command::Start { args } => cli::run_command(&manager, "start", args).await,
        Command::Stop { args } => cli::run_command(&manager, "stop", args).await,
        Command::Run { name, args } => cli::run_command(&manager, &name, args).await,
        Command::Commands => cli::list_commands(&manager).await,
        Command::Emit { name, data } => cli::emit(&manager, &name, data.as_deref()).await,
    }
}
