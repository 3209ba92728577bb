//! Bugmonitor - hackathon ranking from Bugzilla notification mail
//!
//! Entry point for the `bugmonitor` command line tool. Each subcommand is
//! handled in its own module under `cli/`.

mod cli;

use bugmonitor_core::error::Result;
use bugmonitor_core::render::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(name = "bugmonitor")]
#[command(about = "Rank hackathon participants from bug tracker notifications", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Configuration file (TOML)
    #[arg(short, long, env = "BUGMONITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Database path (overrides the configuration file)
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Drop and recreate the ranking database
    Init,

    /// Poll the mail spool and keep the ranking page up to date
    Watch,

    /// Process raw notification files once (stdin when none are given)
    Process {
        files: Vec<PathBuf>,
    },

    /// Print the leaderboard
    Ranking {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the ranking audit log
    Log {
        /// Only entries of this participant
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Manage evaluation tags in the tracker whiteboard
    Tags {
        #[command(subcommand)]
        action: TagsAction,
    },
}

#[derive(Subcommand)]
enum TagsAction {
    /// Push tiers from an evaluation CSV into the tracker
    Import {
        file: PathBuf,

        /// Show the planned changes without writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show current whiteboard and classification of the bugs in a CSV
    Check {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Keep HTTP and pool internals quiet unless explicitly asked for
    let filter = EnvFilter::new(format!(
        "bugmonitor={},reqwest=warn,hyper=warn",
        level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("Bugmonitor v{} starting...", env!("CARGO_PKG_VERSION"));

    let settings = cli::helpers::load_settings(cli.config, cli.db_path)?;

    match cli.command {
        Commands::Init => cli::init::handle(&settings).await,
        Commands::Watch => cli::watch::handle(&settings).await,
        Commands::Process { files } => cli::process::handle(&settings, files).await,
        Commands::Ranking { format, output } => cli::ranking::handle(&settings, format, output).await,
        Commands::Log { name } => cli::log::handle(&settings, name).await,
        Commands::Tags { action } => match action {
            TagsAction::Import { file, dry_run } => cli::tags::import(&settings, file, dry_run).await,
            TagsAction::Check { file } => cli::tags::check(&settings, file).await,
        },
    }
}
