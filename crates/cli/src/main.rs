//! sfeed - change feed store and index consumer

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod cmd;
mod config;
mod util;

/// sfeed - Incremental change feed with a resumable index consumer
#[derive(Parser)]
#[command(name = "sfeed")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a feed repository in the current directory
    Init,
    /// Create or replace an item
    Put {
        /// Item id
        id: String,
        /// Inline content
        #[arg(short, long, conflicts_with = "file")]
        content: Option<String>,
        /// Read content from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Delete an item
    Delete {
        /// Item id
        id: String,
    },
    /// Print the current content of an item
    Get {
        /// Item id
        id: String,
        /// Print revision and digest as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the change set following a revision
    Changes {
        /// Resume point (default: 0, the beginning)
        #[arg(long, default_value = "0")]
        from: u64,
        /// Maximum ids in the page (default: consumer.batch_size)
        #[arg(long)]
        limit: Option<usize>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show store and consumer status
    Status,
    /// Compact the change log
    Gc,
    /// Reset history under a new epoch
    Rebuild {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Bring the index up to date with the store
    Sync {
        /// Consumer id (default: consumer.consumer_id)
        #[arg(long)]
        consumer: Option<String>,
        /// Ids per change set (default: consumer.batch_size)
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Apply writes from stdin while keeping the index in sync
    Follow {
        /// Poll interval in milliseconds (default: consumer.poll_interval_ms)
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Find items containing a term
    Search {
        /// Search term
        term: String,
        /// Maximum results (default: 20)
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// View and edit repository configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Get a single value
    Get {
        /// Dotted key, e.g. consumer.batch_size
        key: String,
    },
    /// Set a single value
    Set {
        /// Dotted key, e.g. consumer.batch_size
        key: String,
        /// New value
        value: String,
    },
    /// Show the config file path
    Path,
    /// Print an example configuration
    Example,
}

/// Install the global subscriber. The returned guard flushes file output on drop.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .context("Log file path has no file name")?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;

            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Init => cmd::init::run(),
        Commands::Put { id, content, file } => cmd::put::run(&id, content, file),
        Commands::Delete { id } => cmd::put::run_delete(&id),
        Commands::Get { id, json } => cmd::get::run(&id, json),
        Commands::Changes { from, limit, json } => cmd::changes::run(from, limit, json),
        Commands::Status => cmd::status::run(),
        Commands::Gc => cmd::gc::run(),
        Commands::Rebuild { yes } => cmd::rebuild::run(yes),
        Commands::Sync {
            consumer,
            batch_size,
        } => cmd::sync::run(consumer, batch_size),
        Commands::Follow { interval_ms } => cmd::follow::run(interval_ms).await,
        Commands::Search { term, limit } => cmd::search::run(&term, limit),
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list(),
            ConfigCommands::Get { key } => cmd::config::run_get(&key),
            ConfigCommands::Set { key, value } => cmd::config::run_set(&key, &value),
            ConfigCommands::Path => cmd::config::run_path(),
            ConfigCommands::Example => cmd::config::run_example(),
        },
    }
}
