//! DriveMirror CLI - Command-line interface for DriveMirror
//!
//! Provides commands for:
//! - Mirroring one Drive folder onto another
//! - Copying single files
//! - Listing and rendering folder contents
//! - Inspecting configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    config::ConfigCommand, context::CommandContext, copy::CopyCommand, list::ListCommand,
    root::RootCommand, sync::SyncCommand, tree::TreeCommand,
};
use drivemirror_core::config::Config;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "drivemirror",
    version,
    about = "Mirror folder trees inside Google Drive"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sync between two folders
    Sync(SyncCommand),
    /// Copy a single file into a folder
    Copy(CopyCommand),
    /// List the files in a folder
    List(ListCommand),
    /// Render the subtree under a folder
    Tree(TreeCommand),
    /// Print the id of the root folder
    Root(RootCommand),
    /// View and check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Exit status after a forced abort (128 + SIGINT)
const EXIT_INTERRUPTED: i32 = 130;

/// Filter used when `RUST_LOG` is not set
fn default_log_filter(verbose: u8, quiet: bool, configured: &str) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// First Ctrl-C cancels the session; a second one aborts the process
async fn handle_interrupts(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    warn!("Interrupted, stopping after the current request (Ctrl-C again to abort)");
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        error!("Aborted");
        std::process::exit(EXIT_INTERRUPTED);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let configured_level = Config::load_or_default(&config_path).logging.level;

    let filter = default_log_filter(cli.verbose, cli.quiet, &configured_level);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    tokio::spawn(handle_interrupts(cancel.clone()));

    let ctx = CommandContext {
        format: OutputFormat::from_flag(cli.json),
        quiet: cli.quiet,
        config_path,
        cancel,
    };

    match &cli.command {
        Commands::Sync(cmd) => cmd.execute(&ctx).await,
        Commands::Copy(cmd) => cmd.execute(&ctx).await,
        Commands::List(cmd) => cmd.execute(&ctx).await,
        Commands::Tree(cmd) => cmd.execute(&ctx).await,
        Commands::Root(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
    }
}
