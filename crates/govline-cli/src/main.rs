//! govline - bulk ingestion CLI for the GovInfo API
//!
//! Enumerates packages through the Published service and downloads their
//! renditions, exports a package index, or lists available collections.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

/// Exit status for invalid configuration
const EXIT_CONFIG: u8 = 2;
/// Exit status after SIGINT/SIGTERM
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "govline")]
#[command(about = "Bulk ingestion CLI for the GovInfo API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./govline.toml or ~/.config/govline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// GovInfo / api.data.gov API key (or set GOVINFO_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Enumerate packages and download content for a date range
    Download(cmd::download::DownloadArgs),
    /// Write a JSON Lines index of packages without downloading content
    Index(cmd::index::IndexArgs),
    /// List available collections
    Collections,
    /// Show current configuration
    Config,
}

/// Marks an error as a configuration problem
#[derive(Debug)]
pub struct ConfigError;

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("invalid configuration")
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(govline_core::ProgressContext::new());

    // Logging:
    //   TTY:     warn unless --debug, progress bars show activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    govline_core::init_logging(quiet, cli.debug, multi);

    if let Err(e) = govline_core::install_signal_handlers() {
        log::warn!("Could not install signal handlers: {e}");
    }

    match dispatch(cli, &progress) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            if e.downcast_ref::<ConfigError>().is_some() {
                ExitCode::from(EXIT_CONFIG)
            } else if govline_core::is_shutdown_requested() {
                ExitCode::from(EXIT_INTERRUPTED)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn dispatch(cli: Cli, progress: &govline_core::SharedProgress) -> Result<ExitCode> {
    let config = if let Some(path) = &cli.config {
        Config::from_file(path)
    } else {
        Config::load()
    }
    .map_err(|e| e.context(ConfigError))?;

    match cli.command {
        Command::Download(args) => cmd::download::run(args, cli.api_key, &config, progress),
        Command::Index(args) => cmd::index::run(args, cli.api_key, &config, progress),
        Command::Collections => cmd::collections::run(cli.api_key, &config),
        Command::Config => {
            cmd::print_config(&config);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Exit status for a finished run
fn exit_code(interrupted: bool, failed: bool) -> ExitCode {
    if interrupted {
        ExitCode::from(EXIT_INTERRUPTED)
    } else if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
