//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::commands;

/// Content Deployer - Sync git-backed content into downstream systems
#[derive(Parser, Debug)]
#[command(name = "content-deployer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one sync pass over every configured site
    Run(commands::run::RunArgs),

    /// Validate site files and show the processors each site would run
    Check(commands::check::CheckArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(self.log_level);

        match self.command {
            Commands::Run(args) => commands::run::execute(args),
            Commands::Check(args) => commands::check::execute(args),
        }
    }
}

/// Log to stderr at `level`; `RUST_LOG`, when set, takes precedence.
fn init_logging(level: LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    if builder.try_init().is_err() {
        log::debug!("A logger is already installed, keeping it");
    }
}
