//! Command-line interface for float-update.
//!
//! # Commands
//!
//! - `check` - Ask the update server whether a newer build exists
//! - `upgrade` - Download, store and hand the newer build to the installer
//! - `latest` - Show the newest published build for a platform
//! - `history` - List the builds published for a platform
//! - `config` - Locate, show or create the configuration file
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: errors only
//! - `--config` / `-c`: use a specific configuration file
//! - `--no-progress`: disable progress bars
//!
//! Log output goes to stderr; `RUST_LOG` overrides the level chosen by the
//! flags.

mod config;
mod releases;
mod upgrade;


use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::constants::ENV_NO_PROGRESS;

pub use config::ConfigCommand;
pub use releases::{HistoryCommand, LatestCommand};
pub use upgrade::{CheckCommand, UpgradeCommand};

/// Runtime settings derived from the global flags.
///
/// Separated from [`Cli`] so tests can build one directly and so the
/// environment is touched in exactly one place.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive; `None` means errors only.
    pub log_level: Option<String>,

    /// Disable progress bars.
    pub no_progress: bool,

    /// Explicit configuration file.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Settings with logging at the default level.
    #[must_use]
    pub fn new() -> Self {
        Self {
            log_level: Some("info".to_string()),
            ..Self::default()
        }
    }

    /// Export settings that other modules read from the environment.
    pub fn apply_to_env(&self) {
        if self.no_progress {
            // Set before any task is spawned.
            unsafe {
                std::env::set_var(ENV_NO_PROGRESS, "1");
            }
        }
    }

    /// The filter the stderr subscriber starts with.
    ///
    /// `RUST_LOG` replaces it entirely when set.
    #[must_use]
    pub fn log_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = self.log_level.as_deref().unwrap_or("error");
            EnvFilter::new(format!("float_update={level}"))
        })
    }

    /// Install the stderr `tracing` subscriber.
    ///
    /// A subscriber that is already installed is kept.
    pub fn init_logging(&self) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(self.log_filter())
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[derive(Parser)]
#[command(
    name = "float-update",
    about = "Keep the Float client up to date",
    version,
    long_about = "float-update checks the Float update server for newer client builds, downloads the \
                  installer package with progress feedback, stores it in the local package cache \
                  and hands it to the platform installer."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a newer build is available.
    Check(CheckCommand),

    /// Download and install the newer build.
    Upgrade(UpgradeCommand),

    /// Show the newest published build.
    Latest(LatestCommand),

    /// List published builds.
    History(HistoryCommand),

    /// Manage the configuration file.
    Config(ConfigCommand),
}

impl Cli {
    /// Run the selected command with settings taken from the flags.
    ///
    /// # Errors
    ///
    /// Whatever the command fails with; `main` renders it through
    /// [`user_friendly_error`](crate::core::user_friendly_error).
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress,
            config_path: self.config.clone(),
        }
    }

    /// Run the selected command with explicit settings.
    ///
    /// # Errors
    ///
    /// Whatever the command fails with.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.apply_to_env();
        config.init_logging();

        let config_path = config.config_path;
        match self.command {
            Commands::Check(cmd) => cmd.execute(config_path).await,
            Commands::Upgrade(cmd) => cmd.execute(config_path).await,
            Commands::Latest(cmd) => cmd.execute(config_path).await,
            Commands::History(cmd) => cmd.execute(config_path).await,
            Commands::Config(cmd) => cmd.execute(config_path).await,
        }
    }
}
