//! `config`: locate, show or create the configuration file.
//!
//! ```bash
//! float-update config path         # where the file is read from
//! float-update config              # effective settings (file + env)
//! float-update config init         # write the defaults
//! float-update config init --force # overwrite an existing file
//! ```

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use crate::config::GlobalConfig;

/// Command to manage the float-update configuration.
///
/// Shows the effective configuration when no subcommand is given.
#[derive(Args, Debug, Default)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Subcommand, Debug)]
enum ConfigSubcommands {
    /// Write a configuration file with the default settings.
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration.
    Show,

    /// Print the location of the configuration file.
    Path,
}

impl ConfigCommand {
    /// Run the subcommand against `config_path` or the default location.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, parsed or written.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        match self.command {
            Some(ConfigSubcommands::Init {
                force,
            }) => Self::init(force, config_path).await,
            Some(ConfigSubcommands::Show) | None => Self::show(config_path).await,
            Some(ConfigSubcommands::Path) => Self::show_path(config_path),
        }
    }

    async fn init(force: bool, config_path: Option<PathBuf>) -> Result<()> {
        let config_path = resolve_path(config_path)?;

        if config_path.exists() && !force {
            println!("❌ Config already exists at: {}", config_path.display());
            println!("   Use --force to overwrite");
            return Ok(());
        }

        let config = GlobalConfig::init_example();
        config.save_to(&config_path).await?;

        println!("✅ Created config at: {}", config_path.display());
        println!("\n{}", toml::to_string_pretty(&config)?);
        println!("{}", "Next steps:".yellow());
        println!("  1. Point [api] base_url at your Float server");
        println!("  2. Set [app] build_number to the installed build");

        Ok(())
    }

    async fn show(config_path: Option<PathBuf>) -> Result<()> {
        let path = resolve_path(config_path.clone())?;
        let config = GlobalConfig::load_with_optional(Some(path.clone())).await?;

        println!("{}", "float-update configuration".bold());
        if path.exists() {
            println!("Location: {}", path.display());
        } else {
            println!("Location: {} {}", path.display(), "(not created, using defaults)".dimmed());
        }
        match config.package_dir() {
            Ok(dir) => println!("Packages: {}", dir.display()),
            Err(e) => println!("Packages: {}", e.to_string().red()),
        }
        println!("\n{}", toml::to_string_pretty(&config)?);

        if !path.exists() {
            println!("{}", "Tip:".yellow());
            println!("  Run 'float-update config init' to create the file");
        }
        Ok(())
    }

    fn show_path(config_path: Option<PathBuf>) -> Result<()> {
        let path = resolve_path(config_path)?;
        println!("{}", path.display());
        Ok(())
    }
}

fn resolve_path(config_path: Option<PathBuf>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path),
        None => GlobalConfig::default_path(),
    }
}
