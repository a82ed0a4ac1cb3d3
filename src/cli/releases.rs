//! `latest` and `history`: read-only views of what the server publishes.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use crate::config::GlobalConfig;
use crate::upgrade::{Platform, VersionInfo, VersionOracle};

/// Arguments of `float-update latest`.
#[derive(Args, Debug, Default)]
pub struct LatestCommand {
    /// Platform to query (defaults to `[app] platform`)
    #[arg(long)]
    pub platform: Option<Platform>,

    /// Print the release as JSON
    #[arg(long)]
    pub json: bool,
}

impl LatestCommand {
    /// Show the newest published build.
    ///
    /// # Errors
    ///
    /// Configuration errors and [`CheckError`](crate::core::CheckError)s.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let config = GlobalConfig::load_with_optional(config_path).await?;
        let platform = self.platform.unwrap_or(config.app.platform);
        let latest = config.build_oracle()?.latest(platform).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&latest)?);
            return Ok(());
        }

        match latest {
            Some(version) => {
                let running = config.app.build_number;
                print_release(&version, running);
            }
            None => println!("No {platform} release has been published"),
        }
        Ok(())
    }
}

/// Arguments of `float-update history`.
#[derive(Args, Debug, Default)]
pub struct HistoryCommand {
    /// Platform to query (defaults to `[app] platform`)
    #[arg(long)]
    pub platform: Option<Platform>,

    /// Show at most this many releases
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Print the releases as JSON
    #[arg(long)]
    pub json: bool,
}

impl HistoryCommand {
    /// List published builds, newest first.
    ///
    /// # Errors
    ///
    /// Configuration errors and [`CheckError`](crate::core::CheckError)s.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let config = GlobalConfig::load_with_optional(config_path).await?;
        let platform = self.platform.unwrap_or(config.app.platform);
        let mut history = config.build_oracle()?.history(platform).await?;
        sort_newest_first(&mut history);
        if let Some(limit) = self.limit {
            history.truncate(limit);
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&history)?);
            return Ok(());
        }

        if history.is_empty() {
            println!("No {platform} releases have been published");
            return Ok(());
        }

        println!("{} ({platform})", "Release history".bold());
        let running = config.app.build_number;
        for version in &history {
            print_release(version, running);
        }
        Ok(())
    }
}

fn sort_newest_first(history: &mut [VersionInfo]) {
    history.sort_by(|a, b| b.build_number.cmp(&a.build_number));
}

fn print_release(version: &VersionInfo, running_build: u32) {
    let marker = if version.build_number == running_build {
        " (installed)".dimmed().to_string()
    } else if version.build_number > running_build {
        " (newer)".green().to_string()
    } else {
        String::new()
    };
    let date = version
        .release_date
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    println!("  {}{} {}", version.label().bold(), marker, date.dimmed());
    if !version.title.is_empty() {
        println!("    {}", version.title);
    }
    if version.is_force_update {
        println!("    {}", "required".red());
    }
}
