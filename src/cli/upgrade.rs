//! `check` and `upgrade`: the update pipeline from the terminal.
//!
//! ```bash
//! # Is there a newer build?
//! float-update check
//!
//! # Download it, store it and open the installer, without asking
//! float-update upgrade --yes
//! ```
//!
//! Both commands check with `force_manual_check` set, so they also work on
//! platforms that do not check on their own; `check --auto` reproduces the
//! automatic check instead.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::io::IsTerminal;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::config::GlobalConfig;
use crate::core::UpdateError;
use crate::upgrade::{DownloadedArtifact, UpdateController, UpdateOffer, UpdateStatus};
use crate::utils::progress::ProgressBar;

/// Arguments of `float-update check`.
#[derive(Args, Debug, Default)]
pub struct CheckCommand {
    /// Behave like the automatic startup check (skipped on platforms that do
    /// not update themselves)
    #[arg(long)]
    pub auto: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl CheckCommand {
    /// Run the check and report the result.
    ///
    /// # Errors
    ///
    /// Configuration errors and [`CheckError`](crate::core::CheckError)s.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let config = GlobalConfig::load_with_optional(config_path).await?;
        let controller = config.build_controller()?;

        let spinner = if self.json {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        spinner.set_message("Checking for updates...");
        let offer = controller.check_for_update_offer(!self.auto).await;
        spinner.finish_and_clear();
        let offer = offer?;

        if self.json {
            let output = serde_json::json!({
                "current": controller.current_version(),
                "update_available": offer.is_some(),
                "offer": offer,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        let current = controller.current_version();
        match offer {
            Some(offer) => print_offer(&offer),
            None => println!(
                "{} Build {} ({}) is up to date",
                "✓".green(),
                current.build_number,
                current.display_version
            ),
        }
        Ok(())
    }
}

/// Arguments of `float-update upgrade`.
#[derive(Args, Debug, Default)]
pub struct UpgradeCommand {
    /// Install without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

impl UpgradeCommand {
    /// Check, confirm, download, store and hand off.
    ///
    /// Ctrl-C during the download cancels it and leaves nothing in the
    /// package store.
    ///
    /// # Errors
    ///
    /// Configuration errors, [`CheckError`](crate::core::CheckError)s and
    /// [`UpdateError`](crate::core::UpdateError)s other than cancellation.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let config = GlobalConfig::load_with_optional(config_path).await?;
        let controller = config.build_controller()?;

        let Some(offer) = controller.check_for_update_offer(true).await? else {
            let current = controller.current_version();
            println!(
                "{} Build {} ({}) is up to date",
                "✓".green(),
                current.build_number,
                current.display_version
            );
            return Ok(());
        };
        print_offer(&offer);

        if !self.yes && !confirm("Download and install now?").await? {
            controller.dismiss();
            println!("Update postponed. Run 'float-update upgrade' to install it later.");
            return Ok(());
        }

        match run_download(&controller).await {
            Ok(Some(artifact)) => {
                print_artifact(&artifact);
                Ok(())
            }
            Ok(None) => {
                println!("{}", "Nothing to download: the release has no package URL".yellow());
                Ok(())
            }
            Err(e) if e.is_cancelled() => {
                println!("{}", "Download cancelled".yellow());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Confirm the pending update while rendering the session as a progress
/// bar. Ctrl-C dismisses the session.
async fn run_download(
    controller: &UpdateController,
) -> Result<Option<DownloadedArtifact>, UpdateError> {
    let progress = ProgressBar::percent();
    progress.set_prefix("Downloading");

    let mut session = controller.subscribe();
    let bar = progress.clone();
    let render = tokio::spawn(async move {
        while session.changed().await.is_ok() {
            let snapshot = session.borrow_and_update().clone();
            match snapshot.status {
                UpdateStatus::Downloading => bar.set_position(u64::from(snapshot.progress_percent)),
                UpdateStatus::Installing => {
                    bar.set_position(100);
                    bar.set_prefix("Installing");
                    bar.set_message("opening installer...");
                }
                _ => {}
            }
        }
    });

    let interrupt = {
        let controller = controller.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Interrupted, dismissing the update session");
                controller.dismiss();
            }
        })
    };

    let result = controller.confirm_pending_update().await;
    interrupt.abort();
    render.abort();

    match &result {
        Ok(Some(_)) => progress.finish_with_message("done"),
        _ => progress.finish_and_clear(),
    }
    result
}

async fn confirm(question: &str) -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        println!("Not running interactively; pass --yes to install without confirmation.");
        return Ok(false);
    }

    let mut stdout = tokio::io::stdout();
    stdout.write_all(format!("{question} [Y/n] ").as_bytes()).await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await
        .context("Failed to read the confirmation")?;
    Ok(parse_answer(&answer))
}

/// Empty means yes.
fn parse_answer(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "" | "y" | "yes")
}

fn print_offer(offer: &UpdateOffer) {
    let version = &offer.version;
    println!("{} {}", "Update available:".green().bold(), version.label());
    if !version.title.is_empty() {
        println!("  {}", version.title.bold());
    }
    if !version.description.is_empty() {
        println!("  {}", version.description);
    }
    if let Some(reason) = &offer.reason {
        println!("  Reason: {reason}");
    }
    if let Some(size) = version.file_size {
        println!("  Size: {}", format_size(size));
    }
    if let Some(url) = &version.release_notes_url {
        println!("  Release notes: {}", url.cyan());
    }
    if offer.force_update {
        println!("  {}", "This update is required".red().bold());
    }
}

fn print_artifact(artifact: &DownloadedArtifact) {
    println!(
        "{} Build {} handed to the installer",
        "✓".green(),
        artifact.build_number
    );
    println!("  Package: {} ({})", artifact.locator.display(), format_size(artifact.size));
    println!("  Type: {}", artifact.media_type);
}

fn format_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}
