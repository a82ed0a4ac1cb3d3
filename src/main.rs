//! float-update CLI entry point
//!
//! Parses the command line, runs the selected command and renders failures
//! with suggestions before exiting with status 1.
//!
//! - `check` - Ask the update server whether a newer build exists
//! - `upgrade` - Download, store and hand the newer build to the installer
//! - `latest` - Show the newest published build
//! - `history` - List recently published builds
//! - `config` - Locate, show or create the configuration file

use anyhow::Result;
use clap::Parser;
use float_update::cli;
use float_update::core::error::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
