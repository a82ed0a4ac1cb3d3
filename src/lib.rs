//! float-update - self-update pipeline for the Float bookkeeping client
//!
//! Float's mobile client is distributed as a sideloaded package. This crate
//! implements the part of the client that keeps it current: it asks the
//! Float API whether a newer build exists, downloads the installer package
//! with progress feedback, stores it in an app-private cache and hands it to
//! the platform installer, all behind one observable session a UI can render.
//!
//! # Architecture Overview
//!
//! The pipeline is a small state machine ([`upgrade::UpdateController`])
//! driving four ports, each a trait with an HTTP / filesystem / process
//! implementation:
//!
//! ```text
//!            ┌──────────────┐   check    ┌───────────────┐
//!   UI ────▶ │    Update    │ ─────────▶ │ VersionOracle │  GET /app-updates/check
//!  (watch)   │  Controller  │   fetch    ├───────────────┤
//!     ◀───── │              │ ─────────▶ │TransferEngine │  streamed, cancellable
//!   session  │ Idle         │   save     ├───────────────┤
//!            │ Prompting    │ ─────────▶ │ PackageStore  │  update_<build>.<ext>
//!            │ Downloading  │  install   ├───────────────┤
//!            │ Installing … │ ─────────▶ │InstallerTrigger│ platform opener
//!            └──────────────┘            └───────────────┘
//! ```
//!
//! # Core Modules
//!
//! - [`upgrade`] - The update pipeline: ports, controller, session
//! - [`config`] - Global configuration (`~/.float-update/config.toml`)
//! - [`core`] - Error taxonomy and user-facing error reporting
//! - [`cli`] - Command-line interface
//! - [`utils`] - Atomic file writes and progress bars
//! - [`constants`] - Built-in defaults
//!
//! # Example
//!
//! ```rust,no_run
//! use float_update::config::GlobalConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let controller = GlobalConfig::load().await?.build_controller()?;
//! let mut session = controller.subscribe();
//!
//! if let Some(version) = controller.check_for_update(true).await? {
//!     println!("Update available: {}", version.label());
//!     tokio::spawn(async move {
//!         while session.changed().await.is_ok() {
//!             let snapshot = session.borrow_and_update().clone();
//!             println!("{} {}%", snapshot.status, snapshot.progress_percent);
//!         }
//!     });
//!     controller.confirm_pending_update().await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod upgrade;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
