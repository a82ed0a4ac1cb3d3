//! Self-update pipeline for the Float client.
//!
//! This module checks for a newer build, downloads its installer package
//! with progress feedback, stores it in an app-private cache and hands it to
//! the platform installer, while keeping a single observable session that a
//! UI (or the CLI) renders.
//!
//! # Architecture Overview
//!
//! Four ports, each a trait with one production implementation, are driven
//! by one controller:
//!
//! - **[`VersionOracle`]** / [`HttpVersionOracle`]: asks the Float API whether
//!   a newer build exists
//! - **[`TransferEngine`]** / [`HttpTransferEngine`]: streams the package into
//!   memory, reporting progress and honouring cancellation
//! - **[`PackageStore`]** / [`CacheDirPackageStore`]: writes the package under
//!   `update_<build>.<ext>`, replacing earlier copies
//! - **[`InstallerTrigger`]** / [`SystemInstaller`]: opens the package with the
//!   platform installer
//! - **[`UpdateController`]**: the state machine tying them together
//!
//! ## Update Process Flow
//!
//! ```text
//! 1. Check
//!    ├── Skip unless the platform self-updates (or the check is manual)
//!    ├── Query the oracle with platform and build number
//!    └── Offer the build only if its build number is greater → Prompting
//!
//! 2. Download (after confirmation)
//!    ├── Resolve the download URL against the asset host
//!    ├── Stream the body, raising progress monotonically
//!    └── Verify the published SHA-256, when there is one
//!
//! 3. Store
//!    └── Atomically write update_<build>.<ext> into the cache directory
//!
//! 4. Install
//!    ├── Hand the package to the installer with its media type → Installing
//!    └── Succeeded, then Idle after the grace delay
//! ```
//!
//! Any failure in steps 2-4 leaves the session `Failed` with the error and
//! the pending version kept for a manual retry.
//!
//! # Example
//!
//! ```rust,no_run
//! use float_update::config::GlobalConfig;
//! use float_update::upgrade::UpdateController;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GlobalConfig::load().await?;
//! let controller: UpdateController = config.build_controller()?;
//!
//! if controller.check_for_update(false).await?.is_some() {
//!     let artifact = controller.confirm_pending_update().await?;
//!     println!("Installed from {:?}", artifact.map(|a| a.locator));
//! }
//! # Ok(())
//! # }
//! ```

/// Configuration of the `[upgrade]` section.
pub mod config;
/// The update state machine.
pub mod controller;
/// API and asset URL construction.
pub mod endpoints;
/// Hand-off to the platform installer.
pub mod installer;
/// Version oracle port and its HTTP client.
pub mod oracle;
/// Observable session state.
pub mod session;
/// Package persistence.
pub mod store;
/// Package download.
pub mod transfer;
/// Download integrity checks.
pub mod verification;
/// Release metadata and platform model.
pub mod version;


pub use controller::{UpdateController, UpdateOffer, UpdatePorts, UpdateSettings};
pub use endpoints::UpdateEndpoints;
pub use installer::{InstallerTrigger, SystemInstaller};
pub use oracle::{HttpVersionOracle, VersionOracle};
pub use session::{UpdateSession, UpdateStatus};
pub use store::{CacheDirPackageStore, DownloadedArtifact, PackageStore};
pub use transfer::{HttpTransferEngine, ProgressSink, TransferEngine, TransferProgress};
pub use verification::ChecksumVerifier;
pub use version::{CheckUpdateResponse, CurrentVersion, Platform, VersionInfo, artifact_file_name};
