//! Test utilities for float-update
//!
//! This module provides in-memory implementations of every port of the
//! update pipeline plus fixtures for release metadata, so controller
//! behaviour can be tested without a network, a cache directory or an
//! installer.
//!
//! # Example
//!
//! ```rust,no_run
//! use float_update::test_utils::{ControllerFixture, ScriptedTransfer, StaticOracle};
//!
//! # async fn example() {
//! let fixture = ControllerFixture::new(
//!     StaticOracle::update_to(5, "/pkg/5.bin"),
//!     ScriptedTransfer::succeeding(b"package".to_vec(), &[(7, Some(7))]),
//! );
//! let offered = fixture.controller.check_for_update(false).await.unwrap();
//! assert_eq!(offered.map(|v| v.build_number), Some(5));
//! # }
//! ```

pub mod fakes;
pub mod fixtures;

pub use fakes::{MemoryPackageStore, RecordingInstaller, ScriptedTransfer, StaticOracle};
pub use fixtures::{ControllerFixture, check_response, version};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Installs a test-writer subscriber once per process, however often it is
/// called. Uses `level` when given, otherwise `RUST_LOG`; with neither,
/// logging stays off.
///
/// # Example
///
/// ```rust,no_run
/// use tracing::Level;
/// use float_update::test_utils::init_test_logging;
///
/// init_test_logging(Some(Level::DEBUG));
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
