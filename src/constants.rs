//! Global constants used throughout the float-update codebase.
//!
//! This module holds the built-in version baseline, default endpoints,
//! timeouts and environment variable names. Defining them centrally keeps
//! magic numbers discoverable and lets configuration defaults, tests and
//! the CLI agree on a single value.

use std::time::Duration;

/// Build number of the client this updater ships with.
///
/// Build numbers are the only ordering used for update decisions; the
/// display version below is informational.
pub const CURRENT_BUILD_NUMBER: u32 = 3;

/// Human readable version of the client this updater ships with.
pub const CURRENT_DISPLAY_VERSION: &str = "0.0.3";

/// Default API base used when neither the config file nor
/// `FLOAT_API_BASE_URL` provide one (the Android emulator's host alias).
pub const DEFAULT_API_BASE_URL: &str = "http://10.0.2.2:8080/api/v1";

/// Path prefix stripped from the API base to obtain the asset host.
pub const API_PATH_PREFIX: &str = "/api/v1";

/// Delay before a successfully triggered install returns the session to idle.
pub const DEFAULT_GRACE_DELAY: Duration = Duration::from_millis(1000);

/// Timeout for version oracle requests (10 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for establishing the download connection (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum time the download may stall between two reads (30 seconds).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on an installer package held in memory (256 MiB).
pub const DEFAULT_MAX_ARTIFACT_BYTES: u64 = 256 * 1024 * 1024;

/// Prefix of every persisted artifact (`update_<build>.<ext>`).
pub const ARTIFACT_PREFIX: &str = "update_";

/// Overrides the location of the global configuration file.
pub const ENV_CONFIG_PATH: &str = "FLOAT_UPDATE_CONFIG_PATH";

/// Overrides the API base URL.
pub const ENV_API_BASE_URL: &str = "FLOAT_API_BASE_URL";

/// Overrides the package store directory.
pub const ENV_CACHE_DIR: &str = "FLOAT_UPDATE_CACHE_DIR";

/// Disables progress bars when set to any value.
pub const ENV_NO_PROGRESS: &str = "FLOAT_UPDATE_NO_PROGRESS";

/// User agent sent with every request.
pub fn user_agent() -> String {
    format!("float-update/{}", env!("CARGO_PKG_VERSION"))
}
