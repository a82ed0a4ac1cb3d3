use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::controller::UpdateSettings;
use super::version::Platform;
use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_GRACE_DELAY, DEFAULT_MAX_ARTIFACT_BYTES, DEFAULT_READ_TIMEOUT,
    DEFAULT_REQUEST_TIMEOUT,
};

/// Configuration settings for the self-update pipeline.
///
/// `UpgradeConfig` is the `[upgrade]` section of the global configuration
/// file. It decides which platform may self-update, how long network
/// operations may take, how downloads are verified and how the installer is
/// launched.
///
/// # Default Behavior
///
/// - Only `android` builds self-update; other platforms need a manual check
/// - Oracle requests time out after 10 seconds
/// - A download may stall for at most 30 seconds between reads
/// - Packages larger than 256 MiB are refused
/// - Published checksums are always verified
/// - The host's default opener is used as installer
///
/// # Examples
///
/// ```rust,no_run
/// use float_update::upgrade::config::UpgradeConfig;
///
/// let config = UpgradeConfig::default();
/// assert!(config.verify_checksum);
/// assert_eq!(config.grace_delay_ms, 1000);
/// ```
///
/// ## TOML Example
/// ```toml
/// [upgrade]
/// self_update_platform = "android"
/// grace_delay_ms = 1000
/// request_timeout_secs = 10
/// connect_timeout_secs = 10
/// read_timeout_secs = 30
/// max_artifact_bytes = 268435456
/// verify_checksum = true
/// installer_command = ["adb", "install", "-r", "{path}"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeConfig {
    /// Platform on which update checks run without being forced.
    #[serde(default = "default_self_update_platform")]
    pub self_update_platform: Platform,

    /// Pause between a successful installer hand-off and the session
    /// returning to idle, in milliseconds.
    #[serde(default = "default_grace_delay_ms")]
    pub grace_delay_ms: u64,

    /// Overall timeout of a version oracle request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Timeout for establishing the download connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Maximum stall between two reads of the download stream.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Largest package accepted, in bytes.
    #[serde(default = "default_max_artifact_bytes")]
    pub max_artifact_bytes: u64,

    /// Whether to verify downloads against the published `file_hash`.
    ///
    /// Releases without a hash are never verified.
    #[serde(default = "default_verify_checksum")]
    pub verify_checksum: bool,

    /// Installer argv; `{path}` and `{media_type}` are substituted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer_command: Option<Vec<String>>,

    /// Directory downloaded packages are stored in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            self_update_platform: default_self_update_platform(),
            grace_delay_ms: default_grace_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            max_artifact_bytes: default_max_artifact_bytes(),
            verify_checksum: default_verify_checksum(),
            installer_command: None,
            cache_dir: None,
        }
    }
}

const fn default_self_update_platform() -> Platform {
    Platform::Android
}

fn default_grace_delay_ms() -> u64 {
    DEFAULT_GRACE_DELAY.as_millis() as u64
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

const fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_secs()
}

const fn default_read_timeout_secs() -> u64 {
    DEFAULT_READ_TIMEOUT.as_secs()
}

const fn default_max_artifact_bytes() -> u64 {
    DEFAULT_MAX_ARTIFACT_BYTES
}

const fn default_verify_checksum() -> bool {
    true
}

impl UpgradeConfig {
    /// Creates a new `UpgradeConfig` with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Oracle request timeout.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Download connect timeout.
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Download stall timeout.
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Grace delay after a successful hand-off.
    pub const fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.grace_delay_ms)
    }

    /// The subset of settings the update controller needs.
    pub const fn controller_settings(&self) -> UpdateSettings {
        UpdateSettings {
            self_update_platform: self.self_update_platform,
            grace_delay: self.grace_delay(),
            verify_checksum: self.verify_checksum,
        }
    }
}
