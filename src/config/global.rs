//! Global configuration for float-update.
//!
//! The file lives at `~/.float-update/config.toml` (or
//! `%LOCALAPPDATA%\float-update\config.toml` on Windows) and may be
//! relocated with `FLOAT_UPDATE_CONFIG_PATH`. A missing file is not an
//! error: every setting has a default.
//!
//! ```toml
//! [api]
//! base_url = "https://float.example.com/api/v1"
//! # asset_base_url = "https://cdn.example.com"
//!
//! [app]
//! build_number = 3
//! display_version = "0.0.3"
//! platform = "android"
//!
//! [upgrade]
//! grace_delay_ms = 1000
//! read_timeout_secs = 30
//! verify_checksum = true
//! ```
//!
//! After loading, `FLOAT_API_BASE_URL` replaces `[api] base_url` and
//! `FLOAT_UPDATE_CACHE_DIR` replaces `[upgrade] cache_dir`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

use super::get_cache_dir;
use crate::constants::{
    CURRENT_BUILD_NUMBER, CURRENT_DISPLAY_VERSION, DEFAULT_API_BASE_URL, ENV_API_BASE_URL,
    ENV_CACHE_DIR, ENV_CONFIG_PATH,
};
use crate::upgrade::config::UpgradeConfig;
use crate::upgrade::{
    CacheDirPackageStore, CurrentVersion, HttpTransferEngine, HttpVersionOracle, Platform,
    SystemInstaller, UpdateController, UpdateEndpoints, UpdatePorts,
};

/// Location of the update server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API base including the `/api/v1` prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Host serving packages; derived from `base_url` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_base_url: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            asset_base_url: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

/// The running build, reported to the oracle and compared against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Build number of the installed client.
    #[serde(default = "default_build_number")]
    pub build_number: u32,

    /// Display version of the installed client.
    #[serde(default = "default_display_version")]
    pub display_version: String,

    /// Platform of the installed client.
    #[serde(default)]
    pub platform: Platform,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            build_number: default_build_number(),
            display_version: default_display_version(),
            platform: Platform::default(),
        }
    }
}

const fn default_build_number() -> u32 {
    CURRENT_BUILD_NUMBER
}

fn default_display_version() -> String {
    CURRENT_DISPLAY_VERSION.to_string()
}

impl AppConfig {
    /// The configured build as a [`CurrentVersion`].
    pub fn current_version(&self) -> CurrentVersion {
        CurrentVersion {
            build_number: self.build_number,
            display_version: self.display_version.clone(),
            platform: self.platform,
        }
    }
}

/// Global configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GlobalConfig {
    /// `[api]` section
    #[serde(default)]
    pub api: ApiConfig,

    /// `[app]` section
    #[serde(default)]
    pub app: AppConfig,

    /// `[upgrade]` section
    #[serde(default)]
    pub upgrade: UpgradeConfig,
}

impl GlobalConfig {
    /// Load from the default location, applying environment overrides.
    ///
    /// # Errors
    ///
    /// Fails when the file exists but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` when given, else the default location.
    ///
    /// A missing file yields the defaults. Environment overrides are
    /// applied either way.
    ///
    /// # Errors
    ///
    /// Fails when the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };

        let mut config = if path.exists() {
            Self::load_from(&path).await?
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load exactly the file at `path`, without environment overrides.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not valid TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse global config from {}", path.display()))
    }

    /// Write the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be serialized or written.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize global config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write global config to {}", path.display()))?;

        Ok(())
    }

    /// Path of the configuration file.
    ///
    /// `FLOAT_UPDATE_CONFIG_PATH` wins; otherwise `~/.float-update/config.toml`,
    /// or `%LOCALAPPDATA%\float-update\config.toml` on Windows.
    ///
    /// # Errors
    ///
    /// Fails when the home (or local data) directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(ENV_CONFIG_PATH)
            && !path.is_empty()
        {
            return Ok(PathBuf::from(path));
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("float-update")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".float-update")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Replace file values with `FLOAT_API_BASE_URL` / `FLOAT_UPDATE_CACHE_DIR`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var(ENV_API_BASE_URL)
            && !base_url.trim().is_empty()
        {
            debug!("Using API base URL from {}: {}", ENV_API_BASE_URL, base_url);
            self.api.base_url = base_url;
        }

        if let Ok(cache_dir) = std::env::var(ENV_CACHE_DIR)
            && !cache_dir.trim().is_empty()
        {
            self.upgrade.cache_dir = Some(PathBuf::from(cache_dir));
        }
    }

    /// API and asset endpoints.
    pub fn endpoints(&self) -> UpdateEndpoints {
        UpdateEndpoints::new(&self.api.base_url, self.api.asset_base_url.as_deref())
    }

    /// Directory downloaded packages are stored in.
    ///
    /// # Errors
    ///
    /// Fails when no directory is configured and the platform has no cache
    /// directory.
    pub fn package_dir(&self) -> Result<PathBuf> {
        match &self.upgrade.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(get_cache_dir()?),
        }
    }

    /// HTTP version oracle for the configured server.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be created.
    pub fn build_oracle(&self) -> Result<HttpVersionOracle> {
        HttpVersionOracle::new(self.endpoints(), self.upgrade.request_timeout())
            .context("Failed to create HTTP client for the update server")
    }

    /// An [`UpdateController`] wired to the production ports.
    ///
    /// # Errors
    ///
    /// Fails when an HTTP client cannot be created or no package directory
    /// is available.
    pub fn build_controller(&self) -> Result<UpdateController> {
        let transfer = HttpTransferEngine::new(
            self.endpoints(),
            self.upgrade.connect_timeout(),
            self.upgrade.read_timeout(),
            self.upgrade.max_artifact_bytes,
        )
        .context("Failed to create HTTP client for downloads")?;

        let installer = match &self.upgrade.installer_command {
            Some(command) => SystemInstaller::with_command(command.clone()),
            None => SystemInstaller::new(),
        };

        let ports = UpdatePorts {
            oracle: Arc::new(self.build_oracle()?),
            transfer: Arc::new(transfer),
            store: Arc::new(CacheDirPackageStore::new(self.package_dir()?)),
            installer: Arc::new(installer),
        };

        Ok(UpdateController::new(
            self.app.current_version(),
            ports,
            self.upgrade.controller_settings(),
        ))
    }

    /// Configuration written by `config init`.
    #[must_use]
    pub fn init_example() -> Self {
        Self::default()
    }
}
