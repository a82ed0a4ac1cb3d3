//! Configuration management for float-update
//!
//! float-update reads a single user-wide TOML file (see [`GlobalConfig`])
//! describing where the update server lives, which build is installed and
//! how the update pipeline behaves. Environment variables override the file
//! so CI and tests can redirect everything without writing one.
//!
//! # Environment Variables
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `FLOAT_UPDATE_CONFIG_PATH` | Location of the config file |
//! | `FLOAT_API_BASE_URL` | Replaces `[api] base_url` |
//! | `FLOAT_UPDATE_CACHE_DIR` | Directory downloaded packages are stored in |
//! | `FLOAT_UPDATE_NO_PROGRESS` | Disables progress bars |

mod global;

pub use global::{ApiConfig, AppConfig, GlobalConfig};

use std::path::PathBuf;

use crate::constants::ENV_CACHE_DIR;
use crate::core::StorageError;

/// Get the directory downloaded packages are stored in.
///
/// `FLOAT_UPDATE_CACHE_DIR` wins; otherwise the platform cache directory
/// (`~/.cache/float-update/updates` on Linux,
/// `~/Library/Caches/float-update/updates` on macOS,
/// `%LOCALAPPDATA%\float-update\updates` on Windows). The OS may purge it.
/// The directory is created on the first save, not here.
///
/// # Errors
///
/// [`StorageError::CacheDirUnavailable`] when the platform has no cache
/// directory and the variable is unset.
pub fn get_cache_dir() -> Result<PathBuf, StorageError> {
    if let Ok(dir) = std::env::var(ENV_CACHE_DIR)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }

    let cache_dir = dirs::cache_dir().ok_or(StorageError::CacheDirUnavailable)?;
    Ok(cache_dir.join("float-update").join("updates"))
}
