//! Local package store: where downloaded packages live until installed.
//!
//! Packages are written to a private cache directory under a deterministic
//! name (`update_<build>.<ext>`), so downloading the same build twice
//! replaces the earlier file instead of piling up copies. Writes are
//! atomic: the installer never sees a half-written package.

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::StorageError;
use crate::utils::fs::atomic_write;

/// Persists package bytes and returns a locator for the installer.
#[async_trait]
pub trait PackageStore: Send + Sync {
    /// Write `bytes` under `name`, replacing any previous file of that name.
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, StorageError>;
}

/// A package that reached the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadedArtifact {
    /// Where the package was written
    pub locator: PathBuf,
    /// Build number of the stored package
    pub build_number: u32,
    /// File name inside the store
    pub file_name: String,
    /// Size in bytes
    pub size: u64,
    /// Media type passed to the installer
    pub media_type: String,
}

/// [`PackageStore`] writing into a single directory.
#[derive(Debug, Clone)]
pub struct CacheDirPackageStore {
    root: PathBuf,
}

impl CacheDirPackageStore {
    /// Store packages under `root`, created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Directory packages are written to.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// A name is storable when it is a single, plain path component.
fn validate_name(name: &str) -> Result<(), StorageError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if invalid {
        return Err(StorageError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl PackageStore for CacheDirPackageStore {
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        validate_name(name)?;
        let target = self.root.join(name);
        debug!("Writing {} bytes to {}", bytes.len(), target.display());

        let path = target.clone();
        let contents = bytes.to_vec();
        tokio::task::spawn_blocking(move || atomic_write(&path, &contents))
            .await
            .map_err(|e| StorageError::Io {
                path: target.display().to_string(),
                reason: e.to_string(),
            })?
            .map_err(|e| StorageError::from_io(&target, &e))?;

        info!("Stored update package at {}", target.display());
        Ok(target)
    }
}
