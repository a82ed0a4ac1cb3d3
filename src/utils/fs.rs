//! File system helpers for the package store and the config file.
//!
//! Writes go through a temp-and-rename strategy so a reader (the platform
//! installer, or the next `config show`) never observes a partial file.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Ensures that a directory exists, creating it and its parents if needed.
///
/// # Errors
///
/// Fails when the directory cannot be created, or when `path` exists but is
/// not a directory.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    } else if !path.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("Path exists but is not a directory: {}", path.display()),
        ));
    }
    Ok(())
}

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// This function ensures atomic writes by:
/// 1. Writing content to a uniquely named temporary file next to the target
/// 2. Syncing the temporary file to disk
/// 3. Atomically renaming the temporary file over the target path
///
/// An existing file at `path` is replaced. Parent directories are created
/// when missing.
///
/// # Examples
///
/// ```rust,no_run
/// use float_update::utils::fs::atomic_write;
/// use std::path::Path;
///
/// # fn example() -> std::io::Result<()> {
/// atomic_write(Path::new("/tmp/float-update/update_5.apk"), b"PK\x03\x04")?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns the first I/O error of any step; the temporary file is removed
/// when the write does not complete.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;

    let mut temp = tempfile::Builder::new().prefix(".float-update-").suffix(".tmp").tempfile_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
