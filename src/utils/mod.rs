//! Cross-platform utilities and helpers
//!
//! # Modules
//!
//! - [`fs`] - Atomic file writes used by the package store
//! - [`progress`] - Progress bars and spinners for the CLI

pub mod fs;
pub mod progress;

pub use fs::{atomic_write, ensure_dir};
pub use progress::ProgressBar;
