//! Error handling for float-update
//!
//! This module provides the typed error taxonomy of the update pipeline and the
//! user-friendly error reporting used by the CLI. The error system is designed
//! around two core principles:
//! 1. **Strongly-typed errors** for every stage of the pipeline, so the update
//!    controller can record exactly what failed
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Error Classes
//!
//! | Type | Raised by | Effect on the session |
//! |------|-----------|-----------------------|
//! | [`CheckError`] | version oracle query | none, reported to the caller only |
//! | [`TransferError`] | transfer engine, integrity check | session moves to `Failed` |
//! | [`StorageError`] | local package store | session moves to `Failed` |
//! | [`InstallError`] | installer trigger | session moves to `Failed` |
//!
//! [`UpdateError`] is the union of the three fatal classes and is the type
//! stored in the observable session as `last_error`. Every type here is
//! `Clone + PartialEq` because session snapshots are cloned to every
//! subscriber; underlying causes are kept as rendered strings next to the
//! structured data (URL, HTTP status, path, exit code).
//!
//! # Examples
//!
//! ```rust,no_run
//! use float_update::core::{TransferError, UpdateError, user_friendly_error};
//!
//! let error = UpdateError::from(TransferError::Status {
//!     url: "http://10.0.2.2:8080/pkg/5.apk".to_string(),
//!     status: 404,
//! });
//! assert_eq!(error.kind(), "transfer");
//!
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // Shows colored error with suggestions
//! ```

use colored::Colorize;
use std::fmt;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Failure while asking the version oracle whether a newer build exists.
///
/// A failed check is not a failed update: the controller never touches the
/// session when it returns one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// The oracle base URL could not be turned into a request URL
    #[error("Invalid update server URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// The request never produced a response (DNS, connect, TLS, timeout)
    #[error("Failed to reach update server at {url}: {reason}")]
    Transport {
        /// The request URL
        url: String,
        /// Rendered transport error
        reason: String,
    },

    /// The oracle answered with a non-success HTTP status
    #[error("Update server returned HTTP {status} for {url}")]
    Status {
        /// The request URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The response body was not the expected JSON document
    #[error("Failed to parse update server response from {url}: {reason}")]
    Parse {
        /// The request URL
        url: String,
        /// Rendered decode error
        reason: String,
    },
}

/// Failure while streaming the installer package.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The download URL could not be resolved against the asset host
    #[error("Invalid download URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// The connection failed or dropped mid-stream
    #[error("Connection failed while downloading {url}: {reason}")]
    Connection {
        /// The download URL
        url: String,
        /// Rendered transport error
        reason: String,
    },

    /// Connecting or reading stalled past the configured timeout
    #[error("Download of {url} timed out")]
    TimedOut {
        /// The download URL
        url: String,
    },

    /// The asset host answered with a non-success HTTP status
    #[error("Download failed: HTTP {status} from {url}")]
    Status {
        /// The download URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The stream ended before the announced length was received
    #[error("Download of {url} ended early: received {received} of {expected} bytes")]
    Incomplete {
        /// The download URL
        url: String,
        /// Announced content length
        expected: u64,
        /// Bytes actually received
        received: u64,
    },

    /// The package exceeds the configured in-memory limit
    #[error("Download of {url} exceeds the {limit} byte limit")]
    TooLarge {
        /// The download URL
        url: String,
        /// Configured maximum size
        limit: u64,
    },

    /// The received bytes do not hash to the published checksum
    #[error("Checksum verification failed: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Checksum published with the release
        expected: String,
        /// Checksum of the received bytes
        actual: String,
    },

    /// The transfer was abandoned through its cancellation token
    #[error("Download cancelled")]
    Cancelled,
}

/// Failure while persisting the package to the local store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No usable cache directory could be determined
    #[error("No cache directory available for update packages")]
    CacheDirUnavailable,

    /// The artifact name is not a plain file name
    #[error("Invalid artifact name '{name}'")]
    InvalidName {
        /// The rejected name
        name: String,
    },

    /// The process may not write into the store
    #[error("Permission denied writing {path}")]
    PermissionDenied {
        /// Path being written
        path: String,
    },

    /// The device ran out of space or quota
    #[error("Not enough storage to write {path}")]
    QuotaExceeded {
        /// Path being written
        path: String,
    },

    /// Any other I/O failure
    #[error("Failed to write {path}: {reason}")]
    Io {
        /// Path being written
        path: String,
        /// Rendered I/O error
        reason: String,
    },
}

impl StorageError {
    /// Classify an I/O error raised while writing `path`.
    pub fn from_io(path: &Path, error: &io::Error) -> Self {
        let path = path.display().to_string();
        match error.kind() {
            io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem => {
                Self::PermissionDenied {
                    path,
                }
            }
            io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded => Self::QuotaExceeded {
                path,
            },
            _ => Self::Io {
                path,
                reason: error.to_string(),
            },
        }
    }
}

/// Failure while handing the package to the platform installer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallError {
    /// The locator does not point at an existing file
    #[error("Update package not found at {path}")]
    MissingArtifact {
        /// The locator that was handed in
        path: String,
    },

    /// No program is available to open the package
    #[error("Installer program '{program}' not found")]
    LauncherNotFound {
        /// Program that was looked up
        program: String,
    },

    /// The installer program could not be started
    #[error("Failed to start installer '{program}': {reason}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Rendered I/O error
        reason: String,
    },

    /// The platform refused the install request
    #[error("Installer rejected the package (exit code {code:?}): {stderr}")]
    Rejected {
        /// Exit code, when the platform reported one
        code: Option<i32>,
        /// Captured diagnostic output
        stderr: String,
    },
}

/// A fatal failure of the download/store/install pipeline.
///
/// This is what the session keeps in `last_error` once it reaches `Failed`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    /// Download or integrity failure
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Local persistence failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Installer hand-off failure
    #[error(transparent)]
    Install(#[from] InstallError),
}

impl UpdateError {
    /// Stable label of the failing stage, for display and telemetry.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Transfer(_) => "transfer",
            Self::Storage(_) => "storage",
            Self::Install(_) => "install",
        }
    }

    /// Whether the failure came from the user abandoning the download.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Transfer(TransferError::Cancelled))
    }
}

/// Top-level error type shown to CLI users.
#[derive(Error, Debug, Clone)]
pub enum FloatUpdateError {
    /// Version check failed
    #[error(transparent)]
    Check(#[from] CheckError),

    /// Download, storage or install failed
    #[error(transparent)]
    Update(#[from] UpdateError),

    /// Configuration file or value problem
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// Anything without a dedicated variant
    #[error("{message}")]
    Other {
        /// Rendered error chain
        message: String,
    },
}

/// An error enriched with a suggestion and details for terminal display.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: FloatUpdateError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: FloatUpdateError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: error in red, details in yellow,
    /// suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions.
///
/// Recognizes the pipeline errors (directly or wrapped in [`UpdateError`] /
/// [`FloatUpdateError`]), TOML parse errors and I/O errors; anything else
/// is rendered with its full context chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(err) = error.downcast_ref::<FloatUpdateError>() {
        return match err {
            FloatUpdateError::Check(e) => check_context(e.clone()),
            FloatUpdateError::Update(e) => update_context(e.clone()),
            other => ErrorContext::new(other.clone()),
        };
    }

    if let Some(err) = error.downcast_ref::<CheckError>() {
        return check_context(err.clone());
    }

    if let Some(err) = error.downcast_ref::<UpdateError>() {
        return update_context(err.clone());
    }

    if let Some(err) = error.downcast_ref::<TransferError>() {
        return update_context(err.clone().into());
    }

    if let Some(err) = error.downcast_ref::<StorageError>() {
        return update_context(err.clone().into());
    }

    if let Some(err) = error.downcast_ref::<InstallError>() {
        return update_context(err.clone().into());
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(FloatUpdateError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of your config file, or run 'float-update config path' to locate it");
    }

    if let Some(io_error) = error.downcast_ref::<io::Error>()
        && io_error.kind() == io::ErrorKind::PermissionDenied
    {
        return ErrorContext::new(FloatUpdateError::Other {
            message: format!("{error:#}"),
        })
        .with_suggestion("Check the ownership and permissions of the config and cache directories");
    }

    ErrorContext::new(FloatUpdateError::Other {
        message: format!("{error:#}"),
    })
}

fn check_context(error: CheckError) -> ErrorContext {
    let suggestion = match &error {
        CheckError::InvalidUrl { .. } => {
            "Fix [api] base_url in your config file or the FLOAT_API_BASE_URL variable"
        }
        CheckError::Transport { .. } => {
            "Check your network connection and that the update server is running"
        }
        CheckError::Status { status, .. } if *status >= 500 => {
            "The update server is having problems, try again later"
        }
        CheckError::Status { .. } => "Verify that [api] base_url points at the Float API",
        CheckError::Parse { .. } => {
            "The server does not look like a Float update server; verify [api] base_url"
        }
    };
    ErrorContext::new(FloatUpdateError::Check(error))
        .with_suggestion(suggestion)
        .with_details("Checking for updates failed; nothing was downloaded")
}

fn update_context(error: UpdateError) -> ErrorContext {
    let suggestion = match &error {
        UpdateError::Transfer(TransferError::ChecksumMismatch { .. }) => {
            "The package was corrupted in transit; run 'float-update upgrade' again"
        }
        UpdateError::Transfer(TransferError::TooLarge { .. }) => {
            "Raise [upgrade] max_artifact_bytes if this package size is expected"
        }
        UpdateError::Transfer(TransferError::TimedOut { .. }) => {
            "Check your connection or raise [upgrade] read_timeout_secs"
        }
        UpdateError::Transfer(TransferError::Cancelled) => "Run 'float-update upgrade' to start over",
        UpdateError::Transfer(_) => {
            "Check that [api] asset_base_url serves the package, then retry the upgrade"
        }
        UpdateError::Storage(StorageError::QuotaExceeded { .. }) => {
            "Free some disk space and retry the upgrade"
        }
        UpdateError::Storage(_) => {
            "Check permissions of the cache directory or set FLOAT_UPDATE_CACHE_DIR"
        }
        UpdateError::Install(InstallError::LauncherNotFound { .. }) => {
            "Set [upgrade] installer_command to a program that can open the package"
        }
        UpdateError::Install(_) => {
            "Allow installing packages from this source, or open the saved package manually"
        }
    };
    let details = format!("The update failed during the {} stage; it was not retried", error.kind());
    ErrorContext::new(FloatUpdateError::Update(error))
        .with_suggestion(suggestion)
        .with_details(details)
}
