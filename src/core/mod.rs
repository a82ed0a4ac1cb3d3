//! Core types shared by every layer of float-update.
//!
//! At the moment this is the error taxonomy of the update pipeline and the
//! user-facing error rendering used by the CLI. See [`error`] for details.

pub mod error;

pub use error::{
    CheckError, ErrorContext, FloatUpdateError, InstallError, StorageError, TransferError,
    UpdateError, user_friendly_error,
};
