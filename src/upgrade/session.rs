//! The observable update session.
//!
//! There is exactly one session per controller. It is published through a
//! [`tokio::sync::watch`] channel: the controller is the only writer, and any
//! number of observers (a progress bar, a dialog, a test) read snapshots or
//! wait for changes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

use super::version::VersionInfo;
use crate::core::UpdateError;

/// Phase of the update session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UpdateStatus {
    /// Nothing pending
    #[default]
    Idle,
    /// A newer build was found and awaits the user's decision
    Prompting,
    /// The package is being transferred
    Downloading,
    /// The package is stored and being handed to the installer
    Installing,
    /// The installer accepted the package; returns to idle after the grace delay
    Succeeded,
    /// The last attempt failed; see `last_error`
    Failed,
}

impl UpdateStatus {
    /// Whether a download/install pipeline owns the session.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Downloading | Self::Installing)
    }

    /// Whether an update check may replace the session.
    #[must_use]
    pub const fn accepts_check(self) -> bool {
        matches!(self, Self::Idle | Self::Succeeded | Self::Failed)
    }

    /// Lowercase label for display.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Prompting => "prompting",
            Self::Downloading => "downloading",
            Self::Installing => "installing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the update session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateSession {
    /// Current phase
    pub status: UpdateStatus,
    /// Transfer completion, 0..=100; only ever rises within one attempt
    pub progress_percent: u8,
    /// The build offered to or being installed for the user
    pub pending_version: Option<VersionInfo>,
    /// Why the last attempt failed, set only in [`UpdateStatus::Failed`]
    pub last_error: Option<UpdateError>,
}

impl UpdateSession {
    /// Whether the dialog should be visible.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        !matches!(self.status, UpdateStatus::Idle)
    }
}

/// Writer side of the session, shared between the controller and its tasks.
///
/// Every transition that starts a new attempt or abandons one advances a
/// generation counter. Background work (progress callbacks, the grace
/// timer) remembers the generation it was started under and its writes are
/// dropped once that generation is no longer current. Both the check and
/// the write run under the channel's lock.
#[derive(Debug, Clone)]
pub(crate) struct SessionHandle {
    tx: Arc<watch::Sender<UpdateSession>>,
    generation: Arc<AtomicU64>,
}

impl SessionHandle {
    pub(crate) fn new() -> Self {
        Self {
            tx: Arc::new(watch::Sender::new(UpdateSession::default())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub(crate) fn snapshot(&self) -> UpdateSession {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<UpdateSession> {
        self.tx.subscribe()
    }

    /// Start a new generation with `change` if `guard` holds.
    ///
    /// Returns the new generation, or `None` when the guard rejected the
    /// current session.
    pub(crate) fn transition(
        &self,
        guard: impl FnOnce(&UpdateSession) -> bool,
        change: impl FnOnce(&mut UpdateSession),
    ) -> Option<u64> {
        let mut started = None;
        self.tx.send_if_modified(|session| {
            if !guard(session) {
                return false;
            }
            started = Some(self.generation.fetch_add(1, Ordering::SeqCst) + 1);
            change(session);
            true
        });
        started
    }

    /// Apply `change` only while `generation` is still current.
    pub(crate) fn update_current(
        &self,
        generation: u64,
        change: impl FnOnce(&mut UpdateSession),
    ) -> bool {
        self.tx.send_if_modified(|session| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            change(session);
            true
        })
    }

    /// Raise the transfer progress of `generation`. Lower values are ignored.
    pub(crate) fn raise_progress(&self, generation: u64, percent: u8) {
        let percent = percent.min(100);
        self.tx.send_if_modified(|session| {
            let current = self.generation.load(Ordering::SeqCst) == generation;
            if current
                && session.status == UpdateStatus::Downloading
                && percent > session.progress_percent
            {
                session.progress_percent = percent;
                true
            } else {
                false
            }
        });
    }
}
