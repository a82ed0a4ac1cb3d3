//! The update controller: one state machine from check to installer hand-off.
//!
//! ```text
//! Idle ──check(found)──▶ Prompting ──confirm/begin_download──▶ Downloading
//! Downloading ──stored──▶ Installing ──accepted──▶ Succeeded ──grace delay──▶ Idle
//! Downloading/Installing ──failure──▶ Failed
//! Prompting/Failed/Succeeded ──dismiss──▶ Idle
//! Downloading ──dismiss (cancels transfer)──▶ Idle
//! ```
//!
//! Operations are serialized by session state rather than queued: anything
//! that does not match the current state is a no-op. A failed check never
//! touches the session; a failed download, store or install moves it to
//! `Failed` and keeps the pending version so the user can retry. Nothing is
//! retried automatically.

use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::installer::InstallerTrigger;
use super::oracle::VersionOracle;
use super::session::{SessionHandle, UpdateSession, UpdateStatus};
use super::store::{DownloadedArtifact, PackageStore};
use super::transfer::{TransferEngine, TransferProgress};
use super::verification::ChecksumVerifier;
use super::version::{CurrentVersion, Platform, VersionInfo};
use crate::constants::DEFAULT_GRACE_DELAY;
use crate::core::{CheckError, TransferError, UpdateError};

/// The collaborators the controller drives.
#[derive(Clone)]
pub struct UpdatePorts {
    /// Answers version checks
    pub oracle: Arc<dyn VersionOracle>,
    /// Downloads packages
    pub transfer: Arc<dyn TransferEngine>,
    /// Persists packages
    pub store: Arc<dyn PackageStore>,
    /// Hands packages to the platform
    pub installer: Arc<dyn InstallerTrigger>,
}

/// Behavioural knobs of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateSettings {
    /// Platform that checks without `force_manual_check`
    pub self_update_platform: Platform,
    /// Pause between a successful hand-off and returning to idle
    pub grace_delay: Duration,
    /// Verify downloads that publish a `file_hash`
    pub verify_checksum: bool,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            self_update_platform: Platform::Android,
            grace_delay: DEFAULT_GRACE_DELAY,
            verify_checksum: true,
        }
    }
}

/// A newer build together with what the server said about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateOffer {
    /// The newer build, now the session's pending version
    pub version: VersionInfo,
    /// Whether the server marks the update as mandatory
    pub force_update: bool,
    /// Server supplied explanation
    pub reason: Option<String>,
}

/// Orchestrates oracle, transfer engine, package store and installer.
///
/// Cheap to clone; clones share one session, so a UI task can call
/// [`dismiss`](Self::dismiss) while another task awaits
/// [`begin_download`](Self::begin_download).
#[derive(Clone)]
pub struct UpdateController {
    inner: Arc<Inner>,
}

struct Inner {
    current: CurrentVersion,
    ports: UpdatePorts,
    settings: UpdateSettings,
    session: SessionHandle,
    inflight: Mutex<Option<CancellationToken>>,
}

impl UpdateController {
    /// Create a controller for the running build. The session starts `Idle`.
    pub fn new(current: CurrentVersion, ports: UpdatePorts, settings: UpdateSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                current,
                ports,
                settings,
                session: SessionHandle::new(),
                inflight: Mutex::new(None),
            }),
        }
    }

    /// The build this controller compares against.
    pub fn current_version(&self) -> &CurrentVersion {
        &self.inner.current
    }

    /// Settings in effect.
    pub fn settings(&self) -> &UpdateSettings {
        &self.inner.settings
    }

    /// Snapshot of the session.
    pub fn session(&self) -> UpdateSession {
        self.inner.session.snapshot()
    }

    /// Receiver notified on every session change.
    pub fn subscribe(&self) -> watch::Receiver<UpdateSession> {
        self.inner.session.subscribe()
    }

    /// Ask the oracle for a newer build.
    ///
    /// Returns the newer build and moves the session to `Prompting`, or
    /// `None` when there is nothing to offer. See
    /// [`check_for_update_offer`](Self::check_for_update_offer).
    ///
    /// # Errors
    ///
    /// Any oracle failure; the session is left untouched.
    pub async fn check_for_update(
        &self,
        force_manual_check: bool,
    ) -> Result<Option<VersionInfo>, CheckError> {
        Ok(self.check_for_update_offer(force_manual_check).await?.map(|offer| offer.version))
    }

    /// Like [`check_for_update`](Self::check_for_update), keeping the
    /// server's `force_update` flag and reason.
    ///
    /// Without `force_manual_check` nothing is queried unless the running
    /// platform is the self-updating one. Nothing is queried while an
    /// update is already being offered, downloaded or installed; only an
    /// `Idle`, `Succeeded` or `Failed` session is replaced. An update is only offered
    /// when its build number is strictly greater than the running build,
    /// whatever the server's `has_update` says.
    ///
    /// # Errors
    ///
    /// Any oracle failure; the session is left untouched.
    pub async fn check_for_update_offer(
        &self,
        force_manual_check: bool,
    ) -> Result<Option<UpdateOffer>, CheckError> {
        let current = &self.inner.current;
        if !force_manual_check && current.platform != self.inner.settings.self_update_platform {
            debug!(
                "Skipping update check: {} does not self-update ({} does)",
                current.platform, self.inner.settings.self_update_platform
            );
            return Ok(None);
        }

        let status = self.inner.session.snapshot().status;
        if status.is_busy() {
            warn!("Skipping update check: an update is already in progress");
            return Ok(None);
        }
        if !status.accepts_check() {
            debug!("Skipping update check: an update is already on offer");
            return Ok(None);
        }

        debug!("Checking for updates: platform={}, build={}", current.platform, current.build_number);
        let response = self.inner.ports.oracle.check(current.platform, current.build_number).await?;

        let latest = match response.latest {
            Some(latest) if response.has_update && current.is_older_than(&latest) => latest,
            Some(latest) if response.has_update => {
                warn!(
                    "Server reported build {} as an update, but build {} is running",
                    latest.build_number, current.build_number
                );
                return Ok(None);
            }
            _ => {
                info!("No update available (build {})", current.build_number);
                return Ok(None);
            }
        };

        let mut version = latest;
        version.is_force_update |= response.force_update;

        let offered = version.clone();
        let applied = self.inner.session.transition(
            |session| session.status.accepts_check(),
            move |session| {
                *session = UpdateSession {
                    status: UpdateStatus::Prompting,
                    progress_percent: 0,
                    pending_version: Some(offered),
                    last_error: None,
                };
            },
        );
        if applied.is_none() {
            warn!("Update found, but the session changed meanwhile; not prompting");
            return Ok(None);
        }

        info!("Update available: {}", version.label());
        Ok(Some(UpdateOffer {
            force_update: version.is_force_update,
            version,
            reason: response.update_reason,
        }))
    }

    /// Download, store and hand `version` to the installer.
    ///
    /// Returns `Ok(None)` without touching the session when `version` has
    /// no download URL or another download/install is in flight.
    ///
    /// # Errors
    ///
    /// The failing stage's error; the session is then `Failed` with the
    /// same error in `last_error`. When the download is abandoned through
    /// [`dismiss`](Self::dismiss) the error is [`TransferError::Cancelled`]
    /// and the session stays as the dismissal left it.
    pub async fn begin_download(
        &self,
        version: VersionInfo,
    ) -> Result<Option<DownloadedArtifact>, UpdateError> {
        self.start(version, |session| !session.status.is_busy()).await
    }

    /// [`begin_download`](Self::begin_download) of the pending version.
    ///
    /// A no-op unless the session is `Prompting`.
    ///
    /// # Errors
    ///
    /// As for [`begin_download`](Self::begin_download).
    pub async fn confirm_pending_update(&self) -> Result<Option<DownloadedArtifact>, UpdateError> {
        let session = self.inner.session.snapshot();
        let pending = match (session.status, session.pending_version) {
            (UpdateStatus::Prompting, Some(pending)) => pending,
            (status, _) => {
                debug!("Nothing to confirm in state {}", status);
                return Ok(None);
            }
        };

        self.start(pending, |session| session.status == UpdateStatus::Prompting).await
    }

    /// Reset the session to `Idle`.
    ///
    /// From `Downloading` this also cancels the transfer. While `Installing`
    /// the hand-off is already under way and cannot be recalled: this is a
    /// no-op returning `false`, and the session (so any UI bound to it) stays
    /// on `Installing` until the installer returns. Dismissing from `Idle` is
    /// also a no-op. Returns whether the session changed.
    pub fn dismiss(&self) -> bool {
        let inflight = &self.inner.inflight;
        let dismissed = self.inner.session.transition(
            |session| !matches!(session.status, UpdateStatus::Idle | UpdateStatus::Installing),
            |session| {
                if session.status == UpdateStatus::Downloading
                    && let Some(token) = inflight.lock().unwrap_or_else(PoisonError::into_inner).take()
                {
                    info!("Cancelling in-flight download");
                    token.cancel();
                }
                *session = UpdateSession::default();
            },
        );
        dismissed.is_some()
    }

    async fn start(
        &self,
        version: VersionInfo,
        guard: impl FnOnce(&UpdateSession) -> bool,
    ) -> Result<Option<DownloadedArtifact>, UpdateError> {
        let Some(url) = version.download_url().map(str::to_string) else {
            debug!("Build {} has no download URL; nothing to download", version.build_number);
            return Ok(None);
        };

        let cancel = CancellationToken::new();
        let inflight = &self.inner.inflight;
        let claimed = version.clone();
        let token = cancel.clone();
        let Some(generation) = self.inner.session.transition(
            |session| guard(session),
            move |session| {
                *inflight.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
                *session = UpdateSession {
                    status: UpdateStatus::Downloading,
                    progress_percent: 0,
                    pending_version: Some(claimed),
                    last_error: None,
                };
            },
        ) else {
            warn!("Not starting download of build {}: session is busy", version.build_number);
            return Ok(None);
        };

        info!("Downloading {} from {}", version.label(), url);
        match self.run_pipeline(generation, &version, &url, &cancel).await {
            Ok(artifact) => Ok(Some(artifact)),
            Err(error) if cancel.is_cancelled() => {
                debug!("Download of build {} abandoned: {}", version.build_number, error);
                Err(TransferError::Cancelled.into())
            }
            Err(error) => {
                warn!("Update to build {} failed: {}", version.build_number, error);
                let recorded = error.clone();
                self.inner.session.update_current(generation, move |session| {
                    session.status = UpdateStatus::Failed;
                    session.last_error = Some(recorded);
                });
                Err(error)
            }
        }
    }

    async fn run_pipeline(
        &self,
        generation: u64,
        version: &VersionInfo,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<DownloadedArtifact, UpdateError> {
        let ports = &self.inner.ports;
        let session = self.inner.session.clone();
        let progress = move |update: TransferProgress| {
            if let Some(percent) = update.percent() {
                session.raise_progress(generation, percent);
            }
        };

        let bytes = ports.transfer.fetch(url, &progress, cancel.clone()).await?;

        if self.inner.settings.verify_checksum
            && let Some(expected) = version.file_hash.as_deref()
        {
            ChecksumVerifier::verify(&bytes, expected)?;
        }

        let file_name = version.artifact_file_name();
        let locator = ports.store.save(&file_name, &bytes).await?;
        let artifact = DownloadedArtifact {
            locator,
            build_number: version.build_number,
            file_name,
            size: bytes.len() as u64,
            media_type: version.platform.media_type().to_string(),
        };
        drop(bytes);

        let installing = self.inner.session.update_current(generation, |session| {
            session.status = UpdateStatus::Installing;
            session.progress_percent = 100;
        });
        if !installing || cancel.is_cancelled() {
            return Err(TransferError::Cancelled.into());
        }

        ports.installer.install(&artifact.locator, &artifact.media_type).await?;

        self.inner.session.update_current(generation, |session| {
            session.status = UpdateStatus::Succeeded;
        });
        info!("Installer accepted {}", artifact.locator.display());
        self.schedule_idle(generation);

        Ok(artifact)
    }

    fn schedule_idle(&self, generation: u64) {
        let session = self.inner.session.clone();
        let delay = self.inner.settings.grace_delay;
        if delay.is_zero() {
            session.update_current(generation, |s| *s = UpdateSession::default());
            return;
        }

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if session.update_current(generation, |s| *s = UpdateSession::default()) {
                debug!("Update session returned to idle");
            }
        });
    }
}

impl std::fmt::Debug for UpdateController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateController")
            .field("current", &self.inner.current)
            .field("settings", &self.inner.settings)
            .field("session", &self.inner.session.snapshot())
            .finish_non_exhaustive()
    }
}
