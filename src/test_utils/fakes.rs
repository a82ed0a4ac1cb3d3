//! In-memory implementations of the pipeline ports.
//!
//! Each fake records how it was called so tests can assert on side effects
//! (was the oracle queried, was anything stored, what did the installer
//! receive).

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::core::{CheckError, InstallError, StorageError, TransferError};
use crate::upgrade::{
    CheckUpdateResponse, InstallerTrigger, PackageStore, Platform, ProgressSink, TransferEngine,
    TransferProgress, VersionInfo, VersionOracle,
};

/// Oracle answering every check with the same response.
#[derive(Debug)]
pub struct StaticOracle {
    response: Result<CheckUpdateResponse, CheckError>,
    history: Vec<VersionInfo>,
    calls: AtomicUsize,
}

impl StaticOracle {
    /// Answer with `response`.
    pub fn new(response: CheckUpdateResponse) -> Self {
        Self {
            response: Ok(response),
            history: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Report build `build_number` at `url` as an update.
    pub fn update_to(build_number: u32, url: &str) -> Self {
        Self::new(super::fixtures::check_response(build_number, Some(url)))
    }

    /// Report that no update exists.
    pub fn no_update() -> Self {
        Self::new(CheckUpdateResponse::default())
    }

    /// Fail every check with `error`.
    pub fn failing(error: CheckError) -> Self {
        Self {
            response: Err(error),
            history: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Builds returned by `history`.
    #[must_use]
    pub fn with_history(mut self, history: Vec<VersionInfo>) -> Self {
        self.history = history;
        self
    }

    /// Number of `check` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VersionOracle for StaticOracle {
    async fn check(
        &self,
        _platform: Platform,
        _build_number: u32,
    ) -> Result<CheckUpdateResponse, CheckError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }

    async fn latest(&self, _platform: Platform) -> Result<Option<VersionInfo>, CheckError> {
        self.response.clone().map(|response| response.latest)
    }

    async fn history(&self, _platform: Platform) -> Result<Vec<VersionInfo>, CheckError> {
        Ok(self.history.clone())
    }
}

/// Transfer engine replaying a fixed sequence of progress reports.
///
/// After replaying, it optionally waits on a gate before returning its
/// outcome. A cancelled token always wins and yields
/// [`TransferError::Cancelled`].
#[derive(Debug)]
pub struct ScriptedTransfer {
    progress: Vec<TransferProgress>,
    outcome: Result<Vec<u8>, TransferError>,
    gate: Option<Arc<Notify>>,
    started: Arc<Notify>,
    urls: Mutex<Vec<String>>,
}

impl ScriptedTransfer {
    fn scripted(progress: &[(u64, Option<u64>)], outcome: Result<Vec<u8>, TransferError>) -> Self {
        Self {
            progress: progress
                .iter()
                .map(|&(received, total)| TransferProgress {
                    received,
                    total,
                })
                .collect(),
            outcome,
            gate: None,
            started: Arc::new(Notify::new()),
            urls: Mutex::new(Vec::new()),
        }
    }

    /// Report `progress`, then return `bytes`.
    pub fn succeeding(bytes: Vec<u8>, progress: &[(u64, Option<u64>)]) -> Self {
        Self::scripted(progress, Ok(bytes))
    }

    /// Report `progress`, then fail with `error`.
    pub fn failing(error: TransferError, progress: &[(u64, Option<u64>)]) -> Self {
        Self::scripted(progress, Err(error))
    }

    /// Report `progress`, then wait until cancelled.
    pub fn stalled(progress: &[(u64, Option<u64>)]) -> Self {
        Self::scripted(progress, Ok(Vec::new())).gated(Arc::new(Notify::new()))
    }

    /// Hold the outcome back until `gate` is notified.
    #[must_use]
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Notified once the scripted progress has been replayed.
    pub fn started(&self) -> Arc<Notify> {
        Arc::clone(&self.started)
    }

    /// URLs fetched so far.
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().map(|urls| urls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TransferEngine for ScriptedTransfer {
    async fn fetch(
        &self,
        url: &str,
        progress: &ProgressSink,
        cancel: CancellationToken,
    ) -> Result<Vec<u8>, TransferError> {
        if let Ok(mut urls) = self.urls.lock() {
            urls.push(url.to_string());
        }

        for update in &self.progress {
            progress(*update);
        }
        self.started.notify_one();

        if let Some(gate) = &self.gate {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(TransferError::Cancelled),
                () = gate.notified() => {}
            }
        }

        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        self.outcome.clone()
    }
}

/// Package store keeping files in a map.
#[derive(Debug, Default)]
pub struct MemoryPackageStore {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    saves: AtomicUsize,
    failure: Option<StorageError>,
}

impl MemoryPackageStore {
    /// An empty, working store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store failing every save with `error`.
    pub fn failing(error: StorageError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// Names of stored files.
    pub fn file_names(&self) -> Vec<String> {
        self.files.lock().map(|files| files.keys().cloned().collect()).unwrap_or_default()
    }

    /// Contents of `name`, if stored.
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files.lock().ok().and_then(|files| files.get(name).cloned())
    }

    /// Number of successful saves, overwrites included.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PackageStore for MemoryPackageStore {
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let mut files = self.files.lock().map_err(|e| StorageError::Io {
            path: name.to_string(),
            reason: e.to_string(),
        })?;
        files.insert(name.to_string(), bytes.to_vec());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(Path::new("/memory").join(name))
    }
}

/// Installer recording every hand-off.
#[derive(Debug, Default)]
pub struct RecordingInstaller {
    requests: Mutex<Vec<(PathBuf, String)>>,
    failure: Option<InstallError>,
}

impl RecordingInstaller {
    /// An installer accepting every package.
    pub fn new() -> Self {
        Self::default()
    }

    /// An installer rejecting every package with `error`.
    pub fn failing(error: InstallError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// `(locator, media_type)` of every request, accepted or not.
    pub fn requests(&self) -> Vec<(PathBuf, String)> {
        self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl InstallerTrigger for RecordingInstaller {
    async fn install(&self, locator: &Path, media_type: &str) -> Result<(), InstallError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((locator.to_path_buf(), media_type.to_string()));
        }
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}
