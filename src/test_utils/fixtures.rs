//! Test fixtures for release metadata and wired-up controllers.

use std::sync::Arc;
use std::time::Duration;

use super::fakes::{MemoryPackageStore, RecordingInstaller, ScriptedTransfer, StaticOracle};
use crate::upgrade::{
    CheckUpdateResponse, CurrentVersion, Platform, UpdateController, UpdatePorts, UpdateSettings,
    VersionInfo,
};

/// An android build with a display version derived from its number.
pub fn version(build_number: u32, download_url: Option<&str>) -> VersionInfo {
    let mut info = VersionInfo::new(build_number, download_url.map(str::to_string), Platform::Android);
    info.display_version = format!("0.0.{build_number}");
    info.title = format!("Float 0.0.{build_number}");
    info
}

/// A check response announcing `build_number` as an update.
pub fn check_response(build_number: u32, download_url: Option<&str>) -> CheckUpdateResponse {
    CheckUpdateResponse {
        has_update: true,
        latest: Some(version(build_number, download_url)),
        force_update: false,
        update_reason: Some("new version available".to_string()),
    }
}

/// A controller wired to fakes, with handles on every fake.
pub struct ControllerFixture {
    /// The oracle fake
    pub oracle: Arc<StaticOracle>,
    /// The transfer fake
    pub transfer: Arc<ScriptedTransfer>,
    /// The store fake
    pub store: Arc<MemoryPackageStore>,
    /// The installer fake
    pub installer: Arc<RecordingInstaller>,
    /// Controller under test
    pub controller: UpdateController,
}

impl ControllerFixture {
    /// Running build 3 on android, working store and installer, 1s grace delay.
    pub fn new(oracle: StaticOracle, transfer: ScriptedTransfer) -> Self {
        Self::with_parts(
            CurrentVersion::default(),
            UpdateSettings::default(),
            oracle,
            transfer,
            MemoryPackageStore::new(),
            RecordingInstaller::new(),
        )
    }

    /// Like [`new`](Self::new) with a custom grace delay.
    pub fn with_grace_delay(
        oracle: StaticOracle,
        transfer: ScriptedTransfer,
        grace_delay: Duration,
    ) -> Self {
        Self::with_parts(
            CurrentVersion::default(),
            UpdateSettings {
                grace_delay,
                ..UpdateSettings::default()
            },
            oracle,
            transfer,
            MemoryPackageStore::new(),
            RecordingInstaller::new(),
        )
    }

    /// Fully custom fixture.
    pub fn with_parts(
        current: CurrentVersion,
        settings: UpdateSettings,
        oracle: StaticOracle,
        transfer: ScriptedTransfer,
        store: MemoryPackageStore,
        installer: RecordingInstaller,
    ) -> Self {
        let oracle = Arc::new(oracle);
        let transfer = Arc::new(transfer);
        let store = Arc::new(store);
        let installer = Arc::new(installer);

        let ports = UpdatePorts {
            oracle: oracle.clone(),
            transfer: transfer.clone(),
            store: store.clone(),
            installer: installer.clone(),
        };

        Self {
            oracle,
            transfer,
            store,
            installer,
            controller: UpdateController::new(current, ports, settings),
        }
    }
}
