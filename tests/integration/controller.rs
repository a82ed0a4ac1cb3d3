//! Update sessions end to end, driven through in-memory ports.

use async_trait::async_trait;
use float_update::core::{TransferError, UpdateError};
use float_update::test_utils::{
    ControllerFixture, MemoryPackageStore, RecordingInstaller, ScriptedTransfer, StaticOracle,
    check_response, init_test_logging, version,
};
use float_update::upgrade::{
    CurrentVersion, Platform, ProgressSink, TransferEngine, TransferProgress, UpdateController,
    UpdatePorts, UpdateSession, UpdateSettings, UpdateStatus,
};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

/// Transfer engine recording the session's `progress_percent` right after
/// every progress report it makes.
struct ObservingTransfer {
    progress: Vec<TransferProgress>,
    bytes: Vec<u8>,
    session: OnceLock<watch::Receiver<UpdateSession>>,
    observed: Mutex<Vec<u8>>,
}

impl ObservingTransfer {
    fn new(bytes: &[u8], progress: &[(u64, Option<u64>)]) -> Self {
        Self {
            progress: progress
                .iter()
                .map(|&(received, total)| TransferProgress {
                    received,
                    total,
                })
                .collect(),
            bytes: bytes.to_vec(),
            session: OnceLock::new(),
            observed: Mutex::new(Vec::new()),
        }
    }

    fn observed(&self) -> Vec<u8> {
        self.observed.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransferEngine for ObservingTransfer {
    async fn fetch(
        &self,
        _url: &str,
        progress: &ProgressSink,
        _cancel: CancellationToken,
    ) -> Result<Vec<u8>, TransferError> {
        let session = self.session.get().expect("session receiver installed");
        for update in &self.progress {
            progress(*update);
            let percent = session.borrow().progress_percent;
            self.observed.lock().unwrap().push(percent);
        }
        Ok(self.bytes.clone())
    }
}

fn observing_controller(
    transfer: Arc<ObservingTransfer>,
    grace_delay: Duration,
) -> (UpdateController, Arc<MemoryPackageStore>) {
    let store = Arc::new(MemoryPackageStore::new());
    let ports = UpdatePorts {
        oracle: Arc::new(StaticOracle::update_to(5, "/pkg/5.bin")),
        transfer: transfer.clone(),
        store: store.clone(),
        installer: Arc::new(RecordingInstaller::new()),
    };
    let settings = UpdateSettings {
        grace_delay,
        ..UpdateSettings::default()
    };
    let controller = UpdateController::new(CurrentVersion::default(), ports, settings);
    transfer.session.set(controller.subscribe()).ok();
    (controller, store)
}

#[tokio::test]
async fn test_scenario_check_finds_newer_build() {
    init_test_logging(None);
    let fixture = ControllerFixture::new(
        StaticOracle::update_to(5, "/pkg/5.bin"),
        ScriptedTransfer::succeeding(b"package".to_vec(), &[]),
    );

    let found = fixture.controller.check_for_update(false).await.unwrap();

    let found = found.expect("build 5 is newer than build 3");
    assert_eq!(found.build_number, 5);
    assert_eq!(found.download_url(), Some("/pkg/5.bin"));

    let session = fixture.controller.session();
    assert_eq!(session.status, UpdateStatus::Prompting);
    assert_eq!(session.pending_version, Some(found));
    assert_eq!(session.progress_percent, 0);
    assert!(session.last_error.is_none());
}

#[tokio::test]
async fn test_scenario_confirm_reports_progress_then_returns_to_idle() {
    init_test_logging(None);
    let transfer = Arc::new(ObservingTransfer::new(&[7u8; 200], &[(50, Some(200)), (200, Some(200))]));
    let (controller, store) = observing_controller(transfer.clone(), Duration::from_millis(50));
    let mut updates = controller.subscribe();

    controller.check_for_update(false).await.unwrap().unwrap();
    let artifact = controller.confirm_pending_update().await.unwrap().unwrap();

    assert_eq!(transfer.observed(), vec![25, 100]);
    assert_eq!(artifact.file_name, "update_5.apk");
    assert_eq!(artifact.size, 200);
    assert_eq!(store.get("update_5.apk"), Some(vec![7u8; 200]));

    // Installing has been passed; the grace delay brings the session back to idle
    tokio::time::timeout(WAIT, updates.wait_for(|s| s.status == UpdateStatus::Idle))
        .await
        .expect("session returns to idle after the grace delay")
        .unwrap();
    assert_eq!(controller.session(), UpdateSession::default());
}

#[tokio::test]
async fn test_scenario_http_404_fails_without_storing() {
    let not_found = TransferError::Status {
        url: "http://10.0.2.2:8080/pkg/5.bin".to_string(),
        status: 404,
    };
    let fixture = ControllerFixture::new(
        StaticOracle::update_to(5, "/pkg/5.bin"),
        ScriptedTransfer::failing(not_found.clone(), &[]),
    );

    fixture.controller.check_for_update(false).await.unwrap();
    let result = fixture.controller.confirm_pending_update().await;
    assert_eq!(result, Err(UpdateError::Transfer(not_found.clone())));

    let session = fixture.controller.session();
    assert_eq!(session.status, UpdateStatus::Failed);
    assert_eq!(session.last_error.as_ref().map(UpdateError::kind), Some("transfer"));
    assert_eq!(session.last_error, Some(UpdateError::Transfer(not_found)));
    assert_eq!(session.pending_version.map(|v| v.build_number), Some(5));
    assert!(fixture.store.file_names().is_empty());
    assert!(fixture.installer.requests().is_empty());
}

#[tokio::test]
async fn test_scenario_same_build_twice_overwrites() {
    let fixture = ControllerFixture::with_grace_delay(
        StaticOracle::update_to(5, "/pkg/5.bin"),
        ScriptedTransfer::succeeding(b"apk bytes".to_vec(), &[(9, Some(9))]),
        Duration::ZERO,
    );

    let first = fixture.controller.begin_download(version(5, Some("/pkg/5.bin"))).await.unwrap();
    let second = fixture.controller.begin_download(version(5, Some("/pkg/5.bin"))).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(fixture.store.file_names(), vec!["update_5.apk".to_string()]);
    assert_eq!(fixture.store.saves(), 2);
    assert_eq!(fixture.installer.requests().len(), 2);
    assert_eq!(fixture.controller.session().status, UpdateStatus::Idle);
}

#[tokio::test]
async fn test_update_offered_only_for_strictly_newer_builds() {
    for current in 0..5u32 {
        for remote in 0..5u32 {
            let fixture = ControllerFixture::with_parts(
                CurrentVersion {
                    build_number: current,
                    ..CurrentVersion::default()
                },
                UpdateSettings::default(),
                StaticOracle::new(check_response(remote, Some("/pkg/x.bin"))),
                ScriptedTransfer::succeeding(Vec::new(), &[]),
                MemoryPackageStore::new(),
                RecordingInstaller::new(),
            );

            let found = fixture.controller.check_for_update(false).await.unwrap();
            assert_eq!(
                found.is_some(),
                remote > current,
                "current={current} remote={remote}"
            );
            let expected = if remote > current {
                UpdateStatus::Prompting
            } else {
                UpdateStatus::Idle
            };
            assert_eq!(fixture.controller.session().status, expected);
        }
    }
}

#[tokio::test]
async fn test_progress_never_decreases() {
    let transfer = Arc::new(ObservingTransfer::new(
        b"bytes",
        &[
            (0, Some(200)),
            (50, Some(200)),
            (20, Some(200)),
            (120, None),
            (150, Some(200)),
            (150, Some(0)),
            (200, Some(200)),
        ],
    ));
    let (controller, _store) = observing_controller(transfer.clone(), Duration::ZERO);

    controller.begin_download(version(5, Some("/pkg/5.bin"))).await.unwrap();

    let observed = transfer.observed();
    assert_eq!(observed, vec![0, 25, 25, 25, 75, 75, 100]);
    assert!(observed.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn test_failure_after_partial_transfer_stores_nothing() {
    let lost = TransferError::Incomplete {
        url: "http://10.0.2.2:8080/pkg/5.bin".to_string(),
        expected: 200,
        received: 120,
    };
    let fixture = ControllerFixture::new(
        StaticOracle::update_to(5, "/pkg/5.bin"),
        ScriptedTransfer::failing(lost, &[(60, Some(200)), (120, Some(200))]),
    );

    fixture.controller.begin_download(version(5, Some("/pkg/5.bin"))).await.unwrap_err();

    let session = fixture.controller.session();
    assert_eq!(session.status, UpdateStatus::Failed);
    assert_eq!(session.progress_percent, 60);
    assert!(fixture.store.file_names().is_empty());
    assert!(fixture.installer.requests().is_empty());
}

#[tokio::test]
async fn test_dismiss_clears_failed_and_prompting_sessions() {
    let fixture = ControllerFixture::new(
        StaticOracle::update_to(5, "/pkg/5.bin"),
        ScriptedTransfer::failing(TransferError::Connection {
            url: "http://10.0.2.2:8080/pkg/5.bin".to_string(),
            reason: "connection reset".to_string(),
        }, &[]),
    );

    fixture.controller.check_for_update(false).await.unwrap();
    assert!(fixture.controller.dismiss());
    assert_eq!(fixture.controller.session(), UpdateSession::default());

    fixture.controller.check_for_update(false).await.unwrap();
    fixture.controller.confirm_pending_update().await.unwrap_err();
    assert_eq!(fixture.controller.session().status, UpdateStatus::Failed);

    assert!(fixture.controller.dismiss());
    let session = fixture.controller.session();
    assert_eq!(session.status, UpdateStatus::Idle);
    assert!(session.pending_version.is_none());
    assert!(session.last_error.is_none());
}

#[tokio::test]
async fn test_dismiss_cancels_download() {
    let transfer = ScriptedTransfer::stalled(&[(10, Some(100))]);
    let started = transfer.started();
    let fixture = ControllerFixture::new(StaticOracle::update_to(5, "/pkg/5.bin"), transfer);

    let controller = fixture.controller.clone();
    let download = tokio::spawn(async move {
        controller.begin_download(version(5, Some("/pkg/5.bin"))).await
    });

    tokio::time::timeout(WAIT, started.notified()).await.unwrap();
    assert_eq!(fixture.controller.session().status, UpdateStatus::Downloading);
    assert_eq!(fixture.controller.session().progress_percent, 10);

    assert!(fixture.controller.dismiss());
    let result = tokio::time::timeout(WAIT, download).await.unwrap().unwrap();

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(fixture.controller.session(), UpdateSession::default());
    assert!(fixture.store.file_names().is_empty());
    assert!(fixture.installer.requests().is_empty());
}

#[tokio::test]
async fn test_web_build_uses_web_artifact() {
    let fixture = ControllerFixture::with_grace_delay(
        StaticOracle::no_update(),
        ScriptedTransfer::succeeding(b"PK".to_vec(), &[]),
        Duration::ZERO,
    );
    let mut web = version(8, Some("/pkg/8.zip"));
    web.platform = Platform::Web;

    let artifact = fixture.controller.begin_download(web).await.unwrap().unwrap();

    assert_eq!(artifact.file_name, "update_8.zip");
    assert_eq!(artifact.media_type, "application/zip");
    assert_eq!(
        fixture.installer.requests(),
        vec![(artifact.locator.clone(), "application/zip".to_string())]
    );
}
