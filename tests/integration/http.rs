//! The HTTP oracle, transfer engine and package store against a local server.

use axum::Router;
use axum::body::Body;
use axum::extract::Query;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use float_update::config::GlobalConfig;
use float_update::core::{CheckError, TransferError};
use float_update::test_utils::init_test_logging;
use float_update::upgrade::{
    ChecksumVerifier, HttpTransferEngine, HttpVersionOracle, Platform, TransferEngine,
    TransferProgress, UpdateEndpoints, UpdateStatus, VersionOracle,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const PACKAGE: &[u8] = b"float apk bytes, version five";

/// Serve `router` on an ephemeral port and return its base URL.
async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn release(build: u32, download_url: &str) -> serde_json::Value {
    json!({
        "id": build,
        "version_code": build,
        "version_name": format!("0.0.{build}"),
        "platform": "android",
        "title": format!("Float 0.0.{build}"),
        "download_url": download_url,
        "file_size": PACKAGE.len(),
        "file_hash": ChecksumVerifier::compute_sha256(PACKAGE),
    })
}

async fn check(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    let current: u32 = params.get("version_code").and_then(|v| v.parse().ok()).unwrap_or(0);
    if params.get("platform").map(String::as_str) != Some("android") {
        return (StatusCode::BAD_REQUEST, "unknown platform").into_response();
    }
    let body = if current < 5 {
        json!({
            "has_update": true,
            "latest": release(5, "/pkg/update_5.apk"),
            "force_update": true,
            "update_reason": "security fix",
        })
    } else {
        json!({ "has_update": false, "latest": null })
    };
    axum::Json(body).into_response()
}

/// Announces the whole package, then drops the connection halfway through.
async fn truncated() -> impl IntoResponse {
    let half = PACKAGE[..PACKAGE.len() / 2].to_vec();
    let chunks: Vec<Result<Vec<u8>, std::io::Error>> = vec![
        Ok(half),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "server went away")),
    ];
    (
        [(header::CONTENT_LENGTH, PACKAGE.len().to_string())],
        Body::from_stream(futures::stream::iter(chunks)),
    )
}

fn update_server() -> Router {
    Router::new()
        .route("/api/v1/app-updates/check", get(check))
        .route(
            "/api/v1/app-updates/latest",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                match params.get("platform").map(String::as_str) {
                    Some("android") => axum::Json(json!({
                        "code": 200,
                        "message": "ok",
                        "data": release(5, "/pkg/update_5.apk"),
                    }))
                    .into_response(),
                    _ => StatusCode::NOT_FOUND.into_response(),
                }
            }),
        )
        .route(
            "/api/v1/app-updates/history",
            get(|| async {
                axum::Json(json!([release(4, "/pkg/update_4.apk"), release(5, "/pkg/update_5.apk")]))
            }),
        )
        .route("/pkg/update_5.apk", get(|| async { PACKAGE.to_vec() }))
        .route("/pkg/truncated.apk", get(truncated))
        .route(
            "/pkg/chunked.apk",
            get(|| async {
                let chunks: Vec<Result<Vec<u8>, std::io::Error>> =
                    PACKAGE.chunks(8).map(|chunk| Ok(chunk.to_vec())).collect();
                Body::from_stream(futures::stream::iter(chunks))
            }),
        )
}

fn oracle(base: &str) -> HttpVersionOracle {
    let endpoints = UpdateEndpoints::new(&format!("{base}/api/v1"), None);
    HttpVersionOracle::new(endpoints, Duration::from_secs(5)).unwrap()
}

fn transfer(base: &str, max_bytes: u64) -> HttpTransferEngine {
    let endpoints = UpdateEndpoints::new(&format!("{base}/api/v1"), None);
    HttpTransferEngine::new(endpoints, Duration::from_secs(5), Duration::from_secs(5), max_bytes)
        .unwrap()
}

#[tokio::test]
async fn test_oracle_check_sends_platform_and_build() {
    init_test_logging(None);
    let base = spawn_server(update_server()).await;
    let oracle = oracle(&base);

    let response = oracle.check(Platform::Android, 3).await.unwrap();
    assert!(response.has_update);
    assert!(response.force_update);
    assert_eq!(response.update_reason.as_deref(), Some("security fix"));
    let latest = response.latest.unwrap();
    assert_eq!(latest.build_number, 5);
    assert_eq!(latest.display_version, "0.0.5");

    let response = oracle.check(Platform::Android, 5).await.unwrap();
    assert!(!response.has_update);
    assert!(response.latest.is_none());

    let error = oracle.check(Platform::Ios, 3).await.unwrap_err();
    assert!(matches!(error, CheckError::Status { status: 400, .. }));
}

#[tokio::test]
async fn test_oracle_latest_and_history() {
    let base = spawn_server(update_server()).await;
    let oracle = oracle(&base);

    let latest = oracle.latest(Platform::Android).await.unwrap();
    assert_eq!(latest.map(|v| v.build_number), Some(5));

    // 404 means nothing has been published
    assert_eq!(oracle.latest(Platform::Web).await.unwrap(), None);

    let history = oracle.history(Platform::Android).await.unwrap();
    let builds: Vec<u32> = history.iter().map(|v| v.build_number).collect();
    assert_eq!(builds, vec![4, 5]);
}

#[tokio::test]
async fn test_oracle_latest_accepts_bare_release() {
    let router = Router::new().route(
        "/api/v1/app-updates/latest",
        get(|| async {
            axum::Json(json!({
                "id": 7,
                "version_code": 5,
                "version_name": "0.0.5",
                "platform": "android",
                "download_url": "/pkg/5.apk",
            }))
        }),
    );
    let base = spawn_server(router).await;

    let latest = oracle(&base).latest(Platform::Android).await.unwrap().unwrap();
    assert_eq!(latest.build_number, 5);
    assert_eq!(latest.download_url(), Some("/pkg/5.apk"));
}

#[tokio::test]
async fn test_oracle_unreachable_server() {
    // Nothing listens on the discard port
    let oracle = oracle("http://127.0.0.1:9");
    let error = oracle.check(Platform::Android, 3).await.unwrap_err();
    assert!(matches!(error, CheckError::Transport { .. }), "{error:?}");
}

#[tokio::test]
async fn test_oracle_rejects_non_float_server() {
    let router = Router::new().route("/api/v1/app-updates/check", get(|| async { "<html>" }));
    let base = spawn_server(router).await;

    let error = oracle(&base).check(Platform::Android, 3).await.unwrap_err();
    assert!(matches!(error, CheckError::Parse { .. }), "{error:?}");
}

#[tokio::test]
async fn test_transfer_reports_progress_for_relative_url() {
    let base = spawn_server(update_server()).await;
    let engine = transfer(&base, 1024);
    let reports = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&reports);
    let sink = move |update: TransferProgress| recorder.lock().unwrap().push(update);

    let bytes = engine.fetch("/pkg/update_5.apk", &sink, CancellationToken::new()).await.unwrap();

    assert_eq!(bytes, PACKAGE);
    let reports = reports.lock().unwrap().clone();
    let total = Some(PACKAGE.len() as u64);
    assert_eq!(reports.first(), Some(&TransferProgress { received: 0, total }));
    assert_eq!(reports.last(), Some(&TransferProgress { received: PACKAGE.len() as u64, total }));
    assert!(reports.windows(2).all(|pair| pair[0].received <= pair[1].received));
}

#[tokio::test]
async fn test_transfer_without_content_length() {
    let base = spawn_server(update_server()).await;
    let engine = transfer(&base, 1024);
    let reports = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&reports);
    let sink = move |update: TransferProgress| recorder.lock().unwrap().push(update);

    let url = format!("{base}/pkg/chunked.apk");
    let bytes = engine.fetch(&url, &sink, CancellationToken::new()).await.unwrap();

    assert_eq!(bytes, PACKAGE);
    let reports = reports.lock().unwrap().clone();
    assert!(reports.iter().all(|update| update.total.is_none() && update.percent().is_none()));
}

#[tokio::test]
async fn test_transfer_http_error_status() {
    let base = spawn_server(update_server()).await;
    let engine = transfer(&base, 1024);

    let error = engine
        .fetch("/pkg/missing.apk", &|_: TransferProgress| {}, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(error, TransferError::Status { status: 404, .. }), "{error:?}");
}

#[tokio::test]
async fn test_transfer_size_limit() {
    let base = spawn_server(update_server()).await;
    let engine = transfer(&base, 8);

    let error = engine
        .fetch("/pkg/update_5.apk", &|_: TransferProgress| {}, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(error, TransferError::TooLarge { limit: 8, .. }), "{error:?}");

    let error = engine
        .fetch("/pkg/chunked.apk", &|_: TransferProgress| {}, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(error, TransferError::TooLarge { limit: 8, .. }), "{error:?}");
}

#[tokio::test]
async fn test_transfer_connection_lost_mid_body() {
    let base = spawn_server(update_server()).await;
    let engine = transfer(&base, 1024);
    let reports = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&reports);
    let sink = move |update: TransferProgress| recorder.lock().unwrap().push(update);

    let error = engine
        .fetch("/pkg/truncated.apk", &sink, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(
        matches!(error, TransferError::Connection { .. } | TransferError::Incomplete { .. }),
        "{error:?}"
    );
    let reports = reports.lock().unwrap().clone();
    assert!(reports.iter().all(|update| update.received < PACKAGE.len() as u64));
}

#[tokio::test]
async fn test_transfer_cancelled_before_start() {
    let base = spawn_server(update_server()).await;
    let engine = transfer(&base, 1024);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let error = engine.fetch("/pkg/update_5.apk", &|_: TransferProgress| {}, cancel).await.unwrap_err();
    assert_eq!(error, TransferError::Cancelled);
}

#[cfg(unix)]
#[tokio::test]
async fn test_full_update_against_local_server() {
    init_test_logging(None);
    let base = spawn_server(update_server()).await;
    let temp = TempDir::new().unwrap();
    let marker = temp.path().join("installed.txt");

    let mut config = GlobalConfig::default();
    config.api.base_url = format!("{base}/api/v1");
    config.upgrade.cache_dir = Some(temp.path().join("packages"));
    config.upgrade.grace_delay_ms = 0;
    config.upgrade.installer_command = Some(vec![
        "sh".to_string(),
        "-c".to_string(),
        format!("test -f \"$0\" && echo \"$0 $1\" > '{}'", marker.display()),
        "{path}".to_string(),
        "{media_type}".to_string(),
    ]);
    let controller = config.build_controller().unwrap();

    let offered = controller.check_for_update(false).await.unwrap().unwrap();
    assert!(offered.is_force_update);

    let artifact = controller.confirm_pending_update().await.unwrap().unwrap();
    let expected_path = temp.path().join("packages").join("update_5.apk");
    assert_eq!(artifact.locator, expected_path);
    assert_eq!(std::fs::read(&expected_path).unwrap(), PACKAGE);
    assert_eq!(
        std::fs::read_to_string(&marker).unwrap().trim(),
        format!("{} application/vnd.android.package-archive", expected_path.display())
    );
    assert_eq!(controller.session().status, UpdateStatus::Idle);

    // The same build again overwrites the stored package
    controller.begin_download(offered).await.unwrap().unwrap();
    let stored: Vec<_> = std::fs::read_dir(temp.path().join("packages"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(stored, vec![std::ffi::OsString::from("update_5.apk")]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_checksum_mismatch_stores_nothing() {
    let router = Router::new()
        .route(
            "/api/v1/app-updates/check",
            get(|| async {
                let mut latest = release(5, "/pkg/update_5.apk");
                latest["file_hash"] = json!(format!("sha256:{}", "0".repeat(64)));
                axum::Json(json!({ "has_update": true, "latest": latest }))
            }),
        )
        .route("/pkg/update_5.apk", get(|| async { PACKAGE.to_vec() }));
    let base = spawn_server(router).await;
    let temp = TempDir::new().unwrap();

    let mut config = GlobalConfig::default();
    config.api.base_url = format!("{base}/api/v1");
    config.upgrade.cache_dir = Some(temp.path().join("packages"));
    config.upgrade.installer_command = Some(vec!["true".to_string()]);
    let controller = config.build_controller().unwrap();

    controller.check_for_update(false).await.unwrap().unwrap();
    let error = controller.confirm_pending_update().await.unwrap_err();

    assert_eq!(error.kind(), "transfer");
    assert_eq!(controller.session().status, UpdateStatus::Failed);
    assert!(!temp.path().join("packages").join("update_5.apk").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_lost_connection_fails_session_and_stores_nothing() {
    let router = Router::new()
        .route(
            "/api/v1/app-updates/check",
            get(|| async {
                axum::Json(json!({
                    "has_update": true,
                    "latest": {
                        "version_code": 5,
                        "version_name": "0.0.5",
                        "platform": "android",
                        "download_url": "/pkg/truncated.apk",
                    }
                }))
            }),
        )
        .route("/pkg/truncated.apk", get(truncated));
    let base = spawn_server(router).await;
    let temp = TempDir::new().unwrap();

    let mut config = GlobalConfig::default();
    config.api.base_url = format!("{base}/api/v1");
    config.upgrade.cache_dir = Some(temp.path().join("packages"));
    config.upgrade.installer_command = Some(vec!["true".to_string()]);
    let controller = config.build_controller().unwrap();

    controller.check_for_update(false).await.unwrap().unwrap();
    let error = controller.confirm_pending_update().await.unwrap_err();

    assert_eq!(error.kind(), "transfer");
    let session = controller.session();
    assert_eq!(session.status, UpdateStatus::Failed);
    assert!(session.progress_percent < 100);
    assert!(!temp.path().join("packages").join("update_5.apk").exists());
}
