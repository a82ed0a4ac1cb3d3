//! The `float-update` binary.

use assert_cmd::Command;
use axum::Router;
use axum::routing::get;
use predicates::prelude::*;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

/// A command isolated from the user's configuration and cache.
fn float_update(temp: &Path) -> Command {
    let mut cmd = Command::cargo_bin("float-update").unwrap();
    cmd.env("FLOAT_UPDATE_CONFIG_PATH", temp.join("config.toml"))
        .env("FLOAT_UPDATE_CACHE_DIR", temp.join("packages"))
        .env("FLOAT_UPDATE_NO_PROGRESS", "1")
        .env("NO_COLOR", "1")
        .env_remove("FLOAT_API_BASE_URL")
        .env_remove("RUST_LOG");
    cmd
}

/// Serve a single update of build 5 and its package.
async fn spawn_update_server() -> String {
    let router = Router::new()
        .route(
            "/api/v1/app-updates/check",
            get(|| async {
                axum::Json(json!({
                    "code": 200,
                    "message": "ok",
                    "data": {
                        "has_update": true,
                        "latest": {
                            "version_code": 5,
                            "version_name": "0.0.5",
                            "platform": "android",
                            "title": "Budget charts",
                            "download_url": "/pkg/update_5.apk",
                        },
                        "update_reason": "new charts",
                    }
                }))
            }),
        )
        .route(
            "/api/v1/app-updates/history",
            get(|| async {
                axum::Json(json!([
                    { "version_code": 4, "version_name": "0.0.4", "platform": "android" },
                    { "version_code": 5, "version_name": "0.0.5", "platform": "android" },
                ]))
            }),
        )
        .route("/pkg/update_5.apk", get(|| async { b"apk".to_vec() }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api/v1")
}

#[test]
fn test_help_lists_commands() {
    let temp = TempDir::new().unwrap();
    float_update(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("upgrade"))
        .stdout(predicate::str::contains("history"));
}

#[test]
fn test_config_path_honours_env() {
    let temp = TempDir::new().unwrap();
    float_update(temp.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_then_refuses_overwrite() {
    let temp = TempDir::new().unwrap();
    float_update(temp.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config"));
    assert!(temp.path().join("config.toml").exists());

    float_update(temp.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_invalid_config_is_reported() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("config.toml"), "[app\nbuild_number =").unwrap();

    float_update(temp.path())
        .arg("check")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error"))
        .stderr(predicate::str::contains("suggestion"));
}

#[test]
fn test_check_unreachable_server_fails() {
    let temp = TempDir::new().unwrap();
    float_update(temp.path())
        .env("FLOAT_API_BASE_URL", "http://127.0.0.1:9/api/v1")
        .arg("check")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to reach update server"));
}

#[test]
fn test_auto_check_skipped_on_ios() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("config.toml"), "[app]\nplatform = \"ios\"\n").unwrap();

    // No server is running: an automatic check on ios must not query one
    float_update(temp.path())
        .env("FLOAT_API_BASE_URL", "http://127.0.0.1:9/api/v1")
        .args(["check", "--auto"])
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_json_against_server() {
    let base = spawn_update_server().await;
    let temp = TempDir::new().unwrap();

    let output = tokio::task::spawn_blocking({
        let root = temp.path().to_path_buf();
        move || {
            float_update(&root)
                .env("FLOAT_API_BASE_URL", &base)
                .args(["check", "--json"])
                .output()
                .unwrap()
        }
    })
    .await
    .unwrap();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["update_available"], json!(true));
    assert_eq!(value["current"]["build_number"], json!(3));
    assert_eq!(value["offer"]["version"]["version_code"], json!(5));
    assert_eq!(value["offer"]["reason"], json!("new charts"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_history_against_server() {
    let base = spawn_update_server().await;
    let temp = TempDir::new().unwrap();

    let assert = tokio::task::spawn_blocking({
        let root = temp.path().to_path_buf();
        move || float_update(&root).env("FLOAT_API_BASE_URL", &base).arg("history").assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("0.0.5 (build 5)"))
        .stdout(predicate::str::contains("0.0.4 (build 4)"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_upgrade_requires_confirmation_when_not_interactive() {
    let base = spawn_update_server().await;
    let temp = TempDir::new().unwrap();

    let assert = tokio::task::spawn_blocking({
        let root = temp.path().to_path_buf();
        move || {
            float_update(&root)
                .env("FLOAT_API_BASE_URL", &base)
                .arg("upgrade")
                .write_stdin("")
                .assert()
        }
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("Update available"))
        .stdout(predicate::str::contains("--yes"));
    assert!(!temp.path().join("packages").join("update_5.apk").exists());
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_upgrade_yes_stores_and_hands_off() {
    let base = spawn_update_server().await;
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("config.toml"),
        "[upgrade]\ninstaller_command = [\"true\", \"{path}\"]\ngrace_delay_ms = 0\n",
    )
    .unwrap();

    let assert = tokio::task::spawn_blocking({
        let root = temp.path().to_path_buf();
        move || {
            float_update(&root)
                .env("FLOAT_API_BASE_URL", &base)
                .args(["upgrade", "--yes"])
                .assert()
        }
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("handed to the installer"))
        .stdout(predicate::str::contains("application/vnd.android.package-archive"));
    let stored = temp.path().join("packages").join("update_5.apk");
    assert_eq!(std::fs::read(stored).unwrap(), b"apk");
}
