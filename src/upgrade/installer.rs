//! Installer trigger: hands a stored package to the platform installer.
//!
//! On a device this is the system package installer; on a desktop host it
//! is whatever program opens files of the package's media type. The trigger
//! only starts the hand-off; the actual installation happens outside this
//! process and its outcome is not observed.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::core::InstallError;

/// Maximum time the launcher may take to accept the hand-off.
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Opens a stored package with the platform installer.
#[async_trait]
pub trait InstallerTrigger: Send + Sync {
    /// Ask the platform to install the package at `locator`.
    async fn install(&self, locator: &Path, media_type: &str) -> Result<(), InstallError>;
}

/// [`InstallerTrigger`] that launches an external program.
///
/// The command is an argv template; `{path}` and `{media_type}` are
/// substituted in every argument. Without a template the desktop opener of
/// the host is used (`open`, `xdg-open`, or `cmd /C start`).
#[derive(Debug, Clone, Default)]
pub struct SystemInstaller {
    command: Option<Vec<String>>,
}

impl SystemInstaller {
    /// Use the host's default opener.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom argv template, e.g. `["adb", "install", "-r", "{path}"]`.
    ///
    /// An empty template falls back to the default opener.
    pub fn with_command(command: Vec<String>) -> Self {
        Self {
            command: if command.is_empty() { None } else { Some(command) },
        }
    }

    /// The argv that would be executed for `locator`.
    pub fn command_line(&self, locator: &Path, media_type: &str) -> Vec<String> {
        let path = locator.display().to_string();
        match &self.command {
            Some(template) => template
                .iter()
                .map(|arg| arg.replace("{path}", &path).replace("{media_type}", media_type))
                .collect(),
            None => default_opener(&path),
        }
    }
}

#[cfg(target_os = "macos")]
fn default_opener(path: &str) -> Vec<String> {
    vec!["open".to_string(), path.to_string()]
}

#[cfg(windows)]
fn default_opener(path: &str) -> Vec<String> {
    vec!["cmd".to_string(), "/C".to_string(), "start".to_string(), String::new(), path.to_string()]
}

#[cfg(not(any(target_os = "macos", windows)))]
fn default_opener(path: &str) -> Vec<String> {
    vec!["xdg-open".to_string(), path.to_string()]
}

#[async_trait]
impl InstallerTrigger for SystemInstaller {
    async fn install(&self, locator: &Path, media_type: &str) -> Result<(), InstallError> {
        if !locator.is_file() {
            return Err(InstallError::MissingArtifact {
                path: locator.display().to_string(),
            });
        }

        let argv = self.command_line(locator, media_type);
        let Some((program, args)) = argv.split_first() else {
            return Err(InstallError::LauncherNotFound {
                program: String::new(),
            });
        };

        let resolved = which::which(program).map_err(|_| InstallError::LauncherNotFound {
            program: program.clone(),
        })?;
        debug!("Launching installer {:?} with args {:?}", resolved, args);

        let child = Command::new(&resolved)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| InstallError::Spawn {
                program: program.clone(),
                reason: e.to_string(),
            })?;

        let output = match timeout(LAUNCH_TIMEOUT, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| InstallError::Spawn {
                program: program.clone(),
                reason: e.to_string(),
            })?,
            Err(_) => {
                warn!("Installer {} did not return within {:?}", program, LAUNCH_TIMEOUT);
                return Err(InstallError::Rejected {
                    code: None,
                    stderr: format!("installer did not return within {}s", LAUNCH_TIMEOUT.as_secs()),
                });
            }
        };

        if !output.status.success() {
            return Err(InstallError::Rejected {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!("Handed {} ({}) to {}", locator.display(), media_type, program);
        Ok(())
    }
}
