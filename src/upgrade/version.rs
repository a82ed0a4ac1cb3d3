//! Version data exchanged with the update server.
//!
//! The oracle speaks the Float API wire format (`version_code`,
//! `version_name`, ...). These types map it onto the names the rest of the
//! crate uses: a release is ordered by its integer build number, never by
//! its display string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{ARTIFACT_PREFIX, CURRENT_BUILD_NUMBER, CURRENT_DISPLAY_VERSION};

/// Target operating system / distribution channel of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Sideloaded Android package, the only self-updating channel by default
    #[default]
    Android,
    /// App Store distributed build
    Ios,
    /// Browser build
    Web,
    /// Release applicable to every platform
    All,
}

impl Platform {
    /// Wire / config name of the platform.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
            Self::Web => "web",
            Self::All => "all",
        }
    }

    /// File extension of this platform's installer package.
    #[must_use]
    pub const fn package_extension(self) -> &'static str {
        match self {
            Self::Android => "apk",
            Self::Ios => "ipa",
            Self::Web => "zip",
            Self::All => "bin",
        }
    }

    /// Media type handed verbatim to the platform installer.
    #[must_use]
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Android => "application/vnd.android.package-archive",
            Self::Web => "application/zip",
            Self::Ios | Self::All => "application/octet-stream",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "android" => Ok(Self::Android),
            "ios" => Ok(Self::Ios),
            "web" => Ok(Self::Web),
            "all" => Ok(Self::All),
            other => Err(format!(
                "unknown platform '{other}' (expected android, ios, web or all)"
            )),
        }
    }
}

/// An installable release as published by the version oracle.
///
/// Only `build_number`, `download_url` and `platform` drive the pipeline;
/// the rest is release metadata shown to the user. `file_hash`, when
/// present, is verified against the downloaded bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Server-side release id.
    #[serde(default)]
    pub id: i64,
    /// Monotonically increasing build number used for comparison.
    #[serde(rename = "version_code")]
    pub build_number: u32,
    /// Human readable version, never used for ordering.
    #[serde(rename = "version_name", default)]
    pub display_version: String,
    /// Absolute or host-relative URL of the installer package.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub download_url: Option<String>,
    /// Platform the package targets.
    #[serde(default)]
    pub platform: Platform,
    /// `major`, `minor`, `patch` or `hotfix`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_type: Option<String>,
    /// Whether the server marks this release as mandatory.
    #[serde(default)]
    pub is_force_update: bool,
    /// Oldest display version the server still supports.
    #[serde(default, deserialize_with = "empty_string_as_none", skip_serializing_if = "Option::is_none")]
    pub min_supported_version: Option<String>,
    /// Release title.
    #[serde(default)]
    pub title: String,
    /// Release description.
    #[serde(default)]
    pub description: String,
    /// Free-form changelog document.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub changelog: serde_json::Value,
    /// Package size announced by the server, in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Hex SHA-256 of the package.
    #[serde(default, deserialize_with = "empty_string_as_none", skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,
    /// Link to human readable release notes.
    #[serde(default, deserialize_with = "empty_string_as_none", skip_serializing_if = "Option::is_none")]
    pub release_notes_url: Option<String>,
    /// Publication time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<DateTime<Utc>>,
}

impl VersionInfo {
    /// Minimal release description, mostly useful for tests and fixtures.
    pub fn new(build_number: u32, download_url: Option<String>, platform: Platform) -> Self {
        Self {
            id: 0,
            build_number,
            display_version: String::new(),
            download_url,
            platform,
            update_type: None,
            is_force_update: false,
            min_supported_version: None,
            title: String::new(),
            description: String::new(),
            changelog: serde_json::Value::Null,
            file_size: None,
            file_hash: None,
            release_notes_url: None,
            release_date: None,
        }
    }

    /// The download URL when it is present and non-blank.
    #[must_use]
    pub fn download_url(&self) -> Option<&str> {
        self.download_url.as_deref().map(str::trim).filter(|url| !url.is_empty())
    }

    /// Deterministic file name of this release's package.
    #[must_use]
    pub fn artifact_file_name(&self) -> String {
        artifact_file_name(self.build_number, self.platform)
    }

    /// `display_version (build N)`, or just the build when unnamed.
    #[must_use]
    pub fn label(&self) -> String {
        if self.display_version.is_empty() {
            format!("build {}", self.build_number)
        } else {
            format!("{} (build {})", self.display_version, self.build_number)
        }
    }
}

/// `update_<build>.<ext>`: repeated downloads of one build overwrite each other.
#[must_use]
pub fn artifact_file_name(build_number: u32, platform: Platform) -> String {
    format!("{ARTIFACT_PREFIX}{build_number}.{}", platform.package_extension())
}

/// The build this process is running.
///
/// Read-only for the lifetime of the process; it is the comparison
/// baseline and a request parameter of every check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentVersion {
    /// Build number of the running client.
    pub build_number: u32,
    /// Display version of the running client.
    pub display_version: String,
    /// Platform of the running client.
    pub platform: Platform,
}

impl Default for CurrentVersion {
    fn default() -> Self {
        Self {
            build_number: CURRENT_BUILD_NUMBER,
            display_version: CURRENT_DISPLAY_VERSION.to_string(),
            platform: Platform::Android,
        }
    }
}

impl CurrentVersion {
    /// Whether `candidate` is strictly newer than the running build.
    #[must_use]
    pub const fn is_older_than(&self, candidate: &VersionInfo) -> bool {
        candidate.build_number > self.build_number
    }
}

/// Answer of `GET /app-updates/check`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CheckUpdateResponse {
    /// Whether the server considers a newer build available.
    #[serde(default)]
    pub has_update: bool,
    /// The newest build, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<VersionInfo>,
    /// Whether the newest build is mandatory.
    #[serde(default)]
    pub force_update: bool,
    /// Server supplied explanation for the update.
    #[serde(default, deserialize_with = "empty_string_as_none", skip_serializing_if = "Option::is_none")]
    pub update_reason: Option<String>,
}

/// A payload either returned bare or wrapped as `{ code, message, data }`.
///
/// `data` must be present for the wrapped form to match, even when `T` is
/// an `Option`; otherwise any bare object would decode as `data: None`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Wrapped {
        #[serde(deserialize_with = "required")]
        data: T,
    },
    Bare(T),
}

impl<T> Envelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Self::Wrapped {
                data,
            } => data,
            Self::Bare(data) => data,
        }
    }
}

fn required<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
