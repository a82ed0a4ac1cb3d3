//! The version oracle: the server-side authority on the latest build.
//!
//! [`VersionOracle`] is the seam the update controller talks to.
//! [`HttpVersionOracle`] implements it over the Float API:
//!
//! | Route | Query | Answer |
//! |-------|-------|--------|
//! | `GET app-updates/check` | `platform`, `version_code` | [`CheckUpdateResponse`] |
//! | `GET app-updates/latest` | `platform` | [`VersionInfo`], 404 when none |
//! | `GET app-updates/history` | `platform` | up to 20 [`VersionInfo`] |
//!
//! Every answer may arrive bare or wrapped in a `{ code, message, data }`
//! envelope. The oracle only reports what the server says; whether an update
//! is actually offered to the user is decided by the controller.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::endpoints::UpdateEndpoints;
use super::version::{CheckUpdateResponse, Envelope, Platform, VersionInfo};
use crate::constants::user_agent;
use crate::core::CheckError;

/// Source of truth for published builds.
#[async_trait]
pub trait VersionOracle: Send + Sync {
    /// Ask whether a build newer than `build_number` exists for `platform`.
    async fn check(
        &self,
        platform: Platform,
        build_number: u32,
    ) -> Result<CheckUpdateResponse, CheckError>;

    /// The newest published build for `platform`, if any.
    async fn latest(&self, platform: Platform) -> Result<Option<VersionInfo>, CheckError>;

    /// Recently published builds for `platform`, newest first.
    async fn history(&self, platform: Platform) -> Result<Vec<VersionInfo>, CheckError>;
}

/// [`VersionOracle`] backed by the Float HTTP API.
#[derive(Debug, Clone)]
pub struct HttpVersionOracle {
    client: Client,
    endpoints: UpdateEndpoints,
}

impl HttpVersionOracle {
    /// Create an oracle for `endpoints` whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Fails when the TLS backend cannot be initialised.
    pub fn new(endpoints: UpdateEndpoints, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).user_agent(user_agent()).build()?;
        Ok(Self {
            client,
            endpoints,
        })
    }

    /// The endpoints this oracle queries.
    pub fn endpoints(&self) -> &UpdateEndpoints {
        &self.endpoints
    }

    fn route(&self, route: &str) -> Result<Url, CheckError> {
        self.endpoints.api_url(route).map_err(|reason| CheckError::InvalidUrl {
            url: format!("{}/{}", self.endpoints.api_base(), route),
            reason,
        })
    }

    /// GET `url` and decode the (possibly enveloped) JSON body.
    ///
    /// Returns `Ok(None)` on 404 so callers can treat "nothing published"
    /// as an answer rather than a failure.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<Option<T>, CheckError> {
        debug!("GET {} {:?}", url, query);
        let display_url = url.to_string();

        let response = self.client.get(url).query(query).send().await.map_err(|e| {
            CheckError::Transport {
                url: display_url.clone(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CheckError::Status {
                url: display_url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| CheckError::Transport {
            url: display_url.clone(),
            reason: e.to_string(),
        })?;
        let envelope: Envelope<T> =
            serde_json::from_slice(&body).map_err(|e| CheckError::Parse {
                url: display_url,
                reason: e.to_string(),
            })?;
        Ok(Some(envelope.into_inner()))
    }
}

#[async_trait]
impl VersionOracle for HttpVersionOracle {
    async fn check(
        &self,
        platform: Platform,
        build_number: u32,
    ) -> Result<CheckUpdateResponse, CheckError> {
        let url = self.route("app-updates/check")?;
        let display_url = url.to_string();
        let query = [("platform", platform.to_string()), ("version_code", build_number.to_string())];

        // A 404 here means the route itself is missing, not "no update".
        self.get_json(url, &query).await?.ok_or(CheckError::Status {
            url: display_url,
            status: StatusCode::NOT_FOUND.as_u16(),
        })
    }

    async fn latest(&self, platform: Platform) -> Result<Option<VersionInfo>, CheckError> {
        let url = self.route("app-updates/latest")?;
        let latest: Option<Option<VersionInfo>> =
            self.get_json(url, &[("platform", platform.to_string())]).await?;
        Ok(latest.flatten())
    }

    async fn history(&self, platform: Platform) -> Result<Vec<VersionInfo>, CheckError> {
        let url = self.route("app-updates/history")?;
        let versions: Option<Option<Vec<VersionInfo>>> =
            self.get_json(url, &[("platform", platform.to_string())]).await?;
        Ok(versions.flatten().unwrap_or_default())
    }
}
