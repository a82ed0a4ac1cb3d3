//! URL construction for the update server.
//!
//! The version oracle lives under the API base (`.../api/v1`), while
//! packages are served from the same host without the API prefix. Release
//! metadata usually carries a host-relative `download_url`, so it has to be
//! resolved against that asset base before the transfer engine can use it.

use reqwest::Url;

use crate::constants::{API_PATH_PREFIX, DEFAULT_API_BASE_URL};

/// Base URLs of the update server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEndpoints {
    api_base: String,
    asset_base: String,
}

impl Default for UpdateEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL, None)
    }
}

impl UpdateEndpoints {
    /// Build endpoints from an API base and an optional explicit asset base.
    ///
    /// Without an asset base, `/api/v1` is stripped from the API base.
    pub fn new(api_base: &str, asset_base: Option<&str>) -> Self {
        let api_base = api_base.trim().trim_end_matches('/').to_string();
        let asset_base = match asset_base.map(str::trim).filter(|s| !s.is_empty()) {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => api_base
                .strip_suffix(API_PATH_PREFIX)
                .unwrap_or(&api_base)
                .trim_end_matches('/')
                .to_string(),
        };

        Self {
            api_base,
            asset_base,
        }
    }

    /// The API base, without trailing slash.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// The host packages are served from, without trailing slash.
    #[must_use]
    pub fn asset_base(&self) -> &str {
        &self.asset_base
    }

    /// URL of an API route such as `app-updates/check`.
    pub fn api_url(&self, route: &str) -> Result<Url, String> {
        let joined = format!("{}/{}", self.api_base, route.trim_start_matches('/'));
        Url::parse(&joined).map_err(|e| e.to_string())
    }

    /// Resolve a release's `download_url`.
    ///
    /// Absolute `http(s)` URLs pass through unchanged; anything else is
    /// appended to the asset base.
    pub fn asset_url(&self, download_url: &str) -> Result<Url, String> {
        let download_url = download_url.trim();
        if download_url.is_empty() {
            return Err("empty download URL".to_string());
        }

        if download_url.starts_with("http://") || download_url.starts_with("https://") {
            return Url::parse(download_url).map_err(|e| e.to_string());
        }

        let joined = format!("{}/{}", self.asset_base, download_url.trim_start_matches('/'));
        Url::parse(&joined).map_err(|e| e.to_string())
    }
}
