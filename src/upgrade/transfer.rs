//! The transfer engine: streams an installer package into memory.
//!
//! The engine reports progress while bytes arrive and can be abandoned at
//! any point through a [`CancellationToken`]. It hands back the raw bytes;
//! encoding for storage is the store's business, not the engine's.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Url};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::endpoints::UpdateEndpoints;
use crate::constants::user_agent;
use crate::core::TransferError;

/// Bytes received so far, and the announced total when the server sent one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    /// Bytes received so far
    pub received: u64,
    /// `Content-Length` of the response, if known
    pub total: Option<u64>,
}

impl TransferProgress {
    /// Completion as `round(received * 100 / total)`, capped at 100.
    ///
    /// `None` when the total is unknown or zero.
    #[must_use]
    pub fn percent(&self) -> Option<u8> {
        let total = self.total.filter(|total| *total > 0)?;
        let scaled = (u128::from(self.received) * 100 + u128::from(total) / 2) / u128::from(total);
        Some(scaled.min(100) as u8)
    }
}

/// Callback receiving [`TransferProgress`] updates.
pub type ProgressSink = dyn Fn(TransferProgress) + Send + Sync;

/// Moves a package from a URL into memory.
#[async_trait]
pub trait TransferEngine: Send + Sync {
    /// Download `url` completely.
    ///
    /// `progress` is invoked as chunks arrive. Once `cancel` fires the
    /// transfer stops and returns [`TransferError::Cancelled`].
    async fn fetch(
        &self,
        url: &str,
        progress: &ProgressSink,
        cancel: CancellationToken,
    ) -> Result<Vec<u8>, TransferError>;
}

/// [`TransferEngine`] over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpTransferEngine {
    client: Client,
    endpoints: UpdateEndpoints,
    max_bytes: u64,
}

impl HttpTransferEngine {
    /// Create an engine resolving relative URLs against `endpoints`.
    ///
    /// `connect_timeout` bounds connection setup and `read_timeout` bounds
    /// the gap between two reads; there is no overall deadline, so large
    /// packages on slow links still complete.
    ///
    /// # Errors
    ///
    /// Fails when the TLS backend cannot be initialised.
    pub fn new(
        endpoints: UpdateEndpoints,
        connect_timeout: Duration,
        read_timeout: Duration,
        max_bytes: u64,
    ) -> reqwest::Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .user_agent(user_agent())
            .build()?;

        Ok(Self {
            client,
            endpoints,
            max_bytes,
        })
    }

    fn resolve(&self, url: &str) -> Result<Url, TransferError> {
        self.endpoints.asset_url(url).map_err(|reason| TransferError::InvalidUrl {
            url: url.to_string(),
            reason,
        })
    }

    async fn download(&self, url: Url, progress: &ProgressSink) -> Result<Vec<u8>, TransferError> {
        let display_url = url.to_string();

        debug!("Starting download from {}", display_url);
        let response =
            self.client.get(url).send().await.map_err(|e| transport_error(&display_url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                url: display_url,
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        if let Some(total) = total
            && total > self.max_bytes
        {
            return Err(TransferError::TooLarge {
                url: display_url,
                limit: self.max_bytes,
            });
        }

        let capacity = total.unwrap_or(0).min(self.max_bytes);
        let mut buffer = Vec::with_capacity(usize::try_from(capacity).unwrap_or(0));
        let mut received: u64 = 0;
        progress(TransferProgress {
            received,
            total,
        });

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| transport_error(&display_url, &e))?;
            received += chunk.len() as u64;
            if received > self.max_bytes {
                return Err(TransferError::TooLarge {
                    url: display_url,
                    limit: self.max_bytes,
                });
            }
            buffer.extend_from_slice(&chunk);
            progress(TransferProgress {
                received,
                total,
            });
        }

        if let Some(expected) = total
            && received < expected
        {
            return Err(TransferError::Incomplete {
                url: display_url,
                expected,
                received,
            });
        }

        info!("Downloaded {} bytes from {}", received, display_url);
        Ok(buffer)
    }
}

fn transport_error(url: &str, error: &reqwest::Error) -> TransferError {
    if error.is_timeout() {
        TransferError::TimedOut {
            url: url.to_string(),
        }
    } else {
        TransferError::Connection {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }
}

#[async_trait]
impl TransferEngine for HttpTransferEngine {
    async fn fetch(
        &self,
        url: &str,
        progress: &ProgressSink,
        cancel: CancellationToken,
    ) -> Result<Vec<u8>, TransferError> {
        let url = self.resolve(url)?;

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Download of {} cancelled", url);
                Err(TransferError::Cancelled)
            }
            result = self.download(url.clone(), progress) => result,
        }
    }
}
