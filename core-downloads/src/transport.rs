//! Media transfer boundary.
//!
//! `MediaTransport` abstracts the byte transfer from the remote media host so
//! the manager can be tested with deterministic doubles. The production
//! implementation streams over HTTP with byte-range resume.

use crate::error::{DownloadError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// An open media transfer.
pub struct MediaStream {
    /// Total size of the media in bytes, when the remote reports it.
    pub total_bytes: Option<u64>,
    /// Byte offset the remote actually honored. Zero means the transfer
    /// restarts from scratch even if an offset was requested.
    pub resumed_from: u64,
    /// The chunked body.
    pub body: BoxStream<'static, Result<Bytes>>,
}

/// Boundary over the byte transfer for one media file.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Open a transfer for `url`, asking the remote to start at `offset`.
    ///
    /// Implementations that cannot resume return a stream with
    /// `resumed_from == 0`; callers must then restart from scratch.
    async fn open(&self, url: &str, offset: u64) -> Result<MediaStream>;
}

/// HTTP implementation of [`MediaTransport`] using `reqwest`.
///
/// Sends a `Range` header when asked to resume; a `206 Partial Content`
/// response continues from the requested offset, while a `200 OK` means the
/// server ignored the range and the transfer restarts from zero.
pub struct HttpMediaTransport {
    client: Client,
}

impl HttpMediaTransport {
    /// Create a transport with a default client configuration.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent("heritage-media-core/0.1.0")
            .build()
            .map_err(|e| DownloadError::Transport(format!("HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Create a transport with a caller-configured `reqwest::Client`.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MediaTransport for HttpMediaTransport {
    async fn open(&self, url: &str, offset: u64) -> Result<MediaStream> {
        let mut request = self.client.get(url);
        if offset > 0 {
            request = request.header(header::RANGE, format!("bytes={}-", offset));
        }

        let response = request
            .send()
            .await
            .map_err(|e| DownloadError::Transport(e.to_string()))?;

        let status = response.status();
        let (resumed_from, total_bytes) = match status {
            StatusCode::PARTIAL_CONTENT => {
                let total = response
                    .headers()
                    .get(header::CONTENT_RANGE)
                    .and_then(|value| value.to_str().ok())
                    .and_then(parse_content_range_total)
                    .or_else(|| response.content_length().map(|len| offset + len));
                debug!(url, offset, ?total, "Resuming transfer from byte offset");
                (offset, total)
            }
            status if status.is_success() => {
                if offset > 0 {
                    warn!(url, offset, "Server ignored range request; restarting from zero");
                }
                (0, response.content_length())
            }
            status => {
                return Err(DownloadError::Transport(format!(
                    "HTTP {} from media host",
                    status.as_u16()
                )));
            }
        };

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| DownloadError::Transport(e.to_string())))
            .boxed();

        Ok(MediaStream {
            total_bytes,
            resumed_from,
            body,
        })
    }
}

/// Parse the total size out of a `Content-Range` header value, e.g.
/// `bytes 500-999/1000` -> `1000`. An unknown total (`bytes 0-499/*`)
/// yields `None`.
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}
