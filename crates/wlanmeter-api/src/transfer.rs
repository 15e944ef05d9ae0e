// Timed HTTP transfers
//
// Wraps `reqwest::Client` with the two measurements the speed tester needs:
// a streamed download and a streamed upload. Both return raw byte counts and
// the timed window; converting to Mbit/s is the caller's job.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Upload chunk size (64 KiB). Bounds memory for large payloads.
const CHUNK_SIZE: usize = 64 * 1024;

/// Raw outcome of one timed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// Endpoint that served the transfer.
    pub url: Url,
    /// Payload bytes moved (body only, no headers).
    pub bytes: u64,
    /// Timed window, excluding connection setup.
    pub elapsed: Duration,
}

/// HTTP client for timed speed-test transfers.
///
/// One instance per measurement engine. The client never keeps idle
/// connections, so every transfer starts cold.
#[derive(Debug, Clone)]
pub struct SpeedClient {
    http: reqwest::Client,
}

impl SpeedClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
        })
    }

    /// Create a client with a pre-built `reqwest::Client` (tests, custom stacks).
    pub fn from_reqwest(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Download `url` to the void, counting body bytes.
    ///
    /// The clock starts when response headers arrive, so DNS, TCP/TLS setup
    /// and server think-time are excluded, and stops after the last chunk.
    pub async fn download(&self, url: &Url, timeout: Duration) -> Result<Transfer, Error> {
        debug!(%url, ?timeout, "starting download");

        let transfer = async {
            let response = self.http.get(url.clone()).send().await?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let start = Instant::now();
            let mut bytes: u64 = 0;
            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                bytes += chunk?.len() as u64;
            }
            let elapsed = start.elapsed();

            if bytes == 0 {
                return Err(Error::EmptyTransfer {
                    url: url.to_string(),
                });
            }

            trace!(bytes, ?elapsed, "download finished");
            Ok::<_, Error>(Transfer {
                url: url.clone(),
                bytes,
                elapsed,
            })
        };

        tokio::time::timeout(timeout, transfer)
            .await
            .map_err(|_| Error::Timeout { timeout })?
    }

    /// Upload `size` bytes of generated payload to `url`.
    ///
    /// The payload is streamed in fixed chunks and never held in memory as a
    /// whole. The clock starts when the HTTP stack pulls the first chunk
    /// (connection already established) and stops when response headers
    /// arrive.
    pub async fn upload(&self, url: &Url, size: u64, timeout: Duration) -> Result<Transfer, Error> {
        debug!(%url, size, ?timeout, "starting upload");

        let first_chunk_at: Arc<OnceLock<Instant>> = Arc::default();
        let body = reqwest::Body::wrap_stream(payload_stream(size, Arc::clone(&first_chunk_at)));

        let transfer = async {
            let response = self
                .http
                .post(url.clone())
                .header(CONTENT_TYPE, "application/octet-stream")
                .header(CONTENT_LENGTH, size)
                .body(body)
                .send()
                .await?;
            let finished = Instant::now();

            let status = response.status();
            if !status.is_success() {
                return Err(Error::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let Some(started) = first_chunk_at.get().copied() else {
                return Err(Error::EmptyTransfer {
                    url: url.to_string(),
                });
            };
            let elapsed = finished.duration_since(started);

            trace!(bytes = size, ?elapsed, "upload finished");
            Ok::<_, Error>(Transfer {
                url: url.clone(),
                bytes: size,
                elapsed,
            })
        };

        tokio::time::timeout(timeout, transfer)
            .await
            .map_err(|_| Error::Timeout { timeout })?
    }
}

/// Deterministic upload payload of exactly `size` bytes, produced lazily.
///
/// Records the instant the first chunk is pulled into `first_chunk_at`.
fn payload_stream(
    size: u64,
    first_chunk_at: Arc<OnceLock<Instant>>,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    let pattern: Bytes = (0..CHUNK_SIZE).map(|i| (i % 256) as u8).collect::<Vec<u8>>().into();

    stream::unfold(size, move |remaining| {
        let pattern = pattern.clone();
        let first_chunk_at = Arc::clone(&first_chunk_at);
        async move {
            if remaining == 0 {
                return None;
            }
            first_chunk_at.get_or_init(Instant::now);
            let len = usize::try_from(remaining).map_or(CHUNK_SIZE, |r| r.min(CHUNK_SIZE));
            Some((Ok(pattern.slice(..len)), remaining - len as u64))
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn payload_stream_yields_exact_size() {
        let started = Arc::new(OnceLock::new());
        let chunks: Vec<Bytes> = payload_stream(150_000, Arc::clone(&started))
            .map(|c| c.unwrap())
            .collect()
            .await;

        let total: usize = chunks.iter().map(Bytes::len).sum();
        assert_eq!(total, 150_000);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() <= CHUNK_SIZE));
        assert!(started.get().is_some());
    }

    #[tokio::test]
    async fn empty_payload_never_starts_the_clock() {
        let started = Arc::new(OnceLock::new());
        let chunks: Vec<_> = payload_stream(0, Arc::clone(&started)).collect().await;
        assert!(chunks.is_empty());
        assert!(started.get().is_none());
    }
}
