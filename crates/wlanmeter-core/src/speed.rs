// ── Speed tester ──
//
// Three sequential sub-tests per run: TCP connect latency/jitter, a
// streamed download and a streamed upload. Each has one deadline set by
// the size class, covering all of its endpoints or samples, raced against the engine's cancellation token, and fails on its
// own: a failed sub-test only leaves its metric absent.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;
use wlanmeter_api::{SpeedClient, Transfer, tcp_round_trip};

use crate::config::{SizeClass, SpeedTestConfig};
use crate::model::SpeedMetrics;

/// Time budget for one latency sample.
pub const LATENCY_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

// ── Statistics ──────────────────────────────────────────────────────

/// Median; the mean of the two middle values for an even count.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Mean absolute difference between consecutive samples, in order.
/// A single sample has zero jitter.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn jitter(values: &[f64]) -> Option<f64> {
    match values {
        [] => None,
        [_] => Some(0.0),
        _ => {
            let total: f64 = values.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
            Some(total / (values.len() - 1) as f64)
        }
    }
}

/// Decimal megabits per second. `None` for an empty or instantaneous
/// transfer.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn throughput_mbps(bytes: u64, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    if bytes == 0 || secs <= 0.0 {
        return None;
    }
    Some(bytes as f64 * 8.0 / (secs * 1_000_000.0))
}

// ── SpeedTester ─────────────────────────────────────────────────────

/// Runs speed tests over one `SpeedClient`.
#[derive(Debug, Clone)]
pub struct SpeedTester {
    client: SpeedClient,
    latency_timeout: Duration,
}

/// Latency sub-test outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencySummary {
    pub ping_ms: Option<f64>,
    pub jitter_ms: Option<f64>,
}

/// A successful download or upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ThroughputResult {
    pub mbps: f64,
    pub transfer: Transfer,
}

impl SpeedTester {
    pub fn new(client: SpeedClient) -> Self {
        Self {
            client,
            latency_timeout: LATENCY_PROBE_TIMEOUT,
        }
    }

    /// Override the per-sample latency timeout.
    pub fn with_latency_timeout(mut self, timeout: Duration) -> Self {
        self.latency_timeout = timeout;
        self
    }

    /// Run all sub-tests in order. `None` when every metric is absent.
    pub async fn run(
        &self,
        config: &SpeedTestConfig,
        cancel: &CancellationToken,
    ) -> Option<SpeedMetrics> {
        let started = Instant::now();
        let mut metrics = SpeedMetrics::default();

        let latency = self
            .measure_latency(
                &config.endpoints.latency_target,
                config.latency_samples,
                config.size.timeout(),
                cancel,
            )
            .await;
        metrics.ping_ms = latency.ping_ms;
        metrics.jitter_ms = latency.jitter_ms;

        if !cancel.is_cancelled() {
            match config.endpoints.download_urls(config.size) {
                Ok(urls) => {
                    if let Some(result) = self.measure_download(&urls, config.size, cancel).await {
                        metrics.download_mbps = Some(result.mbps);
                        metrics.bytes_downloaded = Some(result.transfer.bytes);
                        metrics.server = result.transfer.url.host_str().map(str::to_owned);
                    }
                }
                Err(e) => warn!(error = %e, "download endpoints unusable"),
            }
        }

        if !config.skip_upload && !cancel.is_cancelled() {
            match config.endpoints.upload_urls() {
                Ok(urls) => {
                    if let Some(result) = self.measure_upload(&urls, config.size, cancel).await {
                        metrics.upload_mbps = Some(result.mbps);
                        metrics.bytes_uploaded = Some(result.transfer.bytes);
                    }
                }
                Err(e) => warn!(error = %e, "upload endpoints unusable"),
            }
        }

        metrics.duration_secs = started.elapsed().as_secs_f64();
        if metrics.is_empty() {
            debug!("every speed sub-test failed");
            return None;
        }
        info!(
            download = ?metrics.download_mbps,
            upload = ?metrics.upload_mbps,
            ping = ?metrics.ping_ms,
            jitter = ?metrics.jitter_ms,
            "speed test finished"
        );
        Some(metrics)
    }

    /// Sequential TCP connects to `target`; failed samples are skipped.
    /// Samples still pending when `budget` runs out are dropped.
    pub async fn measure_latency(
        &self,
        target: &str,
        samples: u32,
        budget: Duration,
        cancel: &CancellationToken,
    ) -> LatencySummary {
        let mut rtts_ms = Vec::new();

        let collect = async {
            for attempt in 1..=samples {
                let result = tokio::select! {
                    () = cancel.cancelled() => {
                        debug!("latency test cancelled");
                        break;
                    }
                    r = tcp_round_trip(target, self.latency_timeout) => r,
                };
                match result {
                    Ok(rtt) => rtts_ms.push(rtt.as_secs_f64() * 1000.0),
                    Err(e) => warn!(peer = target, attempt, error = %e, "latency probe failed"),
                }
            }
        };
        if tokio::time::timeout(budget, collect).await.is_err() {
            warn!(peer = target, ?budget, "latency test timed out");
        }

        LatencySummary {
            ping_ms: median(&rtts_ms),
            jitter_ms: jitter(&rtts_ms),
        }
    }

    /// Download from the first endpoint that succeeds, all within the size
    /// class timeout.
    pub async fn measure_download(
        &self,
        urls: &[Url],
        size: SizeClass,
        cancel: &CancellationToken,
    ) -> Option<ThroughputResult> {
        let budget = size.timeout();
        let attempts = async {
            for url in urls {
                let result = tokio::select! {
                    () = cancel.cancelled() => {
                        debug!(endpoint = %url, "download cancelled");
                        return None;
                    }
                    r = self.client.download(url, budget) => r,
                };
                match result {
                    Ok(transfer) => match throughput_mbps(transfer.bytes, transfer.elapsed) {
                        Some(mbps) => return Some(ThroughputResult { mbps, transfer }),
                        None => warn!(endpoint = %url, "download finished without a measurable duration"),
                    },
                    Err(e) => warn!(endpoint = %url, error = %e, "download failed"),
                }
            }
            None
        };
        tokio::time::timeout(budget, attempts).await.unwrap_or_else(|_| {
            warn!(?budget, "download timed out");
            None
        })
    }

    /// Upload the size class payload to the first endpoint that accepts it,
    /// all within the size class timeout.
    pub async fn measure_upload(
        &self,
        urls: &[Url],
        size: SizeClass,
        cancel: &CancellationToken,
    ) -> Option<ThroughputResult> {
        let budget = size.timeout();
        let attempts = async {
            for url in urls {
                let result = tokio::select! {
                    () = cancel.cancelled() => {
                        debug!(endpoint = %url, "upload cancelled");
                        return None;
                    }
                    r = self.client.upload(url, size.bytes(), budget) => r,
                };
                match result {
                    Ok(transfer) => match throughput_mbps(transfer.bytes, transfer.elapsed) {
                        Some(mbps) => return Some(ThroughputResult { mbps, transfer }),
                        None => warn!(endpoint = %url, "upload finished without a measurable duration"),
                    },
                    Err(e) => warn!(endpoint = %url, error = %e, "upload failed"),
                }
            }
            None
        };
        tokio::time::timeout(budget, attempts).await.unwrap_or_else(|_| {
            warn!(?budget, "upload timed out");
            None
        })
    }
}
