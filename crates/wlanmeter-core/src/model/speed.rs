// ── Speed test domain types ──

use serde::{Deserialize, Serialize};

use super::{serialize_round2, serialize_round2_opt};

/// End-to-end throughput and latency for one tick.
///
/// Each metric is absent when its sub-test failed or was skipped. A value
/// with every metric absent is never constructed by the speed tester.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeedMetrics {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_round2_opt"
    )]
    pub download_mbps: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_round2_opt"
    )]
    pub upload_mbps: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_round2_opt"
    )]
    pub ping_ms: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_round2_opt"
    )]
    pub jitter_ms: Option<f64>,

    // Supplemental transfer details
    /// Host that served the download.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_downloaded: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_uploaded: Option<u64>,
    /// Wall time of the whole speed test.
    #[serde(default, serialize_with = "serialize_round2")]
    pub duration_secs: f64,
}

impl SpeedMetrics {
    /// `true` when no measured metric is present.
    pub fn is_empty(&self) -> bool {
        self.download_mbps.is_none()
            && self.upload_mbps.is_none()
            && self.ping_ms.is_none()
            && self.jitter_ms.is_none()
    }
}
