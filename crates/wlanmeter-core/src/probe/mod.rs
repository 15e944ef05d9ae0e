// ── WLAN probe ──
//
// One capability ("read the current link") behind `LinkInfoSource`, with
// one implementation per platform tool. Sources return a raw
// `LinkReading`; `normalize` turns it into `WlanMetrics` or rejects it.
// Every failure on the way is "unavailable" to callers, never an error.

pub mod airport;
pub mod command;
pub mod iw;
pub mod netsh;

use std::time::Duration;

use futures_util::future::BoxFuture;
use thiserror::Error;
use tracing::{debug, trace};

use crate::classify::{classify, pct_to_dbm};
use crate::config::ProbeConfig;
use crate::model::{Band, SignalSource, WlanMetrics, channel_to_frequency, frequency_to_channel};

pub use airport::AirportSource;
pub use command::CommandRunner;
pub use iw::IwSource;
pub use netsh::NetshSource;

// ── ProbeError ──────────────────────────────────────────────────────

/// Why a probe produced no metrics. Logged, never returned past `WlanProbe`.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{program} is not installed")]
    ToolMissing { program: String },

    #[error("{program} exited with {status}")]
    ToolFailed { program: String, status: String },

    #[error("{program} did not finish within {timeout:?}")]
    ToolTimeout { program: String, timeout: Duration },

    #[error("Failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No wireless interface found")]
    NoInterface,

    #[error("Not associated with an access point")]
    NotConnected,

    #[error("Link reading incomplete: no {missing}")]
    Incomplete { missing: &'static str },

    #[error("WLAN probing is not supported on {os}")]
    Unsupported { os: String },
}

// ── LinkReading ─────────────────────────────────────────────────────

/// Raw, unvalidated link info as one platform tool reports it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkReading {
    pub interface: Option<String>,
    pub ssid: Option<String>,
    pub bssid: Option<String>,
    pub signal_dbm: Option<i32>,
    /// Platform-native quality percentage.
    pub signal_pct: Option<u8>,
    pub noise_dbm: Option<i32>,
    pub channel: Option<u16>,
    pub frequency_mhz: Option<u32>,
    pub band: Option<Band>,
    /// Rate the platform treats as "the" link speed.
    pub link_speed_mbps: Option<f64>,
    pub tx_rate_mbps: Option<f64>,
    pub rx_rate_mbps: Option<f64>,
    pub radio_type: Option<String>,
    pub security: Option<String>,
}

// ── LinkInfoSource ──────────────────────────────────────────────────

/// Platform backend for "get current link info".
///
/// Implementations:
/// - [`IwSource`]: Linux, `iw` plus optional `iwconfig`.
/// - [`NetshSource`]: Windows, `netsh wlan show interfaces`.
/// - [`AirportSource`]: macOS, `airport -I`.
pub trait LinkInfoSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Query the OS once. Read-only.
    fn read_link(&self) -> BoxFuture<'_, Result<LinkReading, ProbeError>>;
}

/// Stand-in for platforms without a backend; always unavailable.
#[derive(Debug, Clone)]
pub struct UnsupportedPlatform {
    os: &'static str,
}

impl LinkInfoSource for UnsupportedPlatform {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn read_link(&self) -> BoxFuture<'_, Result<LinkReading, ProbeError>> {
        let os = self.os.to_owned();
        Box::pin(async move { Err(ProbeError::Unsupported { os }) })
    }
}

// ── Normalization ───────────────────────────────────────────────────

/// Turn a raw reading into metrics, or name what is missing.
///
/// Requires a non-empty SSID, a signal (dBm or percentage), a channel or a
/// frequency to derive it from, and a link speed.
pub fn normalize(reading: LinkReading) -> Result<WlanMetrics, ProbeError> {
    let ssid = reading
        .ssid
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .ok_or(ProbeError::Incomplete { missing: "SSID" })?;

    let (signal_dbm, signal_source) = match (reading.signal_dbm, reading.signal_pct) {
        (Some(dbm), _) => (dbm, SignalSource::Reported),
        (None, Some(pct)) => (pct_to_dbm(pct), SignalSource::Approximated),
        (None, None) => return Err(ProbeError::Incomplete { missing: "signal" }),
    };
    let (quality_rating, signal_pct) = classify(signal_dbm);

    let frequency_mhz = reading
        .frequency_mhz
        .or_else(|| reading.channel.and_then(|ch| channel_to_frequency(ch, reading.band)));
    let channel = reading
        .channel
        .or_else(|| frequency_mhz.and_then(frequency_to_channel))
        .ok_or(ProbeError::Incomplete { missing: "channel" })?;
    let band = reading
        .band
        .or_else(|| frequency_mhz.and_then(Band::from_frequency))
        .or_else(|| Band::from_channel(channel));

    let link_speed_mbps = reading
        .link_speed_mbps
        .or(reading.tx_rate_mbps)
        .or(reading.rx_rate_mbps)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or(ProbeError::Incomplete {
            missing: "link speed",
        })?;

    // Only a measured dBm; an approximated one would make up the ratio.
    let snr_db = reading
        .noise_dbm
        .filter(|_| signal_source == SignalSource::Reported)
        .map(|noise| signal_dbm - noise);

    Ok(WlanMetrics {
        ssid,
        signal_dbm,
        signal_pct,
        quality_rating,
        link_speed_mbps,
        channel,
        band,
        snr_db,
        interface: reading.interface,
        bssid: reading.bssid.filter(|b| !b.is_empty()),
        frequency_mhz,
        noise_dbm: reading.noise_dbm,
        tx_rate_mbps: reading.tx_rate_mbps,
        rx_rate_mbps: reading.rx_rate_mbps,
        radio_type: reading.radio_type.filter(|r| !r.is_empty()),
        security: reading.security.filter(|s| !s.is_empty()),
        signal_source,
        reported_pct: reading.signal_pct,
    })
}

// ── WlanProbe ───────────────────────────────────────────────────────

/// Bounded-time WLAN probe over one `LinkInfoSource`.
pub struct WlanProbe {
    source: Box<dyn LinkInfoSource>,
    timeout: Duration,
}

impl std::fmt::Debug for WlanProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WlanProbe")
            .field("source", &self.source.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl WlanProbe {
    /// Probe with an explicit source (tests, custom backends).
    pub fn new(source: Box<dyn LinkInfoSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Pick the backend for the OS this binary runs on.
    pub fn for_current_platform(config: &ProbeConfig) -> Self {
        Self::for_os(std::env::consts::OS, config)
    }

    /// Pick the backend for a named OS (`linux`, `windows`, `macos`).
    pub fn for_os(os: &'static str, config: &ProbeConfig) -> Self {
        let runner = CommandRunner::new(config.command_timeout);
        let source: Box<dyn LinkInfoSource> = match os {
            "linux" => Box::new(IwSource::new(runner, config.interface.clone())),
            "windows" => Box::new(NetshSource::new(runner)),
            "macos" => Box::new(AirportSource::new(runner)),
            other => Box::new(UnsupportedPlatform { os: other }),
        };
        debug!(os, source = source.name(), "selected WLAN source");
        Self::new(source, config.probe_timeout)
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Read and normalize the current link. `None` when unavailable for any
    /// reason, including the probe timeout.
    pub async fn probe(&self) -> Option<WlanMetrics> {
        let reading = match tokio::time::timeout(self.timeout, self.source.read_link()).await {
            Ok(Ok(reading)) => reading,
            Ok(Err(e)) => {
                debug!(source = self.source.name(), error = %e, "WLAN unavailable");
                return None;
            }
            Err(_) => {
                debug!(
                    source = self.source.name(),
                    timeout = ?self.timeout,
                    "WLAN probe timed out"
                );
                return None;
            }
        };
        trace!(?reading, "raw link reading");

        match normalize(reading) {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                debug!(source = self.source.name(), error = %e, "WLAN reading rejected");
                None
            }
        }
    }
}

// ── Text helpers shared by the parsers ──────────────────────────────

/// Split a `key : value` line at the first colon. Both halves are trimmed;
/// lines without a colon or with an empty key yield `None`.
pub(crate) fn split_kv(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

/// Leading number of a value such as `866.7 MBit/s`, `-52 dBm` or `144,4`.
pub(crate) fn leading_f64(value: &str) -> Option<f64> {
    let value = value.trim();
    let end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || c == ',' || (i == 0 && c == '-')))
        .map_or(value.len(), |(i, _)| i);
    value.get(..end)?.replace(',', ".").parse().ok()
}

/// Leading integer of a value such as `-52 dBm` or `84%`.
pub(crate) fn leading_i32(value: &str) -> Option<i32> {
    let value = value.trim();
    let end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && c == '-')))
        .map_or(value.len(), |(i, _)| i);
    value.get(..end)?.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::classify::QualityRating;

    fn complete() -> LinkReading {
        LinkReading {
            ssid: Some("HomeNet".into()),
            signal_dbm: Some(-58),
            channel: Some(36),
            link_speed_mbps: Some(866.7),
            ..LinkReading::default()
        }
    }

    #[test]
    fn reported_dbm_is_classified() {
        let metrics = normalize(complete()).unwrap();
        assert_eq!(metrics.signal_dbm, -58);
        assert_eq!(metrics.signal_pct, 80);
        assert_eq!(metrics.quality_rating, QualityRating::VeryGood);
        assert_eq!(metrics.signal_source, SignalSource::Reported);
        assert_eq!(metrics.frequency_mhz, Some(5180));
        assert_eq!(metrics.band, Some(Band::Ghz5));
    }

    #[test]
    fn percentage_only_is_approximated() {
        let metrics = normalize(LinkReading {
            signal_dbm: None,
            signal_pct: Some(84),
            ..complete()
        })
        .unwrap();
        assert_eq!(metrics.signal_dbm, -58);
        assert_eq!(metrics.signal_source, SignalSource::Approximated);
        assert_eq!(metrics.reported_pct, Some(84));
        assert_eq!(metrics.signal_pct, 80);
    }

    #[test]
    fn native_percentage_never_overrides_tier() {
        let metrics = normalize(LinkReading {
            signal_dbm: Some(-75),
            signal_pct: Some(90),
            ..complete()
        })
        .unwrap();
        assert_eq!(metrics.signal_pct, 20);
        assert_eq!(metrics.quality_rating, QualityRating::Weak);
        assert_eq!(metrics.reported_pct, Some(90));
    }

    #[test]
    fn snr_needs_both_signal_and_noise() {
        let with_noise = normalize(LinkReading {
            noise_dbm: Some(-92),
            ..complete()
        })
        .unwrap();
        assert_eq!(with_noise.snr_db, Some(34));
        assert_eq!(normalize(complete()).unwrap().snr_db, None);

        // iwconfig without iw: Link Quality plus Noise level, no dBm.
        let approximated = normalize(LinkReading {
            signal_dbm: None,
            signal_pct: Some(60),
            noise_dbm: Some(-95),
            ..complete()
        })
        .unwrap();
        assert_eq!(approximated.signal_source, SignalSource::Approximated);
        assert_eq!(approximated.signal_dbm, -70);
        assert_eq!(approximated.noise_dbm, Some(-95));
        assert_eq!(approximated.snr_db, None);
    }

    #[test]
    fn channel_derived_from_frequency() {
        let metrics = normalize(LinkReading {
            channel: None,
            frequency_mhz: Some(2437),
            ..complete()
        })
        .unwrap();
        assert_eq!(metrics.channel, 6);
        assert_eq!(metrics.band, Some(Band::Ghz2_4));
    }

    #[test]
    fn reported_band_wins() {
        let metrics = normalize(LinkReading {
            channel: Some(37),
            band: Some(Band::Ghz6),
            ..complete()
        })
        .unwrap();
        assert_eq!(metrics.band, Some(Band::Ghz6));
        assert_eq!(metrics.frequency_mhz, Some(6135));
    }

    #[test]
    fn unknown_band_stays_absent() {
        let metrics = normalize(LinkReading {
            channel: Some(20),
            ..complete()
        })
        .unwrap();
        assert_eq!(metrics.band, None);
    }

    #[test]
    fn channel_shared_by_5_and_6_ghz_leaves_band_absent() {
        let metrics = normalize(LinkReading {
            channel: Some(149),
            ..complete()
        })
        .unwrap();
        assert_eq!(metrics.channel, 149);
        assert_eq!(metrics.band, None);
        assert_eq!(metrics.frequency_mhz, None);

        let metrics = normalize(LinkReading {
            channel: Some(37),
            ..complete()
        })
        .unwrap();
        assert_eq!(metrics.band, Some(Band::Ghz6));
        assert_eq!(metrics.frequency_mhz, Some(6135));
    }

    #[test]
    fn incomplete_readings_are_rejected() {
        let missing = |reading: LinkReading| match normalize(reading) {
            Err(ProbeError::Incomplete { missing }) => missing,
            other => panic!("expected Incomplete, got {other:?}"),
        };
        assert_eq!(
            missing(LinkReading {
                ssid: Some("  ".into()),
                ..complete()
            }),
            "SSID"
        );
        assert_eq!(
            missing(LinkReading {
                signal_dbm: None,
                ..complete()
            }),
            "signal"
        );
        assert_eq!(
            missing(LinkReading {
                channel: None,
                ..complete()
            }),
            "channel"
        );
        assert_eq!(
            missing(LinkReading {
                link_speed_mbps: None,
                ..complete()
            }),
            "link speed"
        );
    }

    #[test]
    fn number_prefixes() {
        assert_eq!(leading_i32("-52 dBm"), Some(-52));
        assert_eq!(leading_i32("84%"), Some(84));
        assert_eq!(leading_i32("n/a"), None);
        assert_eq!(leading_f64("866.7 MBit/s"), Some(866.7));
        assert_eq!(leading_f64("144,4"), Some(144.4));
        assert_eq!(split_kv("    SSID                   : Cafe: Guest"), Some(("SSID", "Cafe: Guest")));
        assert_eq!(split_kv("no separator"), None);
    }

    #[tokio::test]
    async fn unsupported_platform_is_unavailable() {
        let probe = WlanProbe::for_os("plan9", &ProbeConfig::default());
        assert_eq!(probe.source_name(), "unsupported");
        assert!(probe.probe().await.is_none());
    }
}
