// ── Runtime measurement configuration ──
//
// These types describe *what* a tick measures and how hard it may try.
// They never touch disk: `wlanmeter-config` loads files and environment,
// validates, and hands finished values in.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;
use wlanmeter_api::TransportConfig;

use crate::error::CoreError;

/// Placeholder in download endpoint templates replaced by the byte count.
pub const BYTES_PLACEHOLDER: &str = "{bytes}";

pub const DEFAULT_DOWNLOAD_ENDPOINT: &str = "https://speed.cloudflare.com/__down?bytes={bytes}";
pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://speed.cloudflare.com/__up";
pub const DEFAULT_LATENCY_TARGET: &str = "1.1.1.1:443";
pub const DEFAULT_LATENCY_SAMPLES: u32 = 5;
pub const MIN_LATENCY_SAMPLES: u32 = 3;
pub const MAX_LATENCY_SAMPLES: u32 = 20;

// ── SizeClass ───────────────────────────────────────────────────────

/// Transfer size class for the download and upload sub-tests.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SizeClass {
    Small,
    #[default]
    Medium,
    Large,
}

impl SizeClass {
    /// Payload size in decimal bytes.
    pub const fn bytes(self) -> u64 {
        match self {
            Self::Small => 1_000_000,
            Self::Medium => 10_000_000,
            Self::Large => 100_000_000,
        }
    }

    /// Overall time budget for each sub-test at this size, across every
    /// endpoint it tries.
    pub const fn timeout(self) -> Duration {
        match self {
            Self::Small => Duration::from_secs(15),
            Self::Medium => Duration::from_secs(30),
            Self::Large => Duration::from_secs(120),
        }
    }
}

// ── MeasurementMode ─────────────────────────────────────────────────

/// Which halves of a sample a tick produces.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MeasurementMode {
    #[default]
    Both,
    WlanOnly,
    SpeedOnly,
}

impl MeasurementMode {
    pub const fn measures_wlan(self) -> bool {
        matches!(self, Self::Both | Self::WlanOnly)
    }

    pub const fn measures_speed(self) -> bool {
        matches!(self, Self::Both | Self::SpeedOnly)
    }
}

// ── Endpoints ───────────────────────────────────────────────────────

/// Speed-test servers. Download and upload lists are tried in order until
/// one endpoint succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Download URL templates; `{bytes}` is replaced by the size class.
    pub download: Vec<String>,
    pub upload: Vec<String>,
    /// `host:port` for TCP connect latency probes.
    pub latency_target: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            download: vec![DEFAULT_DOWNLOAD_ENDPOINT.to_owned()],
            upload: vec![DEFAULT_UPLOAD_ENDPOINT.to_owned()],
            latency_target: DEFAULT_LATENCY_TARGET.to_owned(),
        }
    }
}

impl Endpoints {
    /// Download URLs for a size class, in fallback order.
    pub fn download_urls(&self, size: SizeClass) -> Result<Vec<Url>, CoreError> {
        let bytes = size.bytes().to_string();
        self.download
            .iter()
            .map(|template| parse_endpoint(&template.replace(BYTES_PLACEHOLDER, &bytes)))
            .collect()
    }

    /// Upload URLs, in fallback order.
    pub fn upload_urls(&self) -> Result<Vec<Url>, CoreError> {
        self.upload.iter().map(String::as_str).map(parse_endpoint).collect()
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, CoreError> {
    let url = Url::parse(raw).map_err(|e| CoreError::InvalidEndpoint {
        url: raw.to_owned(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(CoreError::InvalidEndpoint {
            url: raw.to_owned(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

// ── SpeedTestConfig ─────────────────────────────────────────────────

/// Parameters of one speed test run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeedTestConfig {
    pub size: SizeClass,
    pub skip_upload: bool,
    pub endpoints: Endpoints,
    /// Sequential TCP connects for latency/jitter (at least 3).
    pub latency_samples: u32,
}

impl Default for SpeedTestConfig {
    fn default() -> Self {
        Self {
            size: SizeClass::default(),
            skip_upload: false,
            endpoints: Endpoints::default(),
            latency_samples: DEFAULT_LATENCY_SAMPLES,
        }
    }
}

impl SpeedTestConfig {
    /// Reject configurations no tick could run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.latency_samples < MIN_LATENCY_SAMPLES {
            return Err(CoreError::Config {
                message: format!(
                    "latency_samples must be at least {MIN_LATENCY_SAMPLES}, got {}",
                    self.latency_samples
                ),
            });
        }
        if self.latency_samples > MAX_LATENCY_SAMPLES {
            return Err(CoreError::Config {
                message: format!(
                    "latency_samples must be at most {MAX_LATENCY_SAMPLES}, got {}",
                    self.latency_samples
                ),
            });
        }
        if self.endpoints.latency_target.trim().is_empty() {
            return Err(CoreError::Config {
                message: "latency target must not be empty".into(),
            });
        }
        if self.endpoints.download.is_empty() {
            return Err(CoreError::Config {
                message: "at least one download endpoint is required".into(),
            });
        }
        if !self.skip_upload && self.endpoints.upload.is_empty() {
            return Err(CoreError::Config {
                message: "at least one upload endpoint is required unless upload is skipped"
                    .into(),
            });
        }
        self.endpoints.download_urls(self.size)?;
        self.endpoints.upload_urls()?;
        Ok(())
    }
}

// ── Probe / engine configuration ────────────────────────────────────

/// WLAN probe tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Wireless interface override (Linux only).
    pub interface: Option<String>,
    /// Budget for each external command.
    pub command_timeout: Duration,
    /// Budget for the whole probe, all commands included.
    pub probe_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interface: None,
            command_timeout: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(10),
        }
    }
}

/// Everything `MeasurementEngine::new` needs.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub transport: TransportConfig,
    pub probe: ProbeConfig,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn size_classes_are_decimal_bytes() {
        assert_eq!(SizeClass::Small.bytes(), 1_000_000);
        assert_eq!(SizeClass::Medium.bytes(), 10_000_000);
        assert_eq!(SizeClass::Large.bytes(), 100_000_000);
        assert_eq!(SizeClass::Large.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn size_class_parses_case_insensitively() {
        assert_eq!("LARGE".parse::<SizeClass>().unwrap(), SizeClass::Large);
        assert!("huge".parse::<SizeClass>().is_err());
    }

    #[test]
    fn mode_flags() {
        assert!(MeasurementMode::Both.measures_wlan());
        assert!(MeasurementMode::Both.measures_speed());
        assert!(!MeasurementMode::WlanOnly.measures_speed());
        assert!(!MeasurementMode::SpeedOnly.measures_wlan());
        assert_eq!(MeasurementMode::WlanOnly.to_string(), "wlan-only");
    }

    #[test]
    fn download_template_substitutes_bytes() {
        let urls = Endpoints::default().download_urls(SizeClass::Small).unwrap();
        assert_eq!(
            urls[0].as_str(),
            "https://speed.cloudflare.com/__down?bytes=1000000"
        );
    }

    #[test]
    fn default_config_is_valid() {
        SpeedTestConfig::default().validate().unwrap();
    }

    #[test]
    fn too_few_latency_samples_rejected() {
        let config = SpeedTestConfig {
            latency_samples: 2,
            ..SpeedTestConfig::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config { .. })));
    }

    #[test]
    fn too_many_latency_samples_rejected() {
        let config = SpeedTestConfig {
            latency_samples: MAX_LATENCY_SAMPLES + 1,
            ..SpeedTestConfig::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config { .. })));

        let config = SpeedTestConfig {
            latency_samples: MAX_LATENCY_SAMPLES,
            ..SpeedTestConfig::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn unparsable_or_non_http_endpoint_rejected() {
        let mut config = SpeedTestConfig::default();
        config.endpoints.upload = vec!["ftp://example.test/up".into()];
        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidEndpoint { .. })
        ));

        config.endpoints.upload = vec!["not a url".into()];
        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidEndpoint { .. })
        ));
    }
}
