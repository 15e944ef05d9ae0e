//! Configuration for wlanmeter.
//!
//! A TOML file plus `WLANMETER_*` environment overrides, validated and
//! translated into `wlanmeter_core` runtime types. The CLI layers its
//! flags on top of the values produced here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wlanmeter_core::config::{
    DEFAULT_DOWNLOAD_ENDPOINT, DEFAULT_LATENCY_SAMPLES, DEFAULT_LATENCY_TARGET,
    DEFAULT_UPLOAD_ENDPOINT,
};
use wlanmeter_core::{
    CoreError, EngineConfig, Endpoints, MeasurementMode, ProbeConfig, RecordFormat, SizeClass,
    SpeedTestConfig, TlsMode, TransportConfig,
};

/// Environment variable prefix. Nested keys use a double underscore:
/// `WLANMETER_DEFAULTS__SIZE=large`.
pub const ENV_PREFIX: &str = "WLANMETER_";

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "WLANMETER_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file already exists at {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Measurement defaults, overridable per run from the command line.
    #[serde(default)]
    pub defaults: Defaults,

    /// Speed-test servers.
    #[serde(default)]
    pub endpoints: EndpointsSection,

    /// WLAN probe tuning.
    #[serde(default)]
    pub probe: ProbeSection,

    /// HTTP client settings.
    #[serde(default)]
    pub transport: TransportSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    /// Time between tick starts: whole seconds or humantime ("60s", "5m").
    #[serde(default = "default_interval", deserialize_with = "seconds_or_text")]
    pub interval: String,

    #[serde(default)]
    pub size: SizeClass,

    #[serde(default)]
    pub mode: MeasurementMode,

    #[serde(default)]
    pub skip_upload: bool,

    #[serde(default)]
    pub format: RecordFormat,

    /// Default output file; none means console only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Console colors: "auto", "always" or "never".
    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_latency_samples")]
    pub latency_samples: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            size: SizeClass::default(),
            mode: MeasurementMode::default(),
            skip_upload: false,
            format: RecordFormat::default(),
            output: None,
            color: default_color(),
            latency_samples: default_latency_samples(),
        }
    }
}

fn default_interval() -> String {
    "60s".into()
}

/// Accept `interval = 90` as well as `interval = "90s"`.
fn seconds_or_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => secs.to_string(),
        Raw::Text(text) => text,
    })
}

fn default_color() -> String {
    "auto".into()
}
fn default_latency_samples() -> u32 {
    DEFAULT_LATENCY_SAMPLES
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EndpointsSection {
    /// Download URL templates, tried in order; `{bytes}` is substituted.
    #[serde(default = "default_download")]
    pub download: Vec<String>,

    /// Upload URLs, tried in order.
    #[serde(default = "default_upload")]
    pub upload: Vec<String>,

    /// `host:port` for TCP latency probes.
    #[serde(default = "default_latency_target")]
    pub latency_target: String,
}

impl Default for EndpointsSection {
    fn default() -> Self {
        Self {
            download: default_download(),
            upload: default_upload(),
            latency_target: default_latency_target(),
        }
    }
}

fn default_download() -> Vec<String> {
    vec![DEFAULT_DOWNLOAD_ENDPOINT.into()]
}
fn default_upload() -> Vec<String> {
    vec![DEFAULT_UPLOAD_ENDPOINT.into()]
}
fn default_latency_target() -> String {
    DEFAULT_LATENCY_TARGET.into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProbeSection {
    /// Wireless interface (Linux). Discovered through sysfs when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,

    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProbeSection {
    fn default() -> Self {
        Self {
            interface: None,
            command_timeout_secs: default_command_timeout(),
            timeout_secs: default_probe_timeout(),
        }
    }
}

fn default_command_timeout() -> u64 {
    5
}
fn default_probe_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransportSection {
    /// Accept invalid TLS certificates (self-hosted test servers).
    #[serde(default)]
    pub insecure: bool,

    /// Path to an additional CA certificate (PEM).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            insecure: false,
            ca_cert: None,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_connect_timeout() -> u64 {
    10
}

// ── Validation & translation ────────────────────────────────────────

impl Config {
    /// Reject anything a run could not start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.interval()?;
        if !matches!(self.defaults.color.as_str(), "auto" | "always" | "never") {
            return Err(ConfigError::Validation {
                field: "defaults.color".into(),
                reason: format!(
                    "expected 'auto', 'always' or 'never', got '{}'",
                    self.defaults.color
                ),
            });
        }
        if self.probe.command_timeout_secs == 0 || self.probe.timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "probe".into(),
                reason: "timeouts must be at least one second".into(),
            });
        }
        self.speed_test_config().validate()?;
        Ok(())
    }

    /// Parsed `defaults.interval`; zero is rejected.
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        parse_interval(&self.defaults.interval).map_err(|reason| ConfigError::Validation {
            field: "defaults.interval".into(),
            reason,
        })
    }

    pub fn speed_test_config(&self) -> SpeedTestConfig {
        SpeedTestConfig {
            size: self.defaults.size,
            skip_upload: self.defaults.skip_upload,
            endpoints: Endpoints {
                download: self.endpoints.download.clone(),
                upload: self.endpoints.upload.clone(),
                latency_target: self.endpoints.latency_target.clone(),
            },
            latency_samples: self.defaults.latency_samples,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        let tls = if self.transport.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.transport.ca_cert {
            TlsMode::CustomCa(ca_path.clone())
        } else {
            TlsMode::System
        };

        EngineConfig {
            transport: TransportConfig {
                tls,
                connect_timeout: Duration::from_secs(self.transport.connect_timeout_secs),
            },
            probe: ProbeConfig {
                interface: self.probe.interface.clone(),
                command_timeout: Duration::from_secs(self.probe.command_timeout_secs),
                probe_timeout: Duration::from_secs(self.probe.timeout_secs),
            },
        }
    }
}

/// Parse an interval: a bare number is seconds, anything else is humantime
/// (`60s`, `5m`). Zero is rejected.
pub fn parse_interval(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let interval = match raw.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(raw).map_err(|e| e.to_string())?,
    };
    if interval.is_zero() {
        return Err("interval must be greater than zero".into());
    }
    Ok(interval)
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `$WLANMETER_CONFIG`, else the platform
/// config directory.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("org", "wlanmeter", "wlanmeter").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("wlanmeter");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file + environment. A missing file is not an
/// error; defaults apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

/// Serialize config to TOML at `path`, creating parent directories.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Write a default config to `path` unless a file is already there.
pub fn init_config_at(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Err(ConfigError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    save_config_to(&Config::default(), path)
}
