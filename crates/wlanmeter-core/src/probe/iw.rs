// Linux backend: `iw dev <if> link`, enriched by `iwconfig <if>`.

use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use tracing::debug;

use super::command::CommandRunner;
use super::{LinkInfoSource, LinkReading, ProbeError, leading_f64, leading_i32, split_kv};

const SYSFS_NET: &str = "/sys/class/net";
const FALLBACK_INTERFACES: [&str; 4] = ["wlan0", "wlp2s0", "wlp3s0", "wifi0"];

/// `iw`/`iwconfig` link source.
#[derive(Debug, Clone)]
pub struct IwSource {
    runner: CommandRunner,
    interface: Option<String>,
    sysfs_root: PathBuf,
}

impl IwSource {
    /// `interface` overrides discovery through sysfs.
    pub fn new(runner: CommandRunner, interface: Option<String>) -> Self {
        Self {
            runner,
            interface,
            sysfs_root: PathBuf::from(SYSFS_NET),
        }
    }

    /// Discover interfaces under a different sysfs directory.
    pub fn with_sysfs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sysfs_root = root.into();
        self
    }

    async fn read(&self) -> Result<LinkReading, ProbeError> {
        let interface = match &self.interface {
            Some(name) => name.clone(),
            None => find_wireless_interface(&self.sysfs_root)
                .await
                .ok_or(ProbeError::NoInterface)?,
        };

        let link = self.runner.run("iw", &["dev", &interface, "link"]).await?;
        let mut reading = parse_iw_link(&link)?;
        reading.interface = Some(interface.clone());

        match self.runner.run("iwconfig", &[&interface]).await {
            Ok(output) => apply_iwconfig(&mut reading, &output),
            Err(e) => debug!(interface, error = %e, "iwconfig unavailable, using iw only"),
        }

        Ok(reading)
    }
}

impl LinkInfoSource for IwSource {
    fn name(&self) -> &'static str {
        "iw"
    }

    fn read_link(&self) -> BoxFuture<'_, Result<LinkReading, ProbeError>> {
        Box::pin(self.read())
    }
}

/// First interface with a `wireless` subdirectory, else the first existing
/// well-known name.
pub async fn find_wireless_interface(sysfs_root: &Path) -> Option<String> {
    let mut names = Vec::new();
    if let Ok(mut entries) = tokio::fs::read_dir(sysfs_root).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();

    for name in &names {
        let wireless = sysfs_root.join(name).join("wireless");
        if tokio::fs::try_exists(&wireless).await.unwrap_or(false) {
            return Some(name.clone());
        }
    }

    FALLBACK_INTERFACES
        .iter()
        .find(|candidate| names.iter().any(|n| n == *candidate))
        .map(|name| (*name).to_owned())
}

/// Parse `iw dev <if> link`.
///
/// ```text
/// Connected to aa:bb:cc:dd:ee:ff (on wlan0)
///         SSID: HomeNet
///         freq: 5180
///         signal: -52 dBm
///         rx bitrate: 866.7 MBit/s VHT-MCS 9 80MHz short GI VHT-NSS 2
///         tx bitrate: 780.0 MBit/s VHT-MCS 8 80MHz short GI VHT-NSS 2
/// ```
pub fn parse_iw_link(output: &str) -> Result<LinkReading, ProbeError> {
    let mut reading = LinkReading::default();
    let mut connected = false;

    for line in output.lines().map(str::trim) {
        if line.starts_with("Not connected") {
            return Err(ProbeError::NotConnected);
        }
        if let Some(rest) = line.strip_prefix("Connected to ") {
            connected = true;
            reading.bssid = rest.split_whitespace().next().map(str::to_owned);
            continue;
        }
        let Some((key, value)) = split_kv(line) else {
            continue;
        };
        match key {
            "SSID" => reading.ssid = Some(value.to_owned()),
            // Newer iw prints fractional MHz ("5180.0").
            "freq" => {
                reading.frequency_mhz = leading_i32(value).and_then(|f| u32::try_from(f).ok());
            }
            "signal" => reading.signal_dbm = leading_i32(value),
            "rx bitrate" => reading.rx_rate_mbps = leading_f64(value),
            "tx bitrate" => reading.tx_rate_mbps = leading_f64(value),
            _ => {}
        }
    }

    if !connected {
        return Err(ProbeError::NotConnected);
    }
    reading.link_speed_mbps = reading.tx_rate_mbps.or(reading.rx_rate_mbps);
    Ok(reading)
}

/// Merge `Link Quality=x/y` and `Noise level=` from `iwconfig <if>`.
///
/// ```text
/// wlan0     IEEE 802.11  ESSID:"HomeNet"
///           Link Quality=58/70  Signal level=-52 dBm  Noise level=-95 dBm
/// ```
pub fn apply_iwconfig(reading: &mut LinkReading, output: &str) {
    if let Some(pct) = field_after(output, "Link Quality").and_then(parse_ratio_pct) {
        reading.signal_pct = Some(pct);
    }
    // Some drivers print "Noise level=0 dBm" when they do not measure noise.
    if let Some(noise) = field_after(output, "Noise level")
        .and_then(leading_i32)
        .filter(|n| *n < 0)
    {
        reading.noise_dbm = Some(noise);
    }
    if reading.signal_dbm.is_none() {
        reading.signal_dbm = field_after(output, "Signal level")
            .and_then(leading_i32)
            .filter(|s| *s < 0);
    }
}

/// Text following `label=` or `label:`.
fn field_after<'a>(output: &'a str, label: &str) -> Option<&'a str> {
    let start = output.find(label)? + label.len();
    let rest = output.get(start..)?;
    rest.strip_prefix('=')
        .or_else(|| rest.strip_prefix(':'))
        .map(str::trim_start)
}

/// `58/70` as an integer percentage.
fn parse_ratio_pct(value: &str) -> Option<u8> {
    let token = value.split_whitespace().next()?;
    let (num, den) = token.split_once('/')?;
    let num: u32 = num.parse().ok()?;
    let den: u32 = den.parse().ok()?;
    if den == 0 {
        return None;
    }
    u8::try_from((num * 100 / den).min(100)).ok()
}
