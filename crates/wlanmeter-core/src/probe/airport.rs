// macOS backend: `airport -I` from the Apple80211 private framework.

use futures_util::future::BoxFuture;

use super::command::CommandRunner;
use super::{LinkInfoSource, LinkReading, ProbeError, leading_f64, leading_i32, split_kv};

pub const AIRPORT_PATH: &str =
    "/System/Library/PrivateFrameworks/Apple80211.framework/Versions/Current/Resources/airport";

/// Interface name reported for airport readings.
const DEFAULT_INTERFACE: &str = "en0";

/// `airport -I` link source.
#[derive(Debug, Clone)]
pub struct AirportSource {
    runner: CommandRunner,
}

impl AirportSource {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }
}

impl LinkInfoSource for AirportSource {
    fn name(&self) -> &'static str {
        "airport"
    }

    fn read_link(&self) -> BoxFuture<'_, Result<LinkReading, ProbeError>> {
        Box::pin(async move {
            let output = self.runner.run(AIRPORT_PATH, &["-I"]).await?;
            parse_airport_info(&output)
        })
    }
}

/// Parse `airport -I`.
///
/// ```text
///      agrCtlRSSI: -55
///     agrCtlNoise: -89
///           state: running
///      lastTxRate: 867
///       link auth: wpa2-psk
///           BSSID: aa:bb:cc:dd:ee:ff
///            SSID: HomeNet
///         channel: 36,80
/// ```
pub fn parse_airport_info(output: &str) -> Result<LinkReading, ProbeError> {
    let mut reading = LinkReading {
        interface: Some(DEFAULT_INTERFACE.to_owned()),
        ..LinkReading::default()
    };
    let mut state: Option<String> = None;

    for line in output.lines() {
        let Some((key, value)) = split_kv(line) else {
            continue;
        };
        match key.to_lowercase().as_str() {
            "airport" if value.eq_ignore_ascii_case("off") => return Err(ProbeError::NotConnected),
            "state" => state = Some(value.to_lowercase()),
            "agrctlrssi" => reading.signal_dbm = leading_i32(value).filter(|v| *v != 0),
            "agrctlnoise" => reading.noise_dbm = leading_i32(value).filter(|v| *v != 0),
            "lasttxrate" => reading.tx_rate_mbps = leading_f64(value),
            "ssid" => reading.ssid = Some(value.to_owned()),
            "bssid" => reading.bssid = Some(value.to_owned()),
            "link auth" => reading.security = Some(value.to_owned()),
            // "36,80": primary channel, then width.
            "channel" => {
                reading.channel = leading_i32(value).and_then(|c| u16::try_from(c).ok());
            }
            _ => {}
        }
    }

    if state.as_deref().is_some_and(|s| s != "running") {
        return Err(ProbeError::NotConnected);
    }
    reading.link_speed_mbps = reading.tx_rate_mbps;
    Ok(reading)
}
