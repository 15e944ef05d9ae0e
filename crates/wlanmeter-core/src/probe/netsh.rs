// Windows backend: `netsh wlan show interfaces`.
//
// Key/value text, one block per adapter. English and German keys are
// recognised; German output uses decimal commas for rates.

use futures_util::future::BoxFuture;

use super::command::CommandRunner;
use super::{LinkInfoSource, LinkReading, ProbeError, leading_f64, leading_i32, split_kv};
use crate::model::Band;

/// `netsh` link source.
#[derive(Debug, Clone)]
pub struct NetshSource {
    runner: CommandRunner,
}

impl NetshSource {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }
}

impl LinkInfoSource for NetshSource {
    fn name(&self) -> &'static str {
        "netsh"
    }

    fn read_link(&self) -> BoxFuture<'_, Result<LinkReading, ProbeError>> {
        Box::pin(async move {
            let output = self
                .runner
                .run("netsh", &["wlan", "show", "interfaces"])
                .await?;
            parse_netsh_interfaces(&output)
        })
    }
}

/// One adapter block while parsing.
#[derive(Default)]
struct InterfaceBlock {
    state: Option<String>,
    reading: LinkReading,
}

impl InterfaceBlock {
    fn is_connected(&self) -> bool {
        match self.state.as_deref() {
            Some(state) => matches!(state.to_lowercase().as_str(), "connected" | "verbunden"),
            None => self.reading.ssid.is_some(),
        }
    }
}

/// Parse `netsh wlan show interfaces`, returning the first connected
/// adapter.
///
/// ```text
///     Name                   : Wi-Fi
///     State                  : connected
///     SSID                   : HomeNet
///     AP BSSID               : aa:bb:cc:dd:ee:ff
///     Band                   : 5 GHz
///     Channel                : 36
///     Radio type             : 802.11ax
///     Receive rate (Mbps)    : 1201
///     Signal                 : 84%
/// ```
pub fn parse_netsh_interfaces(output: &str) -> Result<LinkReading, ProbeError> {
    let mut blocks: Vec<InterfaceBlock> = Vec::new();

    for line in output.lines() {
        let Some((key, value)) = split_kv(line) else {
            continue;
        };
        let key = key.to_lowercase();

        if key == "name" || blocks.is_empty() {
            blocks.push(InterfaceBlock::default());
        }
        let Some(block) = blocks.last_mut() else {
            continue;
        };
        let reading = &mut block.reading;

        match key.as_str() {
            "name" => reading.interface = Some(value.to_owned()),
            "state" | "status" => block.state = Some(value.to_owned()),
            "ssid" => reading.ssid = Some(value.to_owned()),
            "bssid" | "ap bssid" => reading.bssid = Some(value.to_owned()),
            "signal" => {
                reading.signal_pct = leading_i32(value).and_then(|p| u8::try_from(p).ok());
            }
            "channel" | "kanal" => {
                reading.channel = leading_i32(value).and_then(|c| u16::try_from(c).ok());
            }
            "band" => reading.band = Band::parse_reported(value),
            "receive rate (mbps)" | "empfangsrate (mbit/s)" => {
                reading.rx_rate_mbps = leading_f64(value);
            }
            "transmit rate (mbps)" | "übertragungsrate (mbit/s)" => {
                reading.tx_rate_mbps = leading_f64(value);
            }
            "radio type" | "funktyp" => reading.radio_type = Some(value.to_owned()),
            "authentication" | "authentifizierung" => reading.security = Some(value.to_owned()),
            _ => {}
        }
    }

    let mut reading = blocks
        .into_iter()
        .find(InterfaceBlock::is_connected)
        .map(|block| block.reading)
        .ok_or(ProbeError::NotConnected)?;
    reading.link_speed_mbps = reading.rx_rate_mbps.or(reading.tx_rate_mbps);
    Ok(reading)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::classify::QualityRating;
    use crate::model::SignalSource;
    use crate::probe::normalize;

    const ENGLISH: &str = "
There is 1 interface on the system:

    Name                   : Wi-Fi
    Description            : Intel(R) Wi-Fi 6 AX201 160MHz
    GUID                   : 3c1a5b9e-7d2f-4e1a-9b3c-2f6d8e0a1b4c
    Physical address       : 11:22:33:44:55:66
    Interface type         : Primary
    State                  : connected
    SSID                   : HomeNet
    AP BSSID               : aa:bb:cc:dd:ee:ff
    Band                   : 5 GHz
    Channel                : 36
    Network type           : Infrastructure
    Radio type             : 802.11ax
    Authentication         : WPA2-Personal
    Cipher                 : CCMP
    Connection mode        : Auto Connect
    Receive rate (Mbps)    : 1201
    Transmit rate (Mbps)   : 960
    Signal                 : 84%
    Profile                : HomeNet

    Hosted network status  : Not available
";

    const GERMAN: &str = "
Es ist 1 Schnittstelle auf dem System vorhanden:

    Name                   : WLAN
    Beschreibung           : Intel(R) Dual Band Wireless-AC 8265
    GUID                   : 3c1a5b9e-7d2f-4e1a-9b3c-2f6d8e0a1b4c
    Physische Adresse      : 11:22:33:44:55:66
    Status                 : Verbunden
    SSID                   : FRITZ!Box 7590
    BSSID                  : aa:bb:cc:dd:ee:01
    Netzwerktyp            : Infrastruktur
    Funktyp                : 802.11n
    Authentifizierung      : WPA2-Personal
    Verschlüsselung        : CCMP
    Verbindungsmodus       : Automatisch verbinden
    Kanal                  : 6
    Empfangsrate (MBit/s)  : 144,4
    Übertragungsrate (MBit/s) : 72,2
    Signal                 : 70%
    Profil                 : FRITZ!Box 7590
";

    #[test]
    fn parses_english_output() {
        let reading = parse_netsh_interfaces(ENGLISH).unwrap();
        assert_eq!(reading.interface.as_deref(), Some("Wi-Fi"));
        assert_eq!(reading.ssid.as_deref(), Some("HomeNet"));
        assert_eq!(reading.bssid.as_deref(), Some("aa:bb:cc:dd:ee:ff"));
        assert_eq!(reading.signal_pct, Some(84));
        assert_eq!(reading.channel, Some(36));
        assert_eq!(reading.band, Some(Band::Ghz5));
        assert_eq!(reading.link_speed_mbps, Some(1201.0));
        assert_eq!(reading.tx_rate_mbps, Some(960.0));
        assert_eq!(reading.radio_type.as_deref(), Some("802.11ax"));
        assert_eq!(reading.security.as_deref(), Some("WPA2-Personal"));

        let metrics = normalize(reading).unwrap();
        assert_eq!(metrics.signal_dbm, -58);
        assert_eq!(metrics.signal_source, SignalSource::Approximated);
        assert_eq!(metrics.quality_rating, QualityRating::VeryGood);
        assert_eq!(metrics.frequency_mhz, Some(5180));
    }

    #[test]
    fn parses_german_output_with_decimal_commas() {
        let reading = parse_netsh_interfaces(GERMAN).unwrap();
        assert_eq!(reading.interface.as_deref(), Some("WLAN"));
        assert_eq!(reading.ssid.as_deref(), Some("FRITZ!Box 7590"));
        assert_eq!(reading.bssid.as_deref(), Some("aa:bb:cc:dd:ee:01"));
        assert_eq!(reading.channel, Some(6));
        assert_eq!(reading.rx_rate_mbps, Some(144.4));
        assert_eq!(reading.tx_rate_mbps, Some(72.2));
        assert_eq!(reading.radio_type.as_deref(), Some("802.11n"));

        let metrics = normalize(reading).unwrap();
        assert_eq!(metrics.signal_dbm, -65);
        assert_eq!(metrics.band, Some(Band::Ghz2_4));
        assert!((metrics.link_speed_mbps - 144.4).abs() < f64::EPSILON);
    }

    #[test]
    fn disconnected_adapter_is_not_connected() {
        let output = "
    Name                   : Wi-Fi
    State                  : disconnected
";
        assert!(matches!(
            parse_netsh_interfaces(output),
            Err(ProbeError::NotConnected)
        ));
    }

    #[test]
    fn picks_the_connected_adapter() {
        let output = "
    Name                   : Wi-Fi 2
    State                  : disconnected

    Name                   : Wi-Fi
    State                  : connected
    SSID                   : Office
    Channel                : 11
    Receive rate (Mbps)    : 65
    Signal                 : 40%
";
        let reading = parse_netsh_interfaces(output).unwrap();
        assert_eq!(reading.interface.as_deref(), Some("Wi-Fi"));
        assert_eq!(reading.ssid.as_deref(), Some("Office"));
    }

    #[test]
    fn no_wireless_service() {
        let output = "The Wireless AutoConfig Service (wlansvc) is not running.";
        assert!(parse_netsh_interfaces(output).is_err());
    }
}
