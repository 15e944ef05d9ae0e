// ── WLAN link domain types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::classify::QualityRating;

use super::serialize_round2;
use super::serialize_round2_opt;

/// Frequency band of the associated channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum Band {
    #[serde(rename = "2.4GHz")]
    #[strum(serialize = "2.4GHz")]
    Ghz2_4,
    #[serde(rename = "5GHz")]
    #[strum(serialize = "5GHz")]
    Ghz5,
    #[serde(rename = "6GHz")]
    #[strum(serialize = "6GHz")]
    Ghz6,
}

impl Band {
    /// Band containing a centre frequency, if it lies in a WLAN band.
    pub fn from_frequency(mhz: u32) -> Option<Self> {
        match mhz {
            2400..=2500 => Some(Self::Ghz2_4),
            5150..=5895 => Some(Self::Ghz5),
            5925..=7125 => Some(Self::Ghz6),
            _ => None,
        }
    }

    /// Band implied by a channel number alone. 5 GHz uses multiples of 4
    /// up to 144 and 6 GHz uses 4n+1, so 149-177 belong to both and stay
    /// unknown. 1-14 are taken as 2.4 GHz.
    pub fn from_channel(channel: u16) -> Option<Self> {
        match channel {
            1..=14 => Some(Self::Ghz2_4),
            32..=144 if channel % 4 == 0 => Some(Self::Ghz5),
            149..=177 => None,
            15..=233 if channel % 4 == 1 => Some(Self::Ghz6),
            _ => None,
        }
    }

    /// Parse a band as printed by platform tools: `5 GHz`, `2,4 GHz`,
    /// `2.4GHz`, `6 GHz`.
    pub fn parse_reported(raw: &str) -> Option<Self> {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| if c == ',' { '.' } else { c.to_ascii_lowercase() })
            .collect();
        match compact.trim_end_matches("ghz") {
            "2.4" => Some(Self::Ghz2_4),
            "5" => Some(Self::Ghz5),
            "6" => Some(Self::Ghz6),
            _ => None,
        }
    }
}

/// Whether `signal_dbm` was reported by the OS or derived from a percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SignalSource {
    #[default]
    Reported,
    Approximated,
}

/// Centre frequency of a channel. Without `band`, only channel numbers
/// that belong to one band resolve.
pub fn channel_to_frequency(channel: u16, band: Option<Band>) -> Option<u32> {
    let ch = u32::from(channel);
    match (band.or_else(|| Band::from_channel(channel))?, channel) {
        (Band::Ghz6, 2) => Some(5935),
        (Band::Ghz6, 1..=233) => Some(5950 + 5 * ch),
        (Band::Ghz2_4, 14) => Some(2484),
        (Band::Ghz2_4, 1..=13) => Some(2407 + 5 * ch),
        (Band::Ghz5, 32..=177) => Some(5000 + 5 * ch),
        _ => None,
    }
}

/// Channel number for a centre frequency.
pub fn frequency_to_channel(mhz: u32) -> Option<u16> {
    let channel = match mhz {
        2484 => 14,
        2412..=2472 => (mhz - 2407) / 5,
        5160..=5885 => (mhz - 5000) / 5,
        5935 => 2,
        5955..=7115 => (mhz - 5950) / 5,
        _ => return None,
    };
    u16::try_from(channel).ok()
}

/// Normalized WLAN link metrics for one tick.
///
/// `signal_pct` and `quality_rating` always equal `classify(signal_dbm)`.
/// A platform's own percentage is kept separately in `reported_pct`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WlanMetrics {
    pub ssid: String,
    pub signal_dbm: i32,
    pub signal_pct: u8,
    pub quality_rating: QualityRating,
    #[serde(serialize_with = "serialize_round2")]
    pub link_speed_mbps: f64,
    pub channel: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band: Option<Band>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snr_db: Option<i32>,

    // Supplemental link details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bssid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_mhz: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_dbm: Option<i32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_round2_opt"
    )]
    pub tx_rate_mbps: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_round2_opt"
    )]
    pub rx_rate_mbps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radio_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
    #[serde(default)]
    pub signal_source: SignalSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_pct: Option<u8>,
}
