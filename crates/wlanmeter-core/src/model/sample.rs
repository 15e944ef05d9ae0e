// ── Sample: one tick's merged record ──

use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};

use super::speed::SpeedMetrics;
use super::wlan::WlanMetrics;

/// Timestamp layout: local time, second precision, no offset.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// The merged outcome of one measurement tick. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
    pub wlan: Option<WlanMetrics>,
    pub speed: Option<SpeedMetrics>,
}

impl Sample {
    pub fn new(
        timestamp: NaiveDateTime,
        wlan: Option<WlanMetrics>,
        speed: Option<SpeedMetrics>,
    ) -> Self {
        Self {
            timestamp,
            wlan,
            speed,
        }
    }

    /// Current local time truncated to whole seconds.
    pub fn now_timestamp() -> NaiveDateTime {
        Local::now().naive_local().trunc_subsecs(0)
    }

    /// Timestamp formatted for records and display.
    pub fn timestamp_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}
