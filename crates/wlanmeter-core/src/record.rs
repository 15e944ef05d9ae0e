// ── Record serialization ──
//
// Two persisted forms of a `Sample`: a semicolon-delimited CSV row with a
// fixed 13-column layout, and one JSON object per line. Absent values are
// empty CSV fields and omitted JSON keys; an absent group is JSON `null`.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use strum::{Display as StrumDisplay, EnumString};

use crate::error::CoreError;
use crate::model::{Sample, round2};

pub const CSV_DELIMITER: char = ';';

/// Column order of every CSV row.
pub const CSV_COLUMNS: [&str; 13] = [
    "timestamp",
    "ssid",
    "signal_dbm",
    "signal_pct",
    "quality_rating",
    "link_speed_mbps",
    "channel",
    "band",
    "snr_db",
    "download_mbps",
    "upload_mbps",
    "ping_ms",
    "jitter_ms",
];

/// Header line for CSV output (no trailing newline).
pub fn csv_header() -> String {
    CSV_COLUMNS.join(";")
}

/// Persisted record layout.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, StrumDisplay, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RecordFormat {
    #[default]
    Csv,
    Jsonl,
}

impl RecordFormat {
    /// Line written once at the top of a new file, if the format has one.
    pub fn header(self) -> Option<String> {
        match self {
            Self::Csv => Some(csv_header()),
            Self::Jsonl => None,
        }
    }
}

impl Sample {
    /// Header line for CSV output (no trailing newline).
    pub fn csv_header() -> String {
        csv_header()
    }

    /// One CSV row (no trailing newline), always exactly 13 fields.
    pub fn to_csv_row(&self) -> String {
        let wlan = self.wlan.as_ref();
        let speed = self.speed.as_ref();

        let fields: [String; 13] = [
            self.timestamp_string(),
            wlan.map(|w| w.ssid.clone()).unwrap_or_default(),
            opt(wlan.map(|w| w.signal_dbm)),
            opt(wlan.map(|w| w.signal_pct)),
            opt(wlan.map(|w| w.quality_rating)),
            decimal(wlan.map(|w| w.link_speed_mbps)),
            opt(wlan.map(|w| w.channel)),
            opt(wlan.and_then(|w| w.band)),
            opt(wlan.and_then(|w| w.snr_db)),
            decimal(speed.and_then(|s| s.download_mbps)),
            decimal(speed.and_then(|s| s.upload_mbps)),
            decimal(speed.and_then(|s| s.ping_ms)),
            decimal(speed.and_then(|s| s.jitter_ms)),
        ];

        fields
            .iter()
            .map(|f| escape_field(f))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// One JSON object (no trailing newline).
    pub fn to_json_line(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }

    /// One record line in `format` (no trailing newline).
    pub fn to_record(&self, format: RecordFormat) -> Result<String, CoreError> {
        match format {
            RecordFormat::Csv => Ok(self.to_csv_row()),
            RecordFormat::Jsonl => self.to_json_line(),
        }
    }

    /// Parse a line written by [`to_json_line`](Self::to_json_line).
    pub fn from_json_line(line: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(line.trim_end())?)
    }
}

fn opt<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn decimal(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", round2(v))).unwrap_or_default()
}

/// Quote a field containing the delimiter, a quote or a line break.
fn escape_field(field: &str) -> String {
    if field.contains([CSV_DELIMITER, '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}
