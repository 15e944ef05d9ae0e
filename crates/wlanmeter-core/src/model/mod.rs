// ── Measurement domain model ──
//
// One tick produces one `Sample`: an optional WLAN half and an optional
// speed half. Internal values keep full precision; throughput, latency and
// link rates are rounded to two decimals only when serialized.

pub mod sample;
pub mod speed;
pub mod wlan;

pub use sample::Sample;
pub use speed::SpeedMetrics;
pub use wlan::{Band, SignalSource, WlanMetrics, channel_to_frequency, frequency_to_channel};

/// Round to two decimals for output.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ── Serde helpers ───────────────────────────────────────────────────

#[allow(clippy::trivially_copy_pass_by_ref)]
pub(crate) fn serialize_round2<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(round2(*value))
}

#[allow(clippy::trivially_copy_pass_by_ref, clippy::ref_option)]
pub(crate) fn serialize_round2_opt<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(v) => serializer.serialize_some(&round2(*v)),
        None => serializer.serialize_none(),
    }
}
