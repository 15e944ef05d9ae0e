// ── Core error types ──
//
// Environmental failures (no WLAN, unreachable test server) never surface
// here: they become absent metrics. `CoreError` covers what must stop the
// caller before any tick runs: an unusable configuration or an HTTP client
// that cannot be built.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    // ── Engine construction ──────────────────────────────────────────
    #[error("Cannot build HTTP client: {reason}")]
    ClientBuild { reason: String },

    // ── Records ──────────────────────────────────────────────────────
    #[error("Record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<wlanmeter_api::Error> for CoreError {
    fn from(err: wlanmeter_api::Error) -> Self {
        match err {
            wlanmeter_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            wlanmeter_api::Error::Tls(reason) => CoreError::ClientBuild { reason },
            other => CoreError::ClientBuild {
                reason: other.to_string(),
            },
        }
    }
}
