use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the `wlanmeter-api` crate.
///
/// Covers every failure mode of a single measurement transfer or probe:
/// transport, HTTP status, timeouts, and raw socket connects.
/// `wlanmeter-core` maps these into absent metrics, never into aborts.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, reset, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The whole transfer or probe exceeded its time budget.
    #[error("Request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// TLS configuration or client construction failure.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── HTTP ────────────────────────────────────────────────────────
    /// Endpoint answered with a non-2xx status.
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    /// Endpoint answered 2xx but sent no payload.
    #[error("{url} returned an empty body")]
    EmptyTransfer { url: String },

    // ── Sockets ─────────────────────────────────────────────────────
    /// Host name resolved to no usable address.
    #[error("Could not resolve {target}")]
    Resolve { target: String },

    /// TCP connect failed.
    #[error("Connect to {target} failed: {reason}")]
    Connect { target: String, reason: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying on the
    /// next tick (the engine itself never retries).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::Connect { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns `true` if the failure was the time budget running out.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}
