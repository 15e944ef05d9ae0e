//! CLI error types with miette diagnostics.
//!
//! Maps `ConfigError` and `CoreError` into user-facing errors with help text
//! and process exit codes.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use wlanmeter_config::ConfigError;
use wlanmeter_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    /// 128 + SIGINT, as shells report it.
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(wlanmeter::validation))]
    Validation { field: String, reason: String },

    #[error("Invalid endpoint URL '{url}': {reason}")]
    #[diagnostic(
        code(wlanmeter::endpoint),
        help(
            "Endpoints must be absolute http(s) URLs.\n\
             Download URLs may contain {{bytes}} for the transfer size."
        )
    )]
    InvalidEndpoint { url: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(wlanmeter::config),
        help("Check the config file and WLANMETER_* environment variables.")
    )]
    Config(Box<figment::Error>),

    #[error("Config file already exists at {}", path.display())]
    #[diagnostic(
        code(wlanmeter::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: PathBuf },

    // ── Engine ───────────────────────────────────────────────────────
    #[error("Cannot set up the speed-test client: {reason}")]
    #[diagnostic(
        code(wlanmeter::client),
        help("If you configured transport.ca_cert, check that the file is a readable PEM certificate.")
    )]
    ClientBuild { reason: String },

    // ── Output ───────────────────────────────────────────────────────
    #[error("Cannot write samples to {}", path.display())]
    #[diagnostic(
        code(wlanmeter::output),
        help("Check that the directory exists and is writable.")
    )]
    OutputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {reason}")]
    #[diagnostic(code(wlanmeter::serialization))]
    Serialization { reason: String },

    // ── Run control ──────────────────────────────────────────────────
    #[error("Interrupted before the first sample completed")]
    #[diagnostic(code(wlanmeter::interrupted))]
    Interrupted,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } | Self::InvalidEndpoint { .. } | Self::Config(_) => {
                exit_code::USAGE
            }
            Self::Interrupted => exit_code::INTERRUPTED,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError / CoreError → CliError mapping ───────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::AlreadyExists { path } => Self::ConfigExists { path },
            ConfigError::Serialization(e) => Self::Serialization {
                reason: e.to_string(),
            },
            ConfigError::Figment(e) => Self::Config(e),
            ConfigError::Core(e) => e.into(),
            ConfigError::Io(e) => Self::Io(e),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::InvalidEndpoint { url, reason } => Self::InvalidEndpoint { url, reason },
            CoreError::ClientBuild { reason } => Self::ClientBuild { reason },
            CoreError::Serialization(e) => Self::Serialization {
                reason: e.to_string(),
            },
        }
    }
}
