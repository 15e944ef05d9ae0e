//! Clap derive structures for the `wlanmeter` CLI.
//!
//! Only depends on clap, clap_complete and humantime so `build.rs` can pull
//! it in to render man pages.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// wlanmeter -- WLAN link quality and internet speed, sampled over time
#[derive(Debug, Parser)]
#[command(
    name = "wlanmeter",
    version,
    about = "Measure WLAN link quality and internet speed over time",
    long_about = "Samples the wireless link (SSID, signal, channel, link rate) and runs an\n\
        HTTP speed test (latency, download, upload) at a fixed interval.\n\n\
        Without a subcommand, wlanmeter measures until --count samples are taken\n\
        or Ctrl-C is pressed.",
    after_help = "Quality ratings:\n  \
        Excellent  >= -50 dBm (100%)\n  \
        Very Good  >= -60 dBm (80%)\n  \
        Good       >= -67 dBm (60%)\n  \
        Fair       >= -70 dBm (40%)\n  \
        Weak       >= -80 dBm (20%)\n  \
        Poor       <  -80 dBm (10%)",
    propagate_version = true,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(flatten)]
    pub measure: MeasureArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "WLANMETER_CONFIG", global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// When to use color output
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress console output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Measurement ──────────────────────────────────────────────────────

/// Options for the default measuring action. Unset options fall back to
/// the config file.
#[derive(Debug, Args)]
pub struct MeasureArgs {
    /// Number of samples to take (default: until Ctrl-C)
    #[arg(long, short = 'c', value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub count: Option<u64>,

    /// Time between tick starts: seconds, or e.g. 30s, 5m (default: 60s)
    #[arg(long, short = 'i', value_name = "DURATION", value_parser = parse_interval)]
    pub interval: Option<Duration>,

    /// Transfer size: small=1 MB, medium=10 MB, large=100 MB
    #[arg(long)]
    pub size: Option<SizeArg>,

    /// Skip the upload sub-test
    #[arg(long)]
    pub skip_upload: bool,

    /// Only measure the wireless link (no speed test)
    #[arg(long, conflicts_with = "speed_only")]
    pub wlan_only: bool,

    /// Only run the speed test (no wireless link)
    #[arg(long)]
    pub speed_only: bool,

    /// Append samples to FILE
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output file format
    #[arg(long, short = 'f')]
    pub format: Option<FormatArg>,

    /// Wireless interface to probe (Linux)
    #[arg(long, value_name = "IF")]
    pub interface: Option<String>,

    /// Number of TCP latency probes per tick (at least 3)
    #[arg(long, value_name = "N")]
    pub latency_samples: Option<u32>,

    /// Accept invalid TLS certificates from speed-test servers
    #[arg(long, short = 'k')]
    pub insecure: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SizeArg {
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    /// Semicolon-separated values with a header row
    Csv,
    /// One JSON object per line
    Jsonl,
}

/// A bare number is seconds; anything else is humantime.
fn parse_interval(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let interval = match raw.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(raw).map_err(|e| e.to_string())?,
    };
    if interval.is_zero() {
        return Err("interval must be greater than zero".into());
    }
    Ok(interval)
}

// ── Subcommands ──────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect or create the config file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Print the effective configuration (file + environment) as TOML
    Show,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
