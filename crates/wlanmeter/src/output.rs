//! Console rendering: run banner, per-tick sample block and the final
//! min/max/avg summary table.
//!
//! Everything renders to a `String` first so the layout is testable; the
//! `Console` decides whether anything reaches stdout.

use std::fmt::Write as _;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::time::Duration;

use bytesize::ByteSize;
use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use wlanmeter_core::{
    MeasurementMode, QualityRating, RecordFormat, Sample, SpeedMetrics, SpeedTestConfig,
    WlanMetrics,
};

use crate::cli::ColorMode;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

#[derive(Debug, Clone, Copy)]
enum Tone {
    Good,
    Fair,
    Bad,
}

fn paint(text: &str, tone: Tone, color: bool) -> String {
    if !color {
        return text.to_owned();
    }
    match tone {
        Tone::Good => text.green().to_string(),
        Tone::Fair => text.yellow().to_string(),
        Tone::Bad => text.red().to_string(),
    }
}

fn rating_tone(rating: QualityRating) -> Tone {
    match rating {
        QualityRating::Excellent | QualityRating::VeryGood | QualityRating::Good => Tone::Good,
        QualityRating::Fair => Tone::Fair,
        QualityRating::Weak | QualityRating::Poor => Tone::Bad,
    }
}

fn download_tone(mbps: f64) -> Tone {
    if mbps >= 100.0 {
        Tone::Good
    } else if mbps >= 25.0 {
        Tone::Fair
    } else {
        Tone::Bad
    }
}

fn or_na(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "n/a".to_owned(), |v| format!("{v:.2} {unit}"))
}

fn bytes(n: u64) -> String {
    ByteSize::b(n).to_string_as(true)
}

// ── Banner ───────────────────────────────────────────────────────────

/// What the run is about to do, shown once before the first tick.
#[derive(Debug)]
pub struct Banner<'a> {
    pub interval: Duration,
    pub count: Option<u64>,
    pub mode: MeasurementMode,
    pub speed: &'a SpeedTestConfig,
    pub output: Option<&'a Path>,
    pub format: RecordFormat,
}

pub fn render_banner(banner: &Banner<'_>) -> String {
    let mut out = String::new();
    let rule = "=".repeat(60);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "  wlanmeter v{}", env!("CARGO_PKG_VERSION"));
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "  Interval:     {}",
        humantime::format_duration(banner.interval)
    );
    let _ = writeln!(
        out,
        "  Samples:      {}",
        banner
            .count
            .map_or_else(|| "until Ctrl+C".to_owned(), |n| n.to_string())
    );
    let _ = writeln!(out, "  Mode:         {}", banner.mode);
    if banner.mode.measures_speed() {
        let _ = writeln!(
            out,
            "  Test size:    {} ({})",
            banner.speed.size,
            bytes(banner.speed.size.bytes())
        );
        let _ = writeln!(
            out,
            "  Upload:       {}",
            if banner.speed.skip_upload { "skipped" } else { "on" }
        );
    }
    let _ = writeln!(
        out,
        "  Output:       {}",
        banner.output.map_or_else(
            || "console only".to_owned(),
            |p| format!("{} ({})", p.display(), banner.format)
        )
    );
    let _ = writeln!(out, "{rule}");
    let _ = write!(out, "  Press Ctrl+C to stop");
    out
}

// ── Per-tick sample ──────────────────────────────────────────────────

pub fn render_sample(
    sample: &Sample,
    index: u64,
    count: Option<u64>,
    mode: MeasurementMode,
    color: bool,
) -> String {
    let mut out = String::new();
    let position = count.map_or_else(|| index.to_string(), |n| format!("{index}/{n}"));
    let _ = writeln!(out, "{}", "─".repeat(50));
    let _ = writeln!(
        out,
        "  Sample #{position} @ {}",
        sample.timestamp.format("%H:%M:%S")
    );
    let _ = writeln!(out, "{}", "─".repeat(50));

    if mode.measures_wlan() {
        match &sample.wlan {
            Some(wlan) => render_wlan(&mut out, wlan, color),
            None => {
                let _ = writeln!(out, "  WLAN:  {}", paint("unavailable", Tone::Bad, color));
            }
        }
    }
    if mode.measures_speed() {
        match &sample.speed {
            Some(speed) => render_speed(&mut out, speed, color),
            None => {
                let _ = writeln!(out, "  Speed: {}", paint("test failed", Tone::Bad, color));
            }
        }
    }
    out.truncate(out.trim_end().len());
    out
}

fn render_wlan(out: &mut String, wlan: &WlanMetrics, color: bool) {
    let signal = format!(
        "{} dBm ({}%) - {}",
        wlan.signal_dbm, wlan.signal_pct, wlan.quality_rating
    );
    let _ = writeln!(out, "  WLAN:");
    let _ = writeln!(out, "     SSID:      {}", wlan.ssid);
    let _ = writeln!(
        out,
        "     Signal:    {}",
        paint(&signal, rating_tone(wlan.quality_rating), color)
    );
    let _ = writeln!(out, "     Link:      {:.1} Mbit/s", wlan.link_speed_mbps);
    match wlan.band {
        Some(band) => {
            let _ = writeln!(out, "     Band:      {band} (ch. {})", wlan.channel);
        }
        None => {
            let _ = writeln!(out, "     Channel:   {}", wlan.channel);
        }
    }
    if let Some(snr) = wlan.snr_db {
        let _ = writeln!(out, "     SNR:       {snr} dB");
    }
}

fn render_speed(out: &mut String, speed: &SpeedMetrics, color: bool) {
    let download = match speed.download_mbps {
        Some(mbps) => paint(&format!("{mbps:.2} Mbit/s"), download_tone(mbps), color),
        None => paint("n/a", Tone::Bad, color),
    };
    let _ = writeln!(out, "  Speed:");
    let _ = writeln!(out, "     Download:  {download}");
    let _ = writeln!(out, "     Upload:    {}", or_na(speed.upload_mbps, "Mbit/s"));
    let _ = writeln!(
        out,
        "     Ping:      {} (jitter {})",
        or_na(speed.ping_ms, "ms"),
        or_na(speed.jitter_ms, "ms")
    );
    if let Some(server) = &speed.server {
        let moved = match (speed.bytes_downloaded, speed.bytes_uploaded) {
            (Some(down), Some(up)) => format!(", {} down / {} up", bytes(down), bytes(up)),
            (Some(down), None) => format!(", {} down", bytes(down)),
            (None, Some(up)) => format!(", {} up", bytes(up)),
            (None, None) => String::new(),
        };
        let _ = writeln!(out, "     Server:    {server}{moved}");
    }
}

// ── Summary ──────────────────────────────────────────────────────────

/// Running min/max/sum of one metric.
#[derive(Debug, Clone, Copy, Default)]
struct Stats {
    count: u32,
    min: f64,
    max: f64,
    sum: f64,
}

impl Stats {
    fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.count += 1;
    }

    fn avg(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count))
    }
}

/// Aggregates every completed sample of a run.
#[derive(Debug, Default)]
pub struct RunSummary {
    samples: u64,
    signal: Stats,
    link: Stats,
    download: Stats,
    upload: Stats,
    ping: Stats,
    jitter: Stats,
    bytes_downloaded: u64,
    bytes_uploaded: u64,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
    #[tabled(rename = "Avg")]
    avg: String,
    #[tabled(rename = "Samples")]
    samples: u32,
}

impl RunSummary {
    pub fn record(&mut self, sample: &Sample) {
        self.samples += 1;
        if let Some(wlan) = &sample.wlan {
            self.signal.push(f64::from(wlan.signal_dbm));
            self.link.push(wlan.link_speed_mbps);
        }
        if let Some(speed) = &sample.speed {
            let metrics = [
                (&mut self.download, speed.download_mbps),
                (&mut self.upload, speed.upload_mbps),
                (&mut self.ping, speed.ping_ms),
                (&mut self.jitter, speed.jitter_ms),
            ];
            for (stats, value) in metrics {
                if let Some(v) = value {
                    stats.push(v);
                }
            }
            self.bytes_downloaded += speed.bytes_downloaded.unwrap_or(0);
            self.bytes_uploaded += speed.bytes_uploaded.unwrap_or(0);
        }
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", "=".repeat(60));
        let _ = writeln!(out, "  SUMMARY: {} sample(s)", self.samples);
        let _ = writeln!(out, "{}", "=".repeat(60));

        let rows: Vec<SummaryRow> = [
            ("Signal (dBm)", &self.signal, 1_usize),
            ("Link (Mbit/s)", &self.link, 1),
            ("Download (Mbit/s)", &self.download, 2),
            ("Upload (Mbit/s)", &self.upload, 2),
            ("Ping (ms)", &self.ping, 2),
            ("Jitter (ms)", &self.jitter, 2),
        ]
        .into_iter()
        .filter_map(|(metric, stats, precision)| {
            let avg = stats.avg()?;
            Some(SummaryRow {
                metric,
                min: format!("{:.precision$}", stats.min),
                max: format!("{:.precision$}", stats.max),
                avg: format!("{avg:.precision$}"),
                samples: stats.count,
            })
        })
        .collect();

        if rows.is_empty() {
            let _ = write!(out, "  No metrics collected");
            return out;
        }
        let _ = writeln!(out, "{}", Table::new(rows).with(Style::rounded()));
        if self.bytes_downloaded > 0 || self.bytes_uploaded > 0 {
            let _ = write!(
                out,
                "  Transferred: {} down, {} up",
                bytes(self.bytes_downloaded),
                bytes(self.bytes_uploaded)
            );
        }
        out.truncate(out.trim_end().len());
        out
    }
}

// ── Console ──────────────────────────────────────────────────────────

/// Stdout sink honoring `--quiet` and the color decision.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    color: bool,
    quiet: bool,
}

impl Console {
    pub fn new(color: bool, quiet: bool) -> Self {
        Self { color, quiet }
    }

    pub fn color(self) -> bool {
        self.color
    }

    pub fn print(self, text: &str) {
        if self.quiet || text.is_empty() {
            return;
        }
        println!("{text}");
    }

    pub fn next_tick(self, wait: Duration) {
        let at = chrono::Local::now()
            + chrono::Duration::from_std(wait).unwrap_or_else(|_| chrono::Duration::zero());
        self.print(&format!(
            "\n  Next sample in {} (at {})",
            humantime::format_duration(wait),
            at.format("%H:%M:%S")
        ));
    }
}
