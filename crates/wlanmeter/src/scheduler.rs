//! Fixed-interval tick loop.
//!
//! Tick starts are `interval` apart; a tick that overruns its slot delays the
//! next one instead of overlapping it. Cancellation (Ctrl-C) is checked
//! between ticks and interrupts the inter-tick sleep. A tick that was
//! interrupted mid-flight is discarded.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};
use wlanmeter_core::{MeasurementEngine, MeasurementMode, Sample, SpeedTestConfig};

use crate::error::CliError;

/// One completed tick handed to the caller.
#[derive(Debug)]
pub struct Tick<'a> {
    /// 1-based position in the run.
    pub index: u64,
    pub sample: &'a Sample,
    /// Time until the next tick starts; `None` after the last one.
    pub next_in: Option<Duration>,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub completed: u64,
    pub interrupted: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    interval: Duration,
    count: Option<u64>,
}

impl Scheduler {
    /// `count = None` runs until cancelled.
    pub fn new(interval: Duration, count: Option<u64>) -> Self {
        Self { interval, count }
    }

    pub async fn run<F>(
        self,
        engine: &MeasurementEngine,
        mode: MeasurementMode,
        config: &SpeedTestConfig,
        mut on_tick: F,
    ) -> Result<RunOutcome, CliError>
    where
        F: FnMut(Tick<'_>) -> Result<(), CliError>,
    {
        let cancel = engine.cancellation_token();
        let mut completed: u64 = 0;
        let interrupted = |completed| RunOutcome {
            completed,
            interrupted: true,
        };

        loop {
            if cancel.is_cancelled() {
                return Ok(interrupted(completed));
            }

            let started = Instant::now();
            let sample = engine.run_once(mode, config).await;
            if cancel.is_cancelled() {
                debug!(tick = completed + 1, "discarding interrupted tick");
                return Ok(interrupted(completed));
            }
            completed += 1;

            let last = self.count.is_some_and(|n| completed >= n);
            let next_at = started + self.interval;
            on_tick(Tick {
                index: completed,
                sample: &sample,
                next_in: (!last).then(|| next_at.saturating_duration_since(Instant::now())),
            })?;

            if last {
                info!(completed, "run complete");
                return Ok(RunOutcome {
                    completed,
                    interrupted: false,
                });
            }

            tokio::select! {
                () = cancel.cancelled() => return Ok(interrupted(completed)),
                () = tokio::time::sleep_until(next_at) => {}
            }
        }
    }
}
