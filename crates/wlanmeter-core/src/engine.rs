// ── Measurement engine ──
//
// One tick: capture the timestamp, dispatch the WLAN probe and/or the speed
// test, merge both outcomes into a `Sample`. Ticks are serialized; the
// engine keeps no state between them apart from the observable phase.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use wlanmeter_api::SpeedClient;

use crate::config::{EngineConfig, MeasurementMode, SpeedTestConfig};
use crate::error::CoreError;
use crate::model::{Sample, SpeedMetrics, WlanMetrics};
use crate::probe::WlanProbe;
use crate::speed::SpeedTester;

// ── EngineState ─────────────────────────────────────────────────────

/// Tick phase observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Probing,
    Merging,
    Done,
}

// ── MeasurementEngine ───────────────────────────────────────────────

/// Owns the HTTP client, the WLAN probe and the cancellation token for one
/// measurement session.
///
/// Cheaply cloneable via `Arc<EngineInner>`.
#[derive(Clone)]
pub struct MeasurementEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    probe: WlanProbe,
    speed: SpeedTester,
    state: watch::Sender<EngineState>,
    cancel: CancellationToken,
    tick: Mutex<()>,
}

impl std::fmt::Debug for MeasurementEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementEngine")
            .field("probe", &self.inner.probe)
            .field("state", &*self.inner.state.borrow())
            .field("cancelled", &self.inner.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl MeasurementEngine {
    /// Build the HTTP client and the platform WLAN probe.
    pub fn new(config: EngineConfig) -> Result<Self, CoreError> {
        let client = SpeedClient::new(&config.transport)?;
        let probe = WlanProbe::for_current_platform(&config.probe);
        Ok(Self::with_parts(probe, SpeedTester::new(client)))
    }

    /// Assemble an engine from pre-built parts (tests, custom backends).
    pub fn with_parts(probe: WlanProbe, speed: SpeedTester) -> Self {
        let (state, _) = watch::channel(EngineState::Idle);
        Self {
            inner: Arc::new(EngineInner {
                probe,
                speed,
                state,
                cancel: CancellationToken::new(),
                tick: Mutex::new(()),
            }),
        }
    }

    /// Run one tick. Waits for a concurrently running tick to finish first.
    ///
    /// Never fails: unavailable WLAN and failed sub-tests become absent
    /// metrics.
    pub async fn run_once(&self, mode: MeasurementMode, config: &SpeedTestConfig) -> Sample {
        let _tick = self.inner.tick.lock().await;

        let timestamp = Sample::now_timestamp();
        self.set_state(EngineState::Probing);
        debug!(%mode, size = %config.size, "tick started");

        let (wlan, speed) = match mode {
            MeasurementMode::WlanOnly => (self.probe_wlan().await, None),
            MeasurementMode::SpeedOnly => (None, self.run_speed(config).await),
            MeasurementMode::Both => tokio::join!(self.probe_wlan(), self.run_speed(config)),
        };

        self.set_state(EngineState::Merging);
        let sample = Sample::new(timestamp, wlan, speed);
        info!(
            timestamp = %sample.timestamp_string(),
            wlan = sample.wlan.is_some(),
            speed = sample.speed.is_some(),
            "tick finished"
        );

        self.set_state(EngineState::Done);
        self.set_state(EngineState::Idle);
        sample
    }

    async fn probe_wlan(&self) -> Option<WlanMetrics> {
        tokio::select! {
            () = self.inner.cancel.cancelled() => {
                debug!("WLAN probe cancelled");
                None
            }
            metrics = self.inner.probe.probe() => metrics,
        }
    }

    async fn run_speed(&self, config: &SpeedTestConfig) -> Option<SpeedMetrics> {
        self.inner.speed.run(config, &self.inner.cancel).await
    }

    fn set_state(&self, state: EngineState) {
        self.inner.state.send_replace(state);
    }

    // ── Observation & control ────────────────────────────────────────

    /// Subscribe to tick phase changes.
    pub fn state(&self) -> watch::Receiver<EngineState> {
        self.inner.state.subscribe()
    }

    /// Abort the running tick, and every later one, promptly.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// The engine's token, for wiring into signal handlers and schedulers.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }
}
