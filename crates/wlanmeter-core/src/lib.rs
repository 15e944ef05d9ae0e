// wlanmeter-core: WLAN link probing, speed testing and the per-tick
// measurement engine. Consumers (the CLI) only schedule ticks and persist
// the resulting samples.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod probe;
pub mod record;
pub mod speed;

// ── Primary re-exports ──────────────────────────────────────────────
pub use classify::{QualityRating, classify, dbm_to_pct, pct_to_dbm};
pub use config::{EngineConfig, Endpoints, MeasurementMode, ProbeConfig, SizeClass, SpeedTestConfig};
pub use engine::{EngineState, MeasurementEngine};
pub use error::CoreError;
pub use model::{Band, Sample, SignalSource, SpeedMetrics, WlanMetrics};
pub use probe::{LinkInfoSource, LinkReading, ProbeError, WlanProbe};
pub use record::{CSV_COLUMNS, RecordFormat, csv_header};
pub use speed::SpeedTester;

// Transport types consumers need to configure the engine.
pub use wlanmeter_api::{SpeedClient, TlsMode, TransportConfig};
