// wlanmeter-api: Timed transfers and round-trip probes against speed-test endpoints

pub mod error;
pub mod latency;
pub mod transfer;
pub mod transport;

pub use error::Error;
pub use latency::tcp_round_trip;
pub use transfer::{SpeedClient, Transfer};
pub use transport::{TlsMode, TransportConfig};
