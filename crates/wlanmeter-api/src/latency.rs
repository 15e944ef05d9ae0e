// TCP round-trip probe
//
// A TCP handshake is one network round trip, so timing `connect()` gives an
// RTT sample without raw sockets or elevated privileges. Name resolution is
// done before the clock starts.

use std::time::{Duration, Instant};

use tokio::net::{TcpStream, lookup_host};
use tracing::trace;

use crate::error::Error;

/// Measure one TCP connect round trip to `target` (`host:port`).
///
/// `timeout` bounds resolution and the handshake separately. The socket is
/// closed immediately after the handshake completes.
pub async fn tcp_round_trip(target: &str, timeout: Duration) -> Result<Duration, Error> {
    let addr = tokio::time::timeout(timeout, lookup_host(target))
        .await
        .map_err(|_| Error::Timeout { timeout })?
        .map_err(|e| Error::Connect {
            target: target.to_owned(),
            reason: e.to_string(),
        })?
        .next()
        .ok_or_else(|| Error::Resolve {
            target: target.to_owned(),
        })?;

    let start = Instant::now();
    let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| Error::Timeout { timeout })?
        .map_err(|e| Error::Connect {
            target: target.to_owned(),
            reason: e.to_string(),
        })?;
    let rtt = start.elapsed();
    drop(stream);

    trace!(peer = target, %addr, ?rtt, "tcp round trip");
    Ok(rtt)
}
