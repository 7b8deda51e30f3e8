use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::channel::Notifier;
use crate::error::{ProbeError, Result};
use crate::job::ProbeJobConfig;
use crate::socket::EphemeralSocket;
use crate::stats::Statistics;
use crate::types::{now_rfc3339, ProbeEvent, ProbeStatus};

const POLL_INTERVAL: Duration = Duration::from_millis(1);
const FORCE_PAYLOAD: [u8; 4] = [0; 4];

/// Resolved destination shared by every attempt of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub addr: SocketAddr,
    /// Literal IP or reverse-DNS name, as shown to the user.
    pub display: String,
}

/// How a single attempt ended. Socket failures are returned as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Timeout,
    Cancelled,
}

/// Run one connect attempt against `target`.
///
/// - Opens a fresh non-blocking socket and starts a connect.
/// - Every millisecond tries a zero-length send (4 bytes with `force`); the
///   first accepted send marks the port open.
/// - A refused connection never accepts the send, so it is classified as a
///   timeout once `config.timeout()` has elapsed.
/// - Updates `stats` and pushes one [`ProbeEvent`] unless cancelled.
///
/// Any connect error other than "in progress" is returned as
/// [`ProbeError::Connect`] and ends the whole run.
pub async fn probe_once(
    target: &ProbeTarget,
    config: &ProbeJobConfig,
    stats: &mut Statistics,
    notifier: &Notifier,
    cancel: &CancellationToken,
) -> Result<AttemptOutcome> {
    let start = Instant::now();
    let timeout = config.timeout();
    let addr = target.addr;

    let mut socket = EphemeralSocket::tcp_for(&addr).map_err(ProbeError::SocketCreate)?;
    socket
        .start_connect(&addr)
        .map_err(|source| ProbeError::Connect { addr, source })?;

    let payload: &[u8] = if config.force { &FORCE_PAYLOAD } else { &[] };
    let status = loop {
        match socket.try_send(payload) {
            Ok(_) => break ProbeStatus::Open,
            Err(e) => trace!(%addr, error = %e, "send not accepted yet"),
        }
        if start.elapsed() >= timeout {
            break ProbeStatus::Timeout;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                socket.close();
                debug!(%addr, "attempt cancelled");
                return Ok(AttemptOutcome::Cancelled);
            }
            _ = time::sleep(POLL_INTERVAL) => {}
        }
    };
    let elapsed_ms = start.elapsed().as_secs_f64() * 1_000.0;
    socket.close();

    let (jitter_ms, outcome) = match status {
        ProbeStatus::Open => (
            stats.record_open(elapsed_ms, config.include_jitter),
            AttemptOutcome::Success,
        ),
        _ => {
            stats.record_timeout();
            (None, AttemptOutcome::Timeout)
        }
    };
    debug!(%addr, ?status, rtt_ms = elapsed_ms, "attempt finished");

    notifier.event(ProbeEvent {
        timestamp: now_rfc3339(),
        destination: target.display.clone(),
        address: addr.ip().to_string(),
        port: addr.port(),
        status,
        rtt_ms: elapsed_ms,
        jitter_ms,
    });
    Ok(outcome)
}
