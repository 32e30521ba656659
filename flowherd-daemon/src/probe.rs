//! TCP readiness probing.
//!
//! A stage that listens on a port is considered ready once a local TCP
//! connect succeeds. The probe retries on a fixed interval up to a
//! bounded attempt count; exhaustion is a startup failure, not a hang.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::debug;

use flowherd_core::error::StageError;

/// Per-attempt connect timeout. Connections to localhost either succeed
/// or get refused quickly; this only bounds pathological cases.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Wait until `stage` accepts a TCP connection on `port`.
///
/// Probes `127.0.0.1:port` up to `attempts` times, sleeping `interval`
/// between attempts. The successfully opened connection is dropped
/// immediately; only connectability matters.
pub async fn wait_until_ready(
    stage: &str,
    port: u16,
    attempts: u32,
    interval: Duration,
) -> Result<(), StageError> {
    for attempt in 1..=attempts {
        match timeout(CONNECT_TIMEOUT, TcpStream::connect(("127.0.0.1", port))).await {
            Ok(Ok(_stream)) => {
                debug!(stage, port, attempt, "readiness probe succeeded");
                return Ok(());
            }
            Ok(Err(e)) => {
                debug!(stage, port, attempt, error = %e, "readiness probe refused");
            }
            Err(_elapsed) => {
                debug!(stage, port, attempt, "readiness probe timed out");
            }
        }
        if attempt < attempts {
            sleep(interval).await;
        }
    }

    Err(StageError::NotReady {
        stage: stage.to_owned(),
        port,
        attempts,
    })
}
