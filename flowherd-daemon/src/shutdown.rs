//! Graceful teardown -- reverse-order termination and signal handling.
//!
//! Stages are terminated strictly in reverse start order, one at a time:
//! downstream consumers go first so upstream stages never write into a
//! dead peer. Each stage gets SIGTERM, a bounded grace period to drain
//! and exit, then SIGKILL.

use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, warn};

use crate::launcher::LaunchedStage;

/// Terminate all stages in reverse start order.
///
/// Idempotent: stages whose child handle is already gone are skipped, so
/// calling this again (or after a partial teardown) is a no-op for them.
/// Termination failures are logged, never returned; teardown always
/// visits every stage.
pub async fn terminate_all(stages: &mut [LaunchedStage], grace: Duration) {
    for stage in stages.iter_mut().rev() {
        let Some(mut child) = stage.child.take() else {
            continue;
        };
        let name = stage.spec.name.as_str();
        stage.restart_at = None;

        if let Some(pid) = child.id() {
            info!(stage = name, pid, "sending SIGTERM");
            // SAFETY: plain kill(2) on a PID this process spawned and
            // still holds unreaped.
            unsafe {
                libc::kill(pid as i32, libc::SIGTERM);
            }
        }

        match timeout(grace, child.wait()).await {
            Ok(Ok(status)) => {
                info!(stage = name, status = %status, "stage exited");
            }
            Ok(Err(e)) => {
                warn!(stage = name, error = %e, "failed waiting for stage exit");
            }
            Err(_elapsed) => {
                warn!(
                    stage = name,
                    grace_ms = grace.as_millis() as u64,
                    "grace period expired, escalating to SIGKILL"
                );
                if let Err(e) = child.start_kill() {
                    warn!(stage = name, error = %e, "SIGKILL failed");
                }
                let _ = child.wait().await;
            }
        }

        stage.pid = None;
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
pub async fn wait_for_shutdown_signal() -> anyhow::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}
