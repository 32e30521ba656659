//! Stage launching -- ordered spawn with readiness gating.
//!
//! Stages are spawned strictly in declaration order, and a stage with a
//! TCP readiness probe blocks its dependents until the probe succeeds.
//! If any launch fails, every already-started stage is torn down in
//! reverse order before the error propagates, so a failed startup never
//! leaves orphaned children behind.

use std::time::{Duration, Instant};

use tokio::process::{Child, Command};
use tracing::{info, warn};

use flowherd_core::config::PipelineConfig;
use flowherd_core::error::StageError;
use flowherd_core::stage::{ReadinessProbe, StageSpec};

use crate::probe;
use crate::shutdown;

/// One supervised stage: its spec plus runtime bookkeeping.
#[derive(Debug)]
pub struct LaunchedStage {
    /// The spec this stage was launched from.
    pub spec: StageSpec,
    /// Running child handle; `None` while dead, restarting, or torn down.
    pub child: Option<Child>,
    /// PID of the current child, kept for logging after the handle is gone.
    pub pid: Option<u32>,
    /// When the current child was spawned.
    pub started_at: Instant,
    /// Exits since the stage last proved stable.
    pub consecutive_failures: u32,
    /// Deadline before the next restart attempt, when one is scheduled.
    pub restart_at: Option<Instant>,
    /// Set once restarts are exhausted; a disabled stage stays down.
    pub disabled: bool,
}

impl LaunchedStage {
    /// Whether the stage currently has a live child handle.
    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }
}

/// Spawn one stage and gate on its readiness probe.
///
/// If the probe is exhausted the child is killed before the error
/// returns; a stage that never became ready must not linger.
pub async fn launch_stage(
    spec: StageSpec,
    pipeline: &PipelineConfig,
) -> Result<LaunchedStage, StageError> {
    let mut child = spawn(&spec)?;
    let pid = child.id();
    info!(stage = %spec.name, program = %spec.program, pid, "stage spawned");

    if let ReadinessProbe::TcpPort(port) = spec.readiness {
        let interval = Duration::from_millis(pipeline.probe_interval_ms);
        if let Err(e) =
            probe::wait_until_ready(&spec.name, port, pipeline.probe_attempts, interval).await
        {
            warn!(stage = %spec.name, pid, "stage never became ready, killing it");
            if let Err(kill_err) = child.start_kill() {
                warn!(stage = %spec.name, error = %kill_err, "failed to kill unready stage");
            }
            let _ = child.wait().await;
            return Err(e);
        }
        info!(stage = %spec.name, port, "stage ready");
    }

    Ok(LaunchedStage {
        spec,
        child: Some(child),
        pid,
        started_at: Instant::now(),
        consecutive_failures: 0,
        restart_at: None,
        disabled: false,
    })
}

/// Launch all stages in declaration order.
///
/// On any failure the already-started stages are terminated in reverse
/// order before the error is returned.
pub async fn launch_all(
    specs: Vec<StageSpec>,
    pipeline: &PipelineConfig,
) -> Result<Vec<LaunchedStage>, StageError> {
    let mut stages: Vec<LaunchedStage> = Vec::with_capacity(specs.len());

    for spec in specs {
        match launch_stage(spec, pipeline).await {
            Ok(stage) => stages.push(stage),
            Err(e) => {
                warn!(error = %e, "startup failed, tearing down already-started stages");
                let grace = Duration::from_millis(pipeline.shutdown_grace_ms);
                shutdown::terminate_all(&mut stages, grace).await;
                return Err(e);
            }
        }
    }

    Ok(stages)
}

/// Respawn a dead stage in place, re-running its readiness probe.
pub async fn relaunch(
    stage: &mut LaunchedStage,
    pipeline: &PipelineConfig,
) -> Result<(), StageError> {
    let mut child = spawn(&stage.spec)?;
    let pid = child.id();

    if let ReadinessProbe::TcpPort(port) = stage.spec.readiness {
        let interval = Duration::from_millis(pipeline.probe_interval_ms);
        if let Err(e) =
            probe::wait_until_ready(&stage.spec.name, port, pipeline.probe_attempts, interval)
                .await
        {
            if let Err(kill_err) = child.start_kill() {
                warn!(stage = %stage.spec.name, error = %kill_err, "failed to kill unready stage");
            }
            let _ = child.wait().await;
            return Err(e);
        }
    }

    info!(stage = %stage.spec.name, pid, "stage restarted");
    stage.child = Some(child);
    stage.pid = pid;
    stage.started_at = Instant::now();
    stage.restart_at = None;
    Ok(())
}

/// Spawn the stage's executable with its rendered arguments.
///
/// `kill_on_drop` backstops supervisor panics; normal teardown goes
/// through [`shutdown::terminate_all`].
fn spawn(spec: &StageSpec) -> Result<Child, StageError> {
    Command::new(&spec.program)
        .args(&spec.args)
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| StageError::SpawnFailed {
            stage: spec.name.clone(),
            program: spec.program.clone(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_pipeline() -> PipelineConfig {
        PipelineConfig {
            probe_interval_ms: 20,
            probe_attempts: 3,
            shutdown_grace_ms: 1_000,
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn launch_stage_spawns_and_reports_pid() {
        let spec = StageSpec::new("capture", "sleep").args(["5"]);
        let mut stage = launch_stage(spec, &fast_pipeline()).await.unwrap();

        assert!(stage.is_running());
        assert!(stage.pid.is_some());
        assert_eq!(stage.consecutive_failures, 0);

        let mut child = stage.child.take().unwrap();
        child.start_kill().unwrap();
        let _ = child.wait().await;
    }

    #[tokio::test]
    async fn launch_stage_missing_program_is_spawn_failure() {
        let spec = StageSpec::new("capture", "/nonexistent/flow-capture");
        let err = launch_stage(spec, &fast_pipeline()).await.unwrap_err();
        match err {
            StageError::SpawnFailed { stage, program, .. } => {
                assert_eq!(stage, "capture");
                assert_eq!(program, "/nonexistent/flow-capture");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn launch_stage_kills_child_when_probe_exhausted() {
        // Listener bound then dropped: the port stays closed, so the
        // probe must fail and the child must not survive.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let spec = StageSpec::new("capture", "sleep").args(["30"]).tcp_ready(port);
        let err = launch_stage(spec, &fast_pipeline()).await.unwrap_err();
        assert!(matches!(err, StageError::NotReady { .. }));
    }

    #[tokio::test]
    async fn launch_all_tears_down_on_midway_failure() {
        let specs = vec![
            StageSpec::new("capture", "sleep").args(["30"]),
            StageSpec::new("hub", "/nonexistent/flow-hub").depends_on("capture"),
        ];
        let err = launch_all(specs, &fast_pipeline()).await.unwrap_err();
        assert!(matches!(err, StageError::SpawnFailed { .. }));
    }

    #[tokio::test]
    async fn relaunch_replaces_dead_child() {
        let spec = StageSpec::new("aggregate", "sleep").args(["0"]);
        let mut stage = launch_stage(spec, &fast_pipeline()).await.unwrap();

        // Wait for the short-lived child to exit.
        let mut child = stage.child.take().unwrap();
        let _ = child.wait().await;
        let old_pid = stage.pid;

        relaunch(&mut stage, &fast_pipeline()).await.unwrap();
        assert!(stage.is_running());
        assert_ne!(stage.pid, old_pid);
        assert!(stage.restart_at.is_none());

        let mut child = stage.child.take().unwrap();
        child.start_kill().unwrap();
        let _ = child.wait().await;
    }
}
