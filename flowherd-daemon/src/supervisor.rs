//! Pipeline supervision -- the process table and the liveness loop.
//!
//! The [`Supervisor`] is the only owner of child process handles. It
//! launches the stage graph in order, then polls child liveness on a
//! fixed interval until shut down:
//!
//! - a CRITICAL stage exit makes the whole run fatal: everything still
//!   running is torn down and the error propagates out of [`Supervisor::run`]
//! - a DEGRADABLE stage exit schedules an in-place restart with
//!   exponential backoff; the pipeline keeps serving its other branches
//!
//! Restart deadlines are checked on poll ticks rather than slept on, so
//! a backoff in progress never delays the detection of a critical exit.

use std::path::Path;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, watch};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

use flowherd_core::config::{FlowherdConfig, PipelineConfig};
use flowherd_core::error::{FlowherdError, StageError};
use flowherd_core::stage::{Criticality, PipelineState, StageSpec, validate_graph};

use crate::launcher::{self, LaunchedStage};
use crate::shutdown;

/// A stage that stays up this long is considered stable; its next exit
/// starts a fresh failure streak instead of extending the old one.
const STABLE_UPTIME: Duration = Duration::from_secs(60);

/// Supervises one pipeline run from launch to teardown.
#[derive(Debug)]
pub struct Supervisor {
    config: FlowherdConfig,
    specs: Vec<StageSpec>,
    stages: Vec<LaunchedStage>,
    state_tx: watch::Sender<PipelineState>,
}

impl Supervisor {
    /// Validate the stage graph and build a supervisor for it.
    ///
    /// The returned watch receiver publishes the pipeline state for
    /// status reporting; it starts at [`PipelineState::Starting`].
    pub fn new(
        config: FlowherdConfig,
        specs: Vec<StageSpec>,
    ) -> Result<(Self, watch::Receiver<PipelineState>), FlowherdError> {
        validate_graph(&specs)?;
        let (state_tx, state_rx) = watch::channel(PipelineState::Starting);
        Ok((
            Self {
                config,
                specs,
                stages: Vec::new(),
                state_tx,
            },
            state_rx,
        ))
    }

    /// Launch the pipeline and supervise it until shutdown.
    ///
    /// Blocks until `shutdown_rx` fires (clean stop, returns `Ok`) or a
    /// critical stage is lost (teardown, returns the stage error).
    pub async fn run(
        mut self,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), FlowherdError> {
        let grace = Duration::from_millis(self.config.pipeline.shutdown_grace_ms);

        info!(stages = self.specs.len(), "starting pipeline");
        let specs = std::mem::take(&mut self.specs);
        match launcher::launch_all(specs, &self.config.pipeline).await {
            Ok(stages) => self.stages = stages,
            Err(e) => {
                self.state_tx.send_replace(PipelineState::Fatal);
                return Err(e.into());
            }
        }
        self.state_tx.send_replace(PipelineState::Running);
        info!("pipeline running");

        let mut poll = interval(Duration::from_millis(self.config.pipeline.poll_interval_ms));
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    if let Err(e) = self.poll_once().await {
                        error!(error = %e, "critical stage lost, tearing down pipeline");
                        self.state_tx.send_replace(PipelineState::Fatal);
                        shutdown::terminate_all(&mut self.stages, grace).await;
                        return Err(e.into());
                    }
                    self.state_tx.send_replace(current_state(&self.stages));
                }
                _ = shutdown_rx.recv() => {
                    info!("shutdown requested, stopping pipeline");
                    break;
                }
            }
        }

        self.state_tx.send_replace(PipelineState::ShuttingDown);
        shutdown::terminate_all(&mut self.stages, grace).await;
        self.state_tx.send_replace(PipelineState::Stopped);
        info!("pipeline stopped");
        Ok(())
    }

    /// One liveness pass over the process table.
    ///
    /// Reaps exited children, schedules or executes degradable restarts,
    /// and surfaces critical exits as errors.
    async fn poll_once(&mut self) -> Result<(), StageError> {
        let now = Instant::now();

        for stage in &mut self.stages {
            if stage.disabled {
                continue;
            }

            if let Some(child) = stage.child.as_mut() {
                match child.try_wait() {
                    Ok(None) => {}
                    Ok(Some(status)) => {
                        stage.child = None;
                        stage.pid = None;
                        let uptime = stage.started_at.elapsed();
                        warn!(
                            stage = %stage.spec.name,
                            status = %status,
                            uptime_secs = uptime.as_secs(),
                            "stage exited"
                        );
                        match stage.spec.criticality {
                            Criticality::Critical => {
                                return Err(StageError::CriticalExit {
                                    stage: stage.spec.name.clone(),
                                    status: status.to_string(),
                                });
                            }
                            Criticality::Degradable => {
                                schedule_restart(stage, &self.config.pipeline, uptime);
                            }
                        }
                    }
                    Err(e) => {
                        warn!(stage = %stage.spec.name, error = %e, "liveness check failed");
                    }
                }
            } else if stage.restart_at.is_some_and(|deadline| now >= deadline) {
                if let Err(e) = launcher::relaunch(stage, &self.config.pipeline).await {
                    warn!(stage = %stage.spec.name, error = %e, "restart attempt failed");
                    schedule_restart(stage, &self.config.pipeline, Duration::ZERO);
                }
            }
        }

        Ok(())
    }
}

/// Schedule the next restart for a degradable stage, or disable it once
/// the failure budget is spent.
fn schedule_restart(stage: &mut LaunchedStage, pipeline: &PipelineConfig, uptime: Duration) {
    stage.consecutive_failures = if uptime >= STABLE_UPTIME {
        1
    } else {
        stage.consecutive_failures + 1
    };

    if stage.consecutive_failures > pipeline.max_consecutive_failures {
        warn!(
            stage = %stage.spec.name,
            failures = stage.consecutive_failures,
            "restart budget exhausted, disabling stage"
        );
        stage.disabled = true;
        stage.restart_at = None;
        return;
    }

    let backoff = restart_backoff(pipeline, stage.consecutive_failures);
    info!(
        stage = %stage.spec.name,
        failures = stage.consecutive_failures,
        backoff_ms = backoff.as_millis() as u64,
        "restart scheduled"
    );
    stage.restart_at = Some(Instant::now() + backoff);
}

/// Exponential backoff: floor doubled per consecutive failure, capped.
fn restart_backoff(pipeline: &PipelineConfig, failures: u32) -> Duration {
    let exp = failures.saturating_sub(1).min(16);
    let ms = pipeline
        .restart_backoff_ms
        .saturating_mul(1u64 << exp)
        .min(pipeline.restart_backoff_cap_ms);
    Duration::from_millis(ms)
}

/// Aggregate pipeline state from the process table.
///
/// A disabled stage keeps the pipeline Degraded for the rest of the run;
/// the operator should see the loss rather than a false Running.
fn current_state(stages: &[LaunchedStage]) -> PipelineState {
    let degraded = stages
        .iter()
        .any(|s| s.disabled || !s.is_running());
    if degraded {
        PipelineState::Degraded
    } else {
        PipelineState::Running
    }
}

/// Write the current process PID to a file.
///
/// Uses `create_new` so a second daemon instance fails fast instead of
/// clobbering the first one's PID file.
pub fn write_pid_file(path: &Path) -> anyhow::Result<()> {
    use std::fs::{self, OpenOptions};
    use std::io::{ErrorKind, Write};

    if let Some(parent) = path.parent() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            let mut builder = fs::DirBuilder::new();
            builder.mode(0o700).recursive(true);
            builder.create(parent)?;
        }
        #[cfg(not(unix))]
        {
            fs::create_dir_all(parent)?;
        }
    }

    let pid = std::process::id();

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let existing_pid = fs::read_to_string(path).unwrap_or_else(|_| "unknown".to_string());
            return Err(anyhow::anyhow!(
                "PID file {} already exists with PID: {}. Is another instance running?",
                path.display(),
                existing_pid.trim()
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let metadata = file.metadata()?;
    if !metadata.is_file() {
        let _ = fs::remove_file(path);
        return Err(anyhow::anyhow!(
            "PID file {} is not a regular file",
            path.display()
        ));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    writeln!(file, "{}", pid)?;

    info!(pid, path = %path.display(), "PID file written");
    Ok(())
}

/// Remove the PID file on daemon shutdown.
///
/// Logs a warning but does not fail if the file cannot be removed.
pub fn remove_pid_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "failed to remove PID file");
    } else {
        info!(path = %path.display(), "PID file removed");
    }
}
