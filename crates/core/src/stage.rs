//! Stage model -- the unit of the pipeline graph.
//!
//! A [`StageSpec`] describes one external process: how to launch it, what
//! it depends on, how readiness is detected, and how fatal its loss is.
//! The supervisor treats every stage uniformly; variants differ only in
//! their command template and [`Criticality`].
//!
//! # Pipeline state machine
//! ```text
//! Starting -> Running -> Degraded -> Running      (self-healing)
//! Running  -> Fatal                               (critical-stage loss)
//! Running  -> ShuttingDown -> Stopped             (operator-initiated)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StageError;

/// How fatal the loss of a stage is to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criticality {
    /// Death of this stage tears down the whole pipeline. Capture and hub
    /// are critical: restarting them would invalidate every downstream
    /// readiness assumption.
    Critical,
    /// Death of this stage is recoverable; the supervisor restarts it with
    /// backoff and the pipeline keeps serving its other branches.
    Degradable,
}

impl fmt::Display for Criticality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Degradable => write!(f, "degradable"),
        }
    }
}

/// How the launcher detects that a stage is accepting connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadinessProbe {
    /// Bounded-retry TCP connect against the stage's listen port.
    TcpPort(u16),
    /// Sink-only stage: start and assume ready.
    None,
}

/// One external process plus its startup and health metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSpec {
    /// Stage name, unique within a run.
    pub name: String,
    /// Executable to launch.
    pub program: String,
    /// Arguments, fully rendered from configuration.
    pub args: Vec<String>,
    /// At most one upstream stage that must be ready before this one starts.
    pub depends_on: Option<String>,
    /// Readiness detection for this stage.
    pub readiness: ReadinessProbe,
    /// Whether loss of this stage is fatal.
    pub criticality: Criticality,
}

impl StageSpec {
    /// Create a stage with no dependency, no readiness probe, and
    /// degradable criticality.
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            depends_on: None,
            readiness: ReadinessProbe::None,
            criticality: Criticality::Degradable,
        }
    }

    /// Append arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Declare the upstream stage this one depends on.
    pub fn depends_on(mut self, upstream: impl Into<String>) -> Self {
        self.depends_on = Some(upstream.into());
        self
    }

    /// Gate dependents on a TCP connect probe against `port`.
    pub fn tcp_ready(mut self, port: u16) -> Self {
        self.readiness = ReadinessProbe::TcpPort(port);
        self
    }

    /// Mark the stage as critical.
    pub fn critical(mut self) -> Self {
        self.criticality = Criticality::Critical;
        self
    }
}

/// Validate a stage graph.
///
/// Stages must be declared in topological order: names unique, and every
/// dependency declared before its dependent. Because each stage has at
/// most one upstream, this also guarantees the graph is an acyclic chain.
pub fn validate_graph(specs: &[StageSpec]) -> Result<(), StageError> {
    let mut seen: Vec<&str> = Vec::with_capacity(specs.len());
    for spec in specs {
        if seen.contains(&spec.name.as_str()) {
            return Err(StageError::DuplicateName {
                name: spec.name.clone(),
            });
        }
        if let Some(dep) = &spec.depends_on {
            if !seen.contains(&dep.as_str()) {
                let err = if specs.iter().any(|s| &s.name == dep) {
                    StageError::DependencyOrder {
                        stage: spec.name.clone(),
                        dependency: dep.clone(),
                    }
                } else {
                    StageError::UnknownDependency {
                        stage: spec.name.clone(),
                        dependency: dep.clone(),
                    }
                };
                return Err(err);
            }
        }
        seen.push(&spec.name);
    }
    Ok(())
}

/// Supervisor state for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    /// Stages are being launched and readiness-gated.
    Starting,
    /// All enabled stages alive.
    Running,
    /// At least one degradable stage lost, restarting, or disabled.
    Degraded,
    /// Teardown in progress after a shutdown signal or fatal failure.
    ShuttingDown,
    /// Clean shutdown completed.
    Stopped,
    /// A critical stage was lost; the pipeline cannot continue.
    Fatal,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Degraded => write!(f, "degraded"),
            Self::ShuttingDown => write!(f, "shutting-down"),
            Self::Stopped => write!(f, "stopped"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}
