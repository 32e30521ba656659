//! Error types -- per-domain error definitions.

/// Top-level flowherd error type.
#[derive(Debug, thiserror::Error)]
pub enum FlowherdError {
    /// Configuration loading or validation error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Stage lifecycle error (spawn, readiness, exit classification).
    #[error("stage error: {0}")]
    Stage(#[from] StageError),

    /// Named-pipe sink error.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file does not exist.
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// TOML parsing failed.
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A field holds a value outside its accepted range.
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Stage lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The stage's executable could not be spawned.
    #[error("failed to spawn stage '{stage}' ({program}): {source}")]
    SpawnFailed {
        stage: String,
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The readiness probe was exhausted before the stage accepted a connection.
    #[error("stage '{stage}' not ready: port {port} refused {attempts} probe attempts")]
    NotReady {
        stage: String,
        port: u16,
        attempts: u32,
    },

    /// A CRITICAL stage exited; the pipeline cannot continue.
    #[error("critical stage '{stage}' exited ({status})")]
    CriticalExit { stage: String, status: String },

    /// A stage declares a dependency that does not exist in the graph.
    #[error("stage '{stage}' depends on unknown stage '{dependency}'")]
    UnknownDependency { stage: String, dependency: String },

    /// A stage declares a dependency that is defined after it, which would
    /// break start ordering.
    #[error("stage '{stage}' depends on '{dependency}' which is declared later")]
    DependencyOrder { stage: String, dependency: String },

    /// Two stages share a name.
    #[error("duplicate stage name: {name}")]
    DuplicateName { name: String },
}

/// Named-pipe sink errors.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Something exists at the sink path that is not a FIFO. Never
    /// auto-remediated; the operator must move the entry aside.
    #[error("sink path {path} exists but is not a FIFO; refusing to touch it")]
    NotAFifo { path: String },

    /// FIFO creation failed.
    #[error("failed to create FIFO at {path}: {source}")]
    CreateFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// FIFO sinks are only supported on Unix platforms.
    #[error("named-pipe sinks are not supported on this platform")]
    Unsupported,
}
