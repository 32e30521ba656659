//! Flowherd core library.
//!
//! Shared types for the flowherd pipeline supervisor: the stage model
//! (what a pipeline stage is and how it is probed), domain errors, and
//! the unified `flowherd.toml` configuration.

pub mod config;
pub mod error;
pub mod stage;

// Re-export the types most callers need at the crate root.

pub use config::FlowherdConfig;
pub use error::{ConfigError, FlowherdError, SinkError, StageError};
pub use stage::{Criticality, PipelineState, ReadinessProbe, StageSpec};
