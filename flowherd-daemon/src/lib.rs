//! Flowherd daemon library.
//!
//! The daemon supervises a pipeline of external flow-telemetry
//! processes: a capture stage, a fan-out hub, an archival writer, and an
//! optional aggregation stage feeding a named pipe. Modules:
//!
//! - [`graph`] renders the stage graph from configuration
//! - [`launcher`] spawns stages in dependency order with readiness gating
//! - [`probe`] is the bounded-retry TCP readiness check
//! - [`sink`] prepares the aggregation FIFO
//! - [`supervisor`] owns the process table and the liveness loop
//! - [`shutdown`] tears stages down in reverse order

pub mod cli;
pub mod graph;
pub mod launcher;
pub mod logging;
pub mod probe;
pub mod shutdown;
pub mod sink;
pub mod supervisor;
