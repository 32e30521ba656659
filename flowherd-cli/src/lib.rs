//! Flowherd CLI library.
//!
//! Operator tooling that runs next to (not inside) the daemon: status
//! inspection, configuration validation, and the retention sweep.

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
