//! Subcommand handlers.

pub mod config;
pub mod status;
pub mod sweep;
