//! CLI argument definitions for flowherd-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Flowherd network-flow pipeline supervisor.
///
/// Launches and supervises the flow telemetry pipeline: capture stage,
/// fan-out hub, archival writer, and optional aggregation branch.
#[derive(Parser, Debug)]
#[command(name = "flowherd-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to flowherd.toml configuration file.
    #[arg(short, long, default_value = "/etc/flowherd/flowherd.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration and the stage graph, then exit without
    /// starting the pipeline.
    #[arg(long)]
    pub validate: bool,

    /// Override PID file path (takes precedence over config file).
    #[arg(long)]
    pub pid_file: Option<String>,
}
