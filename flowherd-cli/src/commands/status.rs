//! `flowherd status` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use flowherd_core::config::FlowherdConfig;

use crate::cli::StatusArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `status` command.
pub async fn execute(
    args: StatusArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = FlowherdConfig::load(config_path).await?;

    let report = build_status_report(&config, args.verbose);

    writer.render(&report)?;

    Ok(())
}

fn build_status_report(config: &FlowherdConfig, verbose: bool) -> StatusReport {
    let (daemon_running, pid) = check_daemon_status(&config.general.pid_file);
    let health = |enabled: bool| -> String {
        if !enabled {
            "disabled".to_owned()
        } else if daemon_running {
            "running".to_owned()
        } else {
            "stopped".to_owned()
        }
    };

    let branches = vec![
        BranchStatus {
            name: "capture".to_owned(),
            enabled: true,
            health: health(true),
            details: verbose.then(|| {
                format!(
                    "interface={}, port={}",
                    config.pipeline.interface, config.pipeline.capture_port
                )
            }),
        },
        BranchStatus {
            name: "hub".to_owned(),
            enabled: true,
            health: health(true),
            details: verbose.then(|| {
                format!(
                    "port={}, enrichment={}",
                    config.pipeline.hub_port, config.pipeline.enrichment
                )
            }),
        },
        BranchStatus {
            name: "archive".to_owned(),
            enabled: true,
            health: health(true),
            details: verbose.then(|| {
                format!(
                    "root={}, rotation={}, retain_days={}",
                    config.archive.root, config.archive.rotation, config.archive.retain_days
                )
            }),
        },
        BranchStatus {
            name: "aggregate".to_owned(),
            enabled: config.aggregation.enabled,
            health: health(config.aggregation.enabled),
            details: (verbose && config.aggregation.enabled).then(|| {
                format!(
                    "pipe={}, bin_secs={}",
                    config.aggregation.pipe_path, config.aggregation.bin_interval_secs
                )
            }),
        },
    ];

    StatusReport {
        daemon_running,
        pid,
        branches,
    }
}

/// Check if the daemon is running by reading the PID file and probing
/// process existence.
fn check_daemon_status(pid_file: &str) -> (bool, Option<u32>) {
    let pid_path = Path::new(pid_file);

    if !pid_path.exists() {
        debug!(pid_file, "pid file does not exist");
        return (false, None);
    }

    let pid_content = match std::fs::read_to_string(pid_path) {
        Ok(content) => content,
        Err(e) => {
            warn!(pid_file, error = %e, "failed to read pid file");
            return (false, None);
        }
    };

    let pid = match pid_content.trim().parse::<u32>() {
        Ok(p) => p,
        Err(e) => {
            warn!(pid_file, error = %e, "failed to parse pid");
            return (false, None);
        }
    };

    (is_process_alive(pid), Some(pid))
}

/// Check if a process with the given PID is alive.
#[cfg(unix)]
fn is_process_alive(pid: u32) -> bool {
    use std::io::ErrorKind;

    // Signal 0 probes existence without affecting the target.
    // SAFETY: kill(2) with signal 0 only performs permission checks.
    let result = unsafe { libc::kill(pid as libc::pid_t, 0) };

    if result == 0 {
        true
    } else {
        let err = std::io::Error::last_os_error();
        match err.kind() {
            ErrorKind::PermissionDenied => true, // Exists, just not ours to signal
            _ => false,
        }
    }
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    warn!("process liveness check not supported on this platform");
    false
}

#[derive(Serialize)]
pub struct StatusReport {
    pub daemon_running: bool,
    pub pid: Option<u32>,
    pub branches: Vec<BranchStatus>,
}

#[derive(Serialize)]
pub struct BranchStatus {
    pub name: String,
    pub enabled: bool,
    pub health: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Render for StatusReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.daemon_running {
            writeln!(
                w,
                "Daemon: {} (pid: {})",
                "running".green().bold(),
                self.pid
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "unknown".to_owned())
            )?;
        } else {
            writeln!(w, "Daemon: {}", "not running".red().bold())?;
        }

        writeln!(w)?;
        writeln!(w, "{:<12} {:<10} Health", "Branch", "Enabled")?;
        writeln!(w, "{}", "-".repeat(40))?;

        for b in &self.branches {
            let enabled_str = if b.enabled { "yes" } else { "no" };
            let health_colored = match b.health.as_str() {
                "running" => b.health.green(),
                "stopped" => b.health.yellow(),
                "disabled" => b.health.dimmed(),
                _ => b.health.normal(),
            };

            writeln!(w, "{:<12} {:<10} {}", b.name, enabled_str, health_colored)?;

            if let Some(details) = &b.details {
                writeln!(w, "  {}", details.dimmed())?;
            }
        }

        Ok(())
    }
}
