//! flowherd-daemon entry point.
//!
//! Loads configuration, prepares the aggregation sink, writes the PID
//! file, and hands off to the [`Supervisor`]. Exit codes distinguish the
//! failure classes so init systems can react:
//!
//! - 0: clean shutdown
//! - 1: internal error
//! - 2: configuration error
//! - 3: startup failure (spawn or readiness)
//! - 4: critical stage lost at runtime
//! - 5: aggregation sink unusable

use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::sync::broadcast;
use tracing::{error, info};

use flowherd_core::config::FlowherdConfig;
use flowherd_core::error::{FlowherdError, StageError};
use flowherd_daemon::cli::DaemonCli;
use flowherd_daemon::supervisor::{self, Supervisor};
use flowherd_daemon::{graph, logging, shutdown, sink};

#[tokio::main]
async fn main() {
    std::process::exit(run().await);
}

async fn run() -> i32 {
    let cli = DaemonCli::parse();

    let mut config = match FlowherdConfig::load(&cli.config).await {
        Ok(c) => c,
        Err(e) => {
            eprintln!("flowherd-daemon: {e}");
            return exit_code(&e);
        }
    };

    // CLI overrides beat both the file and the environment.
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    if let Some(pid_file) = cli.pid_file {
        config.general.pid_file = pid_file;
    }
    if let Err(e) = config.validate() {
        eprintln!("flowherd-daemon: {e}");
        return exit_code(&e);
    }

    let specs = match graph::build_stage_graph(&config) {
        Ok(specs) => specs,
        Err(e) => {
            eprintln!("flowherd-daemon: {e}");
            return exit_code(&e);
        }
    };

    if cli.validate {
        println!(
            "configuration OK: {} ({} stages)",
            cli.config.display(),
            specs.len()
        );
        return 0;
    }

    if let Err(e) = logging::init_tracing(&config.general) {
        eprintln!("flowherd-daemon: {e}");
        return 1;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "flowherd-daemon starting"
    );

    if config.aggregation.enabled {
        if let Err(e) = sink::ensure_fifo(Path::new(&config.aggregation.pipe_path)) {
            let e = FlowherdError::Sink(e);
            error!(error = %e, "aggregation sink unusable");
            return exit_code(&e);
        }
    }

    let pid_path = (!config.general.pid_file.is_empty())
        .then(|| PathBuf::from(&config.general.pid_file));
    if let Some(path) = &pid_path {
        if let Err(e) = supervisor::write_pid_file(path) {
            error!(error = %e, "failed to write PID file");
            return 1;
        }
    }

    let (sup, _state_rx) = match Supervisor::new(config, specs) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "invalid stage graph");
            if let Some(path) = &pid_path {
                supervisor::remove_pid_file(path);
            }
            return exit_code(&e);
        }
    };

    let (shutdown_tx, shutdown_rx) = broadcast::channel(4);
    tokio::spawn(async move {
        match shutdown::wait_for_shutdown_signal().await {
            Ok(signal) => info!(signal, "shutdown signal received"),
            Err(e) => error!(error = %e, "failed to install signal handlers, stopping"),
        }
        let _ = shutdown_tx.send(());
    });

    let result = sup.run(shutdown_rx).await;

    if let Some(path) = &pid_path {
        supervisor::remove_pid_file(path);
    }

    match result {
        Ok(()) => {
            info!("flowherd-daemon shut down");
            0
        }
        Err(e) => {
            error!(error = %e, "pipeline failed");
            exit_code(&e)
        }
    }
}

fn exit_code(err: &FlowherdError) -> i32 {
    match err {
        FlowherdError::Config(_) => 2,
        FlowherdError::Stage(StageError::CriticalExit { .. }) => 4,
        FlowherdError::Stage(_) => 3,
        FlowherdError::Sink(_) => 5,
        FlowherdError::Io(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowherd_core::error::{ConfigError, SinkError};

    #[test]
    fn exit_codes_by_failure_class() {
        let config: FlowherdError = ConfigError::ParseFailed {
            reason: "x".to_owned(),
        }
        .into();
        assert_eq!(exit_code(&config), 2);

        let not_ready: FlowherdError = StageError::NotReady {
            stage: "capture".to_owned(),
            port: 561,
            attempts: 20,
        }
        .into();
        assert_eq!(exit_code(&not_ready), 3);

        let critical: FlowherdError = StageError::CriticalExit {
            stage: "hub".to_owned(),
            status: "exit code 1".to_owned(),
        }
        .into();
        assert_eq!(exit_code(&critical), 4);

        let sink: FlowherdError = SinkError::NotAFifo {
            path: "/tmp/x".to_owned(),
        }
        .into();
        assert_eq!(exit_code(&sink), 5);
    }
}
