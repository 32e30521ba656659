//! `flowherd sweep` command handler
//!
//! Runs one retention sweep over the archive tree. Intended to be
//! invoked from cron or a systemd timer; the daemon itself never touches
//! closed archive files.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use tracing::info;

use flowherd_archive::retention::{RetentionPolicy, SweepReport, sweep};
use flowherd_core::config::FlowherdConfig;

use crate::cli::SweepArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `sweep` command.
pub async fn execute(
    args: SweepArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = FlowherdConfig::load(config_path).await?;

    let root = args
        .root
        .unwrap_or_else(|| PathBuf::from(&config.archive.root));
    let policy = RetentionPolicy::from_config(&config.archive);

    info!(
        root = %root.display(),
        compress_after_days = config.archive.compress_after_days,
        retain_days = config.archive.retain_days,
        "starting retention sweep"
    );

    // The sweep is synchronous filesystem work; keep it off the runtime.
    let report = tokio::task::spawn_blocking({
        let root = root.clone();
        move || sweep(&root, &policy, SystemTime::now())
    })
    .await
    .map_err(|e| CliError::Command(format!("sweep task failed: {e}")))??;

    writer.render(&SweepSummary::new(&root, report))?;

    Ok(())
}

/// Sweep outcome as rendered to the operator.
#[derive(Serialize)]
pub struct SweepSummary {
    pub root: String,
    pub scanned: usize,
    pub compressed: usize,
    pub deleted: usize,
    pub pruned_dirs: usize,
    pub errors: Vec<String>,
}

impl SweepSummary {
    fn new(root: &Path, report: SweepReport) -> Self {
        Self {
            root: root.display().to_string(),
            scanned: report.scanned,
            compressed: report.compressed,
            deleted: report.deleted,
            pruned_dirs: report.pruned_dirs,
            errors: report.errors,
        }
    }
}

impl Render for SweepSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Retention sweep: {}", self.root.bold())?;
        writeln!(w, "  Scanned:    {}", self.scanned)?;
        writeln!(w, "  Compressed: {}", self.compressed)?;
        writeln!(w, "  Deleted:    {}", self.deleted)?;
        writeln!(w, "  Pruned dirs: {}", self.pruned_dirs)?;

        if self.errors.is_empty() {
            writeln!(w, "  Result: {}", "OK".green().bold())?;
        } else {
            writeln!(
                w,
                "  Result: {} ({} errors)",
                "PARTIAL".yellow().bold(),
                self.errors.len()
            )?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(errors: Vec<String>) -> SweepSummary {
        SweepSummary {
            root: "/var/lib/flowherd/archive".to_owned(),
            scanned: 10,
            compressed: 2,
            deleted: 1,
            pruned_dirs: 1,
            errors,
        }
    }

    #[test]
    fn render_text_clean_sweep() {
        let mut buffer = Vec::new();
        summary(Vec::new()).render_text(&mut buffer).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("Compressed: 2"));
        assert!(output.contains("Deleted:    1"));
        assert!(output.contains("OK"));
        assert!(!output.contains("Error:"));
    }

    #[test]
    fn render_text_with_errors() {
        let mut buffer = Vec::new();
        summary(vec!["/a/b: permission denied".to_owned()])
            .render_text(&mut buffer)
            .unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert!(output.contains("PARTIAL"));
        assert!(output.contains("permission denied"));
    }

    #[test]
    fn json_carries_all_counters() {
        let json = serde_json::to_value(summary(Vec::new())).unwrap();
        assert_eq!(json["scanned"], 10);
        assert_eq!(json["compressed"], 2);
        assert_eq!(json["deleted"], 1);
        assert_eq!(json["pruned_dirs"], 1);
    }
}
