//! Retention sweep -- age-based compression and deletion of closed
//! archive files.
//!
//! The sweep runs on an external schedule (typically once daily) and is
//! independent of the supervisor's process lifetime. It only ever sees
//! closed files: rotation closes a file before the next one opens, and
//! both age thresholds are required by config validation to exceed any
//! single rotation interval.
//!
//! Per-file I/O failures (permissions, disk full) are logged and
//! collected in the [`SweepReport`]; they never abort the sweep, which
//! simply resumes on its next scheduled invocation.

use std::fs::{self, File, FileTimes};
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use tracing::{debug, warn};

use flowherd_core::config::ArchiveConfig;

use crate::error::ArchiveError;

const SECS_PER_DAY: u64 = 86_400;

/// Age thresholds for the retention sweep.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    /// Files older than this are compressed in place.
    pub compress_after: Duration,
    /// Files older than this are deleted, compressed or not.
    pub retain_for: Duration,
}

impl RetentionPolicy {
    /// Build a policy from the `[archive]` config section.
    pub fn from_config(cfg: &ArchiveConfig) -> Self {
        Self {
            compress_after: Duration::from_secs(u64::from(cfg.compress_after_days) * SECS_PER_DAY),
            retain_for: Duration::from_secs(u64::from(cfg.retain_days) * SECS_PER_DAY),
        }
    }
}

/// Outcome of one sweep invocation.
#[derive(Debug, Default, Serialize)]
pub struct SweepReport {
    /// Files examined.
    pub scanned: usize,
    /// Files gzipped in place this run.
    pub compressed: usize,
    /// Files deleted for exceeding the retention age.
    pub deleted: usize,
    /// Now-empty date directories removed.
    pub pruned_dirs: usize,
    /// Per-file failures, formatted as `path: error`.
    pub errors: Vec<String>,
}

/// Sweep the archive tree under `root`.
///
/// Pass 1 and 2 run per file during a single walk: delete anything whose
/// modification age exceeds `retain_for`, otherwise compress anything
/// older than `compress_after` that is not already compressed. Pass 3
/// removes date directories left empty, bottom-up.
pub fn sweep(
    root: &Path,
    policy: &RetentionPolicy,
    now: SystemTime,
) -> Result<SweepReport, ArchiveError> {
    if !root.is_dir() {
        return Err(ArchiveError::RootMissing {
            path: root.display().to_string(),
        });
    }

    let mut report = SweepReport::default();
    sweep_dir(root, policy, now, &mut report)?;
    Ok(report)
}

/// Sweep one directory level; returns whether the directory is empty
/// afterwards. Only the walk of `dir` itself can fail; everything below
/// it, unreadable subdirectories included, goes into the report.
fn sweep_dir(
    dir: &Path,
    policy: &RetentionPolicy,
    now: SystemTime,
    report: &mut SweepReport,
) -> io::Result<bool> {
    let mut remaining = 0usize;

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                report.errors.push(format!("{}: {}", dir.display(), e));
                remaining += 1;
                continue;
            }
        };
        let path = entry.path();

        if path.is_dir() {
            match sweep_dir(&path, policy, now, report) {
                Ok(true) => match fs::remove_dir(&path) {
                    Ok(()) => {
                        debug!(dir = %path.display(), "pruned empty archive directory");
                        report.pruned_dirs += 1;
                    }
                    Err(e) => {
                        warn!(dir = %path.display(), error = %e, "failed to prune directory");
                        report.errors.push(format!("{}: {}", path.display(), e));
                        remaining += 1;
                    }
                },
                Ok(false) => remaining += 1,
                Err(e) => {
                    warn!(dir = %path.display(), error = %e, "failed to read archive directory");
                    report.errors.push(format!("{}: {}", path.display(), e));
                    remaining += 1;
                }
            }
            continue;
        }

        report.scanned += 1;
        match sweep_file(&path, policy, now, report) {
            Ok(removed) => {
                if !removed {
                    remaining += 1;
                }
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "sweep failed for file");
                report.errors.push(format!("{}: {}", path.display(), e));
                remaining += 1;
            }
        }
    }

    Ok(remaining == 0)
}

/// Apply the retention policy to one file; returns whether it was removed.
fn sweep_file(
    path: &Path,
    policy: &RetentionPolicy,
    now: SystemTime,
    report: &mut SweepReport,
) -> io::Result<bool> {
    let modified = fs::metadata(path)?.modified()?;
    // A file modified in the future has zero age.
    let age = now.duration_since(modified).unwrap_or(Duration::ZERO);

    if age >= policy.retain_for {
        fs::remove_file(path)?;
        debug!(file = %path.display(), age_secs = age.as_secs(), "deleted expired archive file");
        report.deleted += 1;
        return Ok(true);
    }

    let already_compressed = path.extension().is_some_and(|ext| ext == "gz");
    if age >= policy.compress_after && !already_compressed {
        compress_file(path, modified)?;
        debug!(file = %path.display(), "compressed archive file");
        report.compressed += 1;
    }

    Ok(false)
}

/// Gzip `path` to `<path>.gz` and remove the original.
///
/// The original modification time is carried over to the compressed file
/// so its retention clock keeps running from the original write time.
fn compress_file(path: &Path, modified: SystemTime) -> io::Result<()> {
    let mut gz_path = path.as_os_str().to_owned();
    gz_path.push(".gz");

    let mut input = File::open(path)?;
    let output = File::create(&gz_path)?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    let output = encoder.finish()?;
    output.set_times(FileTimes::new().set_modified(modified))?;

    fs::remove_file(path)?;
    Ok(())
}
