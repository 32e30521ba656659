//! Aggregation sink preparation -- the named pipe the time series flows
//! through.
//!
//! `ensure_fifo` is idempotent: an existing FIFO at the path is reused
//! as-is. Anything else at the path (regular file, directory, symlink)
//! is never removed or replaced; the operator must move it aside. The
//! consumer on the read side may attach and detach freely, so the FIFO
//! itself is the only thing the supervisor prepares.

use std::path::Path;

use tracing::{debug, info};

use flowherd_core::error::SinkError;

/// Ensure a FIFO exists at `path`, creating it (and parent directories)
/// if missing. Returns whether the FIFO was created by this call.
#[cfg(unix)]
pub fn ensure_fifo(path: &Path) -> Result<bool, SinkError> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::fs::FileTypeExt;

    // symlink_metadata so a symlink at the path is rejected rather than
    // followed.
    match std::fs::symlink_metadata(path) {
        Ok(meta) => {
            if meta.file_type().is_fifo() {
                debug!(path = %path.display(), "aggregation FIFO already present");
                return Ok(false);
            }
            Err(SinkError::NotAFifo {
                path: path.display().to_string(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| SinkError::CreateFailed {
                    path: path.display().to_string(),
                    source: e,
                })?;
            }

            let c_path =
                CString::new(path.as_os_str().as_bytes()).map_err(|_| SinkError::CreateFailed {
                    path: path.display().to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "path contains an interior NUL byte",
                    ),
                })?;

            // Writer and reader are separate processes under different
            // users in packaged deployments, hence group/other read.
            let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o644) };
            if rc != 0 {
                return Err(SinkError::CreateFailed {
                    path: path.display().to_string(),
                    source: std::io::Error::last_os_error(),
                });
            }

            info!(path = %path.display(), "aggregation FIFO created");
            Ok(true)
        }
        Err(e) => Err(SinkError::CreateFailed {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

#[cfg(not(unix))]
pub fn ensure_fifo(_path: &Path) -> Result<bool, SinkError> {
    Err(SinkError::Unsupported)
}
