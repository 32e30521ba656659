//! Archive error types.

/// Errors from rotation parsing and the retention sweep.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The rotation interval string is not one of the supported buckets.
    #[error("invalid rotation interval '{value}': expected 1h, 6h, 12h, 1d, or 7d")]
    InvalidInterval { value: String },

    /// The archive root does not exist or is not a directory.
    #[error("archive root not found: {path}")]
    RootMissing { path: String },

    /// I/O error outside the per-file sweep loop (per-file failures are
    /// collected in the sweep report instead).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
