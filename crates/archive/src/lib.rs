//! Flowherd archive library.
//!
//! Two concerns share this crate because they share one invariant, the
//! time-partitioned archive layout:
//!
//! - [`rotation`] derives date-partitioned paths and the write template
//!   handed to the external archival stage, so that a new file begins
//!   exactly at each rotation boundary and no two open files ever share
//!   a path.
//! - [`retention`] is the periodic sweep that compresses and deletes
//!   closed files by age. It is safe without locking because rotation
//!   guarantees a file is closed before the next one opens, and the
//!   sweep's age thresholds exceed any single rotation interval.

pub mod error;
pub mod retention;
pub mod rotation;

pub use error::ArchiveError;
pub use retention::{RetentionPolicy, SweepReport, sweep};
pub use rotation::RotationInterval;
