//! Rotation bucket math and archive path naming.
//!
//! Archive files are identified by the wall-clock time at file-open,
//! truncated to the rotation bucket:
//!
//! ```text
//! <root>/<YYYY>/<MM>/<DD>/<prefix>.<YYYY>.<MM>.<DD>.<HH>.<MM>.<SS>
//! ```
//!
//! Two opens in the same bucket map to the same path, and two opens in
//! different buckets always map to different paths. This by itself
//! serializes writer access per leaf path; no locking is needed.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc, Weekday};

use crate::error::ArchiveError;

/// Selectable rotation boundary for the archival branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationInterval {
    /// New file at every hour boundary.
    Hourly,
    /// New file at 00:00, 06:00, 12:00, 18:00 UTC.
    SixHours,
    /// New file at 00:00 and 12:00 UTC.
    TwelveHours,
    /// New file at midnight UTC.
    Daily,
    /// New file at Monday midnight UTC.
    Weekly,
}

impl RotationInterval {
    /// Canonical configuration token for this interval.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "1h",
            Self::SixHours => "6h",
            Self::TwelveHours => "12h",
            Self::Daily => "1d",
            Self::Weekly => "7d",
        }
    }

    /// Bucket width as a duration.
    pub fn duration(self) -> Duration {
        const HOUR: u64 = 3_600;
        match self {
            Self::Hourly => Duration::from_secs(HOUR),
            Self::SixHours => Duration::from_secs(6 * HOUR),
            Self::TwelveHours => Duration::from_secs(12 * HOUR),
            Self::Daily => Duration::from_secs(24 * HOUR),
            Self::Weekly => Duration::from_secs(7 * 24 * HOUR),
        }
    }

    /// Truncate `t` to the start of its rotation bucket.
    pub fn bucket_start(self, t: DateTime<Utc>) -> DateTime<Utc> {
        let date = t.date_naive();
        let start = match self {
            Self::Hourly => date.and_hms_opt(t.hour(), 0, 0),
            Self::SixHours => date.and_hms_opt(t.hour() - t.hour() % 6, 0, 0),
            Self::TwelveHours => date.and_hms_opt(t.hour() - t.hour() % 12, 0, 0),
            Self::Daily => date.and_hms_opt(0, 0, 0),
            Self::Weekly => date.week(Weekday::Mon).first_day().and_hms_opt(0, 0, 0),
        };
        // Hour is < 24 and minute/second are zero, so the time is valid.
        Utc.from_utc_datetime(&start.expect("bucket time in range"))
    }
}

impl FromStr for RotationInterval {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1h" => Ok(Self::Hourly),
            "6h" => Ok(Self::SixHours),
            "12h" => Ok(Self::TwelveHours),
            "1d" => Ok(Self::Daily),
            "7d" => Ok(Self::Weekly),
            other => Err(ArchiveError::InvalidInterval {
                value: other.to_owned(),
            }),
        }
    }
}

/// File name for an archive file opened at `open`, e.g.
/// `flows.2026.08.30.02.00.00`.
pub fn file_name(prefix: &str, open: DateTime<Utc>) -> String {
    format!(
        "{}.{:04}.{:02}.{:02}.{:02}.{:02}.{:02}",
        prefix,
        open.year(),
        open.month(),
        open.day(),
        open.hour(),
        open.minute(),
        open.second()
    )
}

/// Full date-partitioned path for an archive file opened at `open`.
pub fn archive_path(root: &Path, prefix: &str, open: DateTime<Utc>) -> PathBuf {
    root.join(format!("{:04}", open.year()))
        .join(format!("{:02}", open.month()))
        .join(format!("{:02}", open.day()))
        .join(file_name(prefix, open))
}

/// strftime write template handed to the external archival stage.
///
/// The archiver expands this at each rotation boundary, which yields
/// exactly the paths [`archive_path`] predicts for the bucket open time.
pub fn write_template(root: &Path, prefix: &str) -> String {
    format!("{}/%Y/%m/%d/{}.%Y.%m.%d.%H.%M.%S", root.display(), prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn interval_parse_all_tokens() {
        assert_eq!("1h".parse::<RotationInterval>().unwrap(), RotationInterval::Hourly);
        assert_eq!("6h".parse::<RotationInterval>().unwrap(), RotationInterval::SixHours);
        assert_eq!("12h".parse::<RotationInterval>().unwrap(), RotationInterval::TwelveHours);
        assert_eq!("1d".parse::<RotationInterval>().unwrap(), RotationInterval::Daily);
        assert_eq!("7d".parse::<RotationInterval>().unwrap(), RotationInterval::Weekly);
    }

    #[test]
    fn interval_parse_rejects_unknown() {
        let err = "2h".parse::<RotationInterval>().unwrap_err();
        assert!(err.to_string().contains("2h"));
    }

    #[test]
    fn interval_roundtrips_through_as_str() {
        for iv in [
            RotationInterval::Hourly,
            RotationInterval::SixHours,
            RotationInterval::TwelveHours,
            RotationInterval::Daily,
            RotationInterval::Weekly,
        ] {
            assert_eq!(iv.as_str().parse::<RotationInterval>().unwrap(), iv);
        }
    }

    #[test]
    fn hourly_bucket_truncates_to_hour() {
        let t = utc(2026, 8, 30, 2, 37, 11);
        assert_eq!(
            RotationInterval::Hourly.bucket_start(t),
            utc(2026, 8, 30, 2, 0, 0)
        );
    }

    #[test]
    fn six_hour_bucket_truncates_to_six_hour_block() {
        let t = utc(2026, 8, 30, 7, 5, 0);
        assert_eq!(
            RotationInterval::SixHours.bucket_start(t),
            utc(2026, 8, 30, 6, 0, 0)
        );
    }

    #[test]
    fn twelve_hour_bucket_truncates_to_half_day() {
        let t = utc(2026, 8, 30, 13, 59, 59);
        assert_eq!(
            RotationInterval::TwelveHours.bucket_start(t),
            utc(2026, 8, 30, 12, 0, 0)
        );
    }

    #[test]
    fn daily_bucket_truncates_to_midnight() {
        let t = utc(2026, 8, 30, 23, 0, 1);
        assert_eq!(
            RotationInterval::Daily.bucket_start(t),
            utc(2026, 8, 30, 0, 0, 0)
        );
    }

    #[test]
    fn weekly_bucket_truncates_to_monday() {
        // 2026-08-30 is a Sunday; the week starts Monday 2026-08-24.
        let t = utc(2026, 8, 30, 10, 0, 0);
        assert_eq!(
            RotationInterval::Weekly.bucket_start(t),
            utc(2026, 8, 24, 0, 0, 0)
        );
    }

    #[test]
    fn hour_boundaries_produce_distinct_timestamped_paths() {
        // Rotation interval 1h: files opened at 00:00, 01:00, 02:00 must
        // land on three distinct paths with full timestamps embedded.
        let root = Path::new("/var/lib/flowherd/archive");
        let opens = [
            utc(2026, 8, 30, 0, 0, 0),
            utc(2026, 8, 30, 1, 0, 0),
            utc(2026, 8, 30, 2, 0, 0),
        ];
        let paths: Vec<PathBuf> = opens
            .iter()
            .map(|t| archive_path(root, "flows", RotationInterval::Hourly.bucket_start(*t)))
            .collect();

        assert!(paths[0].ends_with("2026/08/30/flows.2026.08.30.00.00.00"));
        assert!(paths[1].ends_with("2026/08/30/flows.2026.08.30.01.00.00"));
        assert!(paths[2].ends_with("2026/08/30/flows.2026.08.30.02.00.00"));
        assert_ne!(paths[0], paths[1]);
        assert_ne!(paths[1], paths[2]);
        assert_ne!(paths[0], paths[2]);
    }

    #[test]
    fn same_bucket_maps_to_same_path() {
        let root = Path::new("/data");
        let a = utc(2026, 8, 30, 2, 0, 1);
        let b = utc(2026, 8, 30, 2, 59, 59);
        let iv = RotationInterval::Hourly;
        assert_eq!(
            archive_path(root, "flows", iv.bucket_start(a)),
            archive_path(root, "flows", iv.bucket_start(b))
        );
    }

    #[test]
    fn paths_partition_across_days() {
        let root = Path::new("/data");
        let iv = RotationInterval::Daily;
        let before = archive_path(root, "flows", iv.bucket_start(utc(2026, 8, 30, 23, 0, 0)));
        let after = archive_path(root, "flows", iv.bucket_start(utc(2026, 8, 31, 1, 0, 0)));
        assert!(before.ends_with("2026/08/30/flows.2026.08.30.00.00.00"));
        assert!(after.ends_with("2026/08/31/flows.2026.08.31.00.00.00"));
    }

    #[test]
    fn write_template_embeds_root_and_prefix() {
        let tpl = write_template(Path::new("/var/lib/flowherd/archive"), "flows");
        assert_eq!(
            tpl,
            "/var/lib/flowherd/archive/%Y/%m/%d/flows.%Y.%m.%d.%H.%M.%S"
        );
    }
}
