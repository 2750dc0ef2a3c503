// Windows FILETIME handling: 100-nanosecond ticks since 1601-01-01 UTC.
// The public API exposes broken-down UTC components.

use chrono::{DateTime, Datelike, Timelike, Utc};
use strata_core::FsTimestamp;

/// Ticks between 1601-01-01 and the Unix epoch.
pub const EPOCH_DIFF_TICKS: u64 = 116_444_736_000_000_000;
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// Seconds since the Unix epoch. Stamps before 1970 clamp to zero.
pub fn filetime_to_unix(filetime: u64) -> i64 {
    if filetime < EPOCH_DIFF_TICKS {
        return 0;
    }
    ((filetime - EPOCH_DIFF_TICKS) / TICKS_PER_SECOND) as i64
}

/// Broken-down UTC components of a FILETIME. Sub-second ticks become
/// microseconds.
pub fn filetime_to_components(filetime: u64) -> FsTimestamp {
    let seconds = filetime_to_unix(filetime);
    let micros = ((filetime % TICKS_PER_SECOND) / 10) as u32;
    match DateTime::<Utc>::from_timestamp(seconds, 0) {
        Some(dt) => FsTimestamp {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
            microsecond: micros,
        },
        // Out-of-range values render as the epoch
        None => FsTimestamp {
            year: 1970,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            microsecond: 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_epoch() {
        assert_eq!(filetime_to_unix(EPOCH_DIFF_TICKS), 0);
        let ts = filetime_to_components(EPOCH_DIFF_TICKS);
        assert_eq!((ts.year, ts.month, ts.day), (1970, 1, 1));
    }

    #[test]
    fn test_pre_epoch_clamps() {
        assert_eq!(filetime_to_unix(0), 0);
        let ts = filetime_to_components(123);
        assert_eq!(ts.year, 1970);
    }

    #[test]
    fn test_known_filetime() {
        // (130000000000000000 - 116444736000000000) / 10^7 = 1355526400,
        // which is 2012-12-14 23:06:40 UTC.
        let filetime = 130_000_000_000_000_000u64;
        assert_eq!(filetime_to_unix(filetime), 1_355_526_400);
        let ts = filetime_to_components(filetime);
        assert_eq!(
            (ts.year, ts.month, ts.day, ts.hour, ts.minute, ts.second),
            (2012, 12, 14, 23, 6, 40)
        );
    }

    #[test]
    fn test_subsecond_ticks() {
        // Half a second past the Unix epoch
        let ts = filetime_to_components(EPOCH_DIFF_TICKS + TICKS_PER_SECOND / 2);
        assert_eq!(ts.second, 0);
        assert_eq!(ts.microsecond, 500_000);
    }
}
