// NTFS FILETIME handling.
// FILETIME counts 100-nanosecond intervals since 1601-01-01 00:00:00 UTC.

use chrono::{DateTime, Utc};
use sift_core::DateWindow;

/// Seconds between the Windows epoch (1601) and the Unix epoch (1970).
const WINDOWS_EPOCH_DIFF: i64 = 11_644_473_600;

/// FILETIME ticks per second.
const FILETIME_TICKS_PER_SECOND: i64 = 10_000_000;

/// Convert a FILETIME to calendar time. Values outside the representable
/// range yield `None` rather than panicking.
pub fn filetime_to_datetime(filetime: u64) -> Option<DateTime<Utc>> {
    let ticks = i64::try_from(filetime).ok()?;
    let seconds = ticks / FILETIME_TICKS_PER_SECOND - WINDOWS_EPOCH_DIFF;
    let nanos = ((ticks % FILETIME_TICKS_PER_SECOND) * 100) as u32;
    DateTime::from_timestamp(seconds, nanos)
}

/// True when `filetime` converts and falls strictly inside `window`.
pub fn filetime_in_window(filetime: u64, window: &DateWindow) -> bool {
    match filetime_to_datetime(filetime) {
        Some(dt) => dt > window.min && dt < window.max,
        None => false,
    }
}

/// Render a FILETIME for display.
pub fn format_filetime(filetime: u64) -> String {
    match filetime_to_datetime(filetime) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("Invalid FILETIME: {}", filetime),
    }
}

/// FILETIME for a calendar time, for building fixtures and filters.
pub fn datetime_to_filetime(dt: DateTime<Utc>) -> u64 {
    let seconds = dt.timestamp() + WINDOWS_EPOCH_DIFF;
    (seconds * FILETIME_TICKS_PER_SECOND) as u64 + (dt.timestamp_subsec_nanos() / 100) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_epoch_conversion() {
        // Windows epoch itself is representable and maps to 1601
        let dt = filetime_to_datetime(0).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(1601, 1, 1, 0, 0, 0).unwrap());

        // Unix epoch in FILETIME
        let unix_epoch_filetime = (WINDOWS_EPOCH_DIFF * FILETIME_TICKS_PER_SECOND) as u64;
        let dt = filetime_to_datetime(unix_epoch_filetime).unwrap();
        assert_eq!(dt.timestamp(), 0);

        // Unrepresentable values convert to None, not a panic
        assert!(filetime_to_datetime(u64::MAX).is_none());
    }

    #[test]
    fn test_known_timestamp() {
        // 2024-01-01 00:00:00 UTC
        let jan_2024_filetime = 133477056000000000u64;
        let dt = filetime_to_datetime(jan_2024_filetime).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_round_trip() {
        let dt = Utc.with_ymd_and_hms(2005, 6, 15, 12, 30, 45).unwrap();
        let filetime = datetime_to_filetime(dt);
        assert_eq!(filetime_to_datetime(filetime).unwrap(), dt);
    }

    #[test]
    fn test_window_check() {
        let window = DateWindow::default();
        let inside = datetime_to_filetime(Utc.with_ymd_and_hms(2005, 1, 1, 0, 0, 0).unwrap());
        let before = datetime_to_filetime(Utc.with_ymd_and_hms(1989, 12, 31, 23, 59, 59).unwrap());
        let after = datetime_to_filetime(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());

        assert!(filetime_in_window(inside, &window));
        assert!(!filetime_in_window(before, &window));
        assert!(!filetime_in_window(after, &window));

        // the bounds are exclusive
        let min_exact = datetime_to_filetime(window.min);
        let max_exact = datetime_to_filetime(window.max);
        assert!(!filetime_in_window(min_exact, &window));
        assert!(!filetime_in_window(max_exact, &window));

        // zero never converts into the window
        assert!(!filetime_in_window(0, &window));
    }
}
