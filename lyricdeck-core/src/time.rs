//! Time and duration conversion utilities.
//!
//! The `m:ss` clock format used by the progress bar and by track durations in
//! the config file.

use std::time::Duration;

/// Extension trait for formatting durations.
pub trait DurationExt {
    /// Format as a player clock: `m:ss`, or `h:mm:ss` past one hour.
    ///
    /// Sub-second precision is truncated, so 83.9s renders as `1:23`.
    fn to_clock_string(&self) -> String;
}

impl DurationExt for Duration {
    fn to_clock_string(&self) -> String {
        let total = self.as_secs();
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;

        if hours > 0 {
            format!("{hours}:{minutes:02}:{seconds:02}")
        } else {
            format!("{minutes}:{seconds:02}")
        }
    }
}

/// Parse a clock string like `3:45`, `1:02:03` or `225` (plain seconds).
#[must_use]
pub fn parse_clock(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let mut total: u64 = 0;
    let mut parts = 0;
    for part in s.split(':') {
        let value: u64 = part.trim().parse().ok()?;
        // Every field after the first is a sexagesimal digit
        if parts > 0 && value >= 60 {
            return None;
        }
        total = total.checked_mul(60)?.checked_add(value)?;
        parts += 1;
    }

    if parts > 3 {
        return None;
    }

    Some(Duration::from_secs(total))
}

/// Convert a position in (possibly negative or non-finite) seconds to a `Duration`.
///
/// Returns `None` for NaN, infinite and negative input.
#[must_use]
pub fn duration_from_secs(secs: f64) -> Option<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_string() {
        assert_eq!(Duration::ZERO.to_clock_string(), "0:00");
        assert_eq!(Duration::from_millis(83_900).to_clock_string(), "1:23");
        assert_eq!(Duration::from_secs(225).to_clock_string(), "3:45");
        assert_eq!(Duration::from_secs(3723).to_clock_string(), "1:02:03");
    }

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("3:45"), Some(Duration::from_secs(225)));
        assert_eq!(parse_clock("1:02:03"), Some(Duration::from_secs(3723)));
        assert_eq!(parse_clock("90"), Some(Duration::from_secs(90)));
        assert_eq!(parse_clock(" 0:07 "), Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_parse_clock_rejects_garbage() {
        assert_eq!(parse_clock(""), None);
        assert_eq!(parse_clock("3:75"), None);
        assert_eq!(parse_clock("a:bc"), None);
        assert_eq!(parse_clock("1:2:3:4"), None);
    }

    #[test]
    fn test_duration_from_secs() {
        assert_eq!(duration_from_secs(1.5), Some(Duration::from_millis(1500)));
        assert_eq!(duration_from_secs(-1.0), None);
        assert_eq!(duration_from_secs(f64::NAN), None);
        assert_eq!(duration_from_secs(f64::INFINITY), None);
    }
}
