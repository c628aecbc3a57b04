//! Active lyric resolution.
//!
//! A line is active from its own timestamp up to (not including) the next
//! line's timestamp; the last line stays active until the track ends.

use crate::lrc::LrcLine;
use crate::time::duration_from_secs;
use std::time::Duration;

/// Resolve the active lyric line for a playback position given in seconds.
///
/// Returns the largest index `i` with `lines[i].start_time <= position` such that
/// `i` is the last line or `position < lines[i + 1].start_time`. Returns `None`
/// for an empty sequence, a position before the first line, and negative or
/// NaN positions.
///
/// `lines` must be sorted by non-decreasing `start_time`.
#[must_use]
pub fn resolve_active_lyric(lines: &[LrcLine], position_secs: f64) -> Option<usize> {
    let position = duration_from_secs(position_secs)?;
    resolve_active_lyric_at(lines, position)
}

/// [`resolve_active_lyric`] for a position already expressed as a `Duration`.
#[must_use]
pub fn resolve_active_lyric_at(lines: &[LrcLine], position: Duration) -> Option<usize> {
    // Number of lines that have started; the last of them is the active one.
    // With duplicate timestamps this lands on the final duplicate, which is the
    // only one whose interval is non-empty.
    let started = lines.partition_point(|line| line.start_time <= position);
    started.checked_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(stamps: &[(u64, &str)]) -> Vec<LrcLine> {
        stamps
            .iter()
            .map(|&(secs, text)| LrcLine::new(Duration::from_secs(secs), text))
            .collect()
    }

    #[test]
    fn test_resolves_interval() {
        let lyrics = lines(&[(0, "a"), (5, "b"), (10, "c")]);

        assert_eq!(resolve_active_lyric(&lyrics, 3.0), Some(0));
        assert_eq!(resolve_active_lyric(&lyrics, 5.0), Some(1));
        assert_eq!(resolve_active_lyric(&lyrics, 12.0), Some(2));
        assert_eq!(resolve_active_lyric(&lyrics, -1.0), None);
    }

    #[test]
    fn test_boundary_just_before_next_line() {
        let lyrics = lines(&[(0, "a"), (5, "b")]);
        assert_eq!(resolve_active_lyric(&lyrics, 4.999), Some(0));
    }

    #[test]
    fn test_before_first_line() {
        let lyrics = lines(&[(2, "intro"), (6, "verse")]);
        assert_eq!(resolve_active_lyric(&lyrics, 1.5), None);
        assert_eq!(resolve_active_lyric(&lyrics, 2.0), Some(0));
    }

    #[test]
    fn test_empty_sequence() {
        assert_eq!(resolve_active_lyric(&[], 0.0), None);
        assert_eq!(resolve_active_lyric(&[], 100.0), None);
    }

    #[test]
    fn test_nan_position() {
        let lyrics = lines(&[(0, "a")]);
        assert_eq!(resolve_active_lyric(&lyrics, f64::NAN), None);
    }

    #[test]
    fn test_duplicate_timestamps_pick_last() {
        let lyrics = lines(&[(0, "a"), (5, "b"), (5, "b'"), (10, "c")]);
        assert_eq!(resolve_active_lyric(&lyrics, 5.0), Some(2));
        assert_eq!(resolve_active_lyric(&lyrics, 7.0), Some(2));
    }

    #[test]
    fn test_idempotent() {
        let lyrics = lines(&[(0, "a"), (5, "b"), (10, "c")]);
        for position in [0.0, 2.5, 5.0, 9.99, 10.0, 400.0] {
            assert_eq!(
                resolve_active_lyric(&lyrics, position),
                resolve_active_lyric(&lyrics, position)
            );
        }
    }
}
