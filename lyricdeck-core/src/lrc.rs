//! LRC lyric format.
//!
//! Supports ID tags (`[ti:..]`, `[ar:..]`, `[al:..]`, `[au:..]`, `[length:..]`,
//! `[offset:..]`), lines carrying several timestamps, the `mm:ss:xx` variant
//! and enhanced word timing (`<mm:ss.xx> word`).

use crate::error::{PlayerError, Result};
use crate::lyric_sync;
use std::time::Duration;

/// Parsed LRC document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LrcFile {
    pub metadata: LrcMetadata,
    /// Lines sorted by `start_time` (stable for equal timestamps)
    pub lines: Vec<LrcLine>,
}

/// LRC metadata from ID tags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LrcMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub author: Option<String>,
    pub length: Option<Duration>,
    /// Milliseconds, positive values delay every line
    pub offset_ms: i64,
}

/// A single line of lyrics with timing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LrcLine {
    pub start_time: Duration,
    pub text: String,
    /// Word-level timing for enhanced LRC
    pub words: Option<Vec<LrcWord>>,
}

/// Word-level timing for enhanced LRC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LrcWord {
    pub start_time: Duration,
    pub end_time: Option<Duration>,
    pub text: String,
}

impl LrcLine {
    /// Create a plain line without word timing
    #[must_use]
    pub fn new(start_time: Duration, text: impl Into<String>) -> Self {
        Self {
            start_time,
            text: text.into(),
            words: None,
        }
    }
}

impl LrcFile {
    /// Parse LRC text.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::LrcParseError`] when the input has content but
    /// not a single tag or timed line, which usually means plain-text lyrics
    /// were supplied where LRC was expected.
    pub fn parse(input: &str) -> Result<Self> {
        let mut metadata = LrcMetadata::default();
        let mut lines = Vec::new();
        let mut saw_content = false;
        let mut recognized = false;

        for raw in input.lines() {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            saw_content = true;

            if let Some(timed) = parse_timed_line(raw) {
                recognized = true;
                lines.extend(timed);
            } else if let Some((tag, value)) = parse_id_tag(raw) {
                recognized = true;
                apply_tag(&mut metadata, &tag, value);
            }
        }

        if saw_content && !recognized {
            return Err(PlayerError::LrcParseError {
                reason: "no timestamped lines or ID tags found".into(),
            });
        }

        if metadata.offset_ms != 0 {
            for line in &mut lines {
                shift_line(line, metadata.offset_ms);
            }
        }

        // `sort_by_key` is stable, so lines sharing a timestamp keep file order
        lines.sort_by_key(|l| l.start_time);

        Ok(Self { metadata, lines })
    }

    /// Index of the line active at `position`, if any
    #[must_use]
    pub fn current_line_index(&self, position: Duration) -> Option<usize> {
        lyric_sync::resolve_active_lyric_at(&self.lines, position)
    }

    /// The line active at `position`, if any
    #[must_use]
    pub fn current_line(&self, position: Duration) -> Option<&LrcLine> {
        self.current_line_index(position).map(|i| &self.lines[i])
    }
}

fn apply_tag(metadata: &mut LrcMetadata, tag: &str, value: String) {
    match tag.to_ascii_lowercase().as_str() {
        "ti" => metadata.title = Some(value),
        "ar" => metadata.artist = Some(value),
        "al" => metadata.album = Some(value),
        "au" => metadata.author = Some(value),
        "length" => metadata.length = crate::time::parse_clock(&value),
        "offset" => {
            if let Ok(offset) = value.parse::<i64>() {
                metadata.offset_ms = offset;
            }
        }
        _ => {}
    }
}

fn shift_line(line: &mut LrcLine, offset_ms: i64) {
    line.start_time = apply_offset(line.start_time, offset_ms);
    for word in line.words.iter_mut().flatten() {
        word.start_time = apply_offset(word.start_time, offset_ms);
        word.end_time = word.end_time.map(|end| apply_offset(end, offset_ms));
    }
}

/// Parse an ID tag like `[ti:Title]`
fn parse_id_tag(line: &str) -> Option<(String, String)> {
    let inner = line.strip_prefix('[')?;
    let (content, _) = inner.split_once(']')?;
    let (tag, value) = content.split_once(':')?;

    if tag.is_empty() || tag.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Some((tag.trim().to_string(), value.trim().to_string()))
}

/// Parse `[00:12.34]text` or `[00:05.00][00:15.00]text` into one line per timestamp
fn parse_timed_line(line: &str) -> Option<Vec<LrcLine>> {
    let mut rest = line;
    let mut stamps = Vec::new();

    while let Some(inner) = rest.strip_prefix('[') {
        let Some((content, after)) = inner.split_once(']') else {
            break;
        };
        let Some(stamp) = parse_timestamp(content) else {
            break;
        };
        stamps.push(stamp);
        rest = after;
    }

    if stamps.is_empty() {
        return None;
    }

    let text = rest.trim();
    let words = parse_enhanced_words(text);
    let text = words.as_ref().map_or_else(
        || text.to_string(),
        |words| {
            words
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        },
    );

    Some(
        stamps
            .into_iter()
            .map(|start_time| LrcLine {
                start_time,
                text: text.clone(),
                words: words.clone(),
            })
            .collect(),
    )
}

/// Parse `mm:ss.xx`, `mm:ss` or `mm:ss:xx`
fn parse_timestamp(s: &str) -> Option<Duration> {
    let parts: Vec<&str> = s.trim().split(':').collect();

    match parts.as_slice() {
        [minutes, seconds] => {
            let minutes: u32 = minutes.parse().ok()?;
            let seconds: f64 = seconds.parse().ok()?;
            if !seconds.is_finite() || seconds < 0.0 {
                return None;
            }
            Duration::try_from_secs_f64(f64::from(minutes) * 60.0 + seconds).ok()
        }
        [minutes, seconds, hundredths] => {
            let minutes: u64 = minutes.parse().ok()?;
            let seconds: u64 = seconds.parse().ok()?;
            let hundredths: u64 = hundredths.parse().ok()?;
            if hundredths >= 100 {
                return None;
            }
            let millis = minutes
                .checked_mul(60_000)?
                .checked_add(seconds.checked_mul(1000)?)?
                .checked_add(hundredths * 10)?;
            Some(Duration::from_millis(millis))
        }
        _ => None,
    }
}

/// Parse enhanced word timing: `<mm:ss.xx> word1 <mm:ss.xx> word2`
fn parse_enhanced_words(text: &str) -> Option<Vec<LrcWord>> {
    if !text.contains('<') {
        return None;
    }

    let mut words: Vec<LrcWord> = Vec::new();

    // Each segment after a '<' is "timestamp>word"
    for segment in text.split('<').skip(1) {
        let Some((stamp, word)) = segment.split_once('>') else {
            continue;
        };
        let Some(start_time) = parse_timestamp(stamp) else {
            continue;
        };
        let word = word.trim();
        if word.is_empty() {
            continue;
        }
        if let Some(prev) = words.last_mut() {
            prev.end_time = Some(start_time);
        }
        words.push(LrcWord {
            start_time,
            end_time: None,
            text: word.to_string(),
        });
    }

    if words.is_empty() {
        None
    } else {
        Some(words)
    }
}

/// Apply a millisecond offset to a duration (can be negative)
fn apply_offset(duration: Duration, offset_ms: i64) -> Duration {
    let shift = Duration::from_millis(offset_ms.unsigned_abs());
    if offset_ms >= 0 {
        duration + shift
    } else {
        duration.saturating_sub(shift)
    }
}
