use dioxus::prelude::*;
use lyricdeck_core::{LrcLine, PlayerSnapshot, Track, TransportState};
use std::ops::Range;
use std::time::Duration;

/// Fallback display time for the last lyric line when the track length is unknown
const LAST_LINE_DURATION: Duration = Duration::from_secs(5);

/// A lyric line with the time it stays on screen, for the fill animation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimedLine {
    pub text: String,
    pub start: Duration,
    /// Time until the next line starts
    pub duration: Duration,
}

/// Lines of the current track with display durations precomputed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackLyrics {
    pub lines: Vec<TimedLine>,
}

impl TrackLyrics {
    #[must_use]
    pub fn from_lines(lines: &[LrcLine], track_length: Option<Duration>) -> Self {
        let lines = lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let end = lines
                    .get(i + 1)
                    .map(|next| next.start_time)
                    .or(track_length)
                    .unwrap_or(line.start_time + LAST_LINE_DURATION);
                TimedLine {
                    text: line.text.clone(),
                    start: line.start_time,
                    duration: end.saturating_sub(line.start_time),
                }
            })
            .collect();
        Self { lines }
    }

    #[must_use]
    pub fn from_track(track: &Track) -> Self {
        Self::from_lines(track.lyrics(), track.duration())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Render key for line `index`; unique even when lines share a timestamp
    #[must_use]
    pub fn line_key(&self, index: usize) -> String {
        let start = self.lines.get(index).map_or(0, |l| l.start.as_millis());
        format!("{index}-{start}")
    }
}

/// Range of line indices to show around the active line.
///
/// Before the first line starts, the opening lines are shown as upcoming.
#[must_use]
pub fn visible_range(len: usize, active: Option<usize>, before: usize, after: usize) -> Range<usize> {
    match active {
        Some(index) if index < len => index.saturating_sub(before)..(index + after + 1).min(len),
        _ => 0..(after + 1).min(len),
    }
}

/// Currently loaded track, as displayed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackView {
    pub index: usize,
    pub count: usize,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub duration: Option<Duration>,
}

/// Player display state with one signal per concern, so components only
/// re-render for what they read.
#[derive(Clone, Copy)]
pub struct PlayerState {
    pub transport: Signal<TransportState>,
    pub track: Signal<TrackView>,
    pub lyrics: Signal<TrackLyrics>,
    pub position: Signal<Duration>,
    pub active_lyric: Signal<Option<usize>>,
    pub volume: Signal<f32>,
    pub shuffle: Signal<bool>,
    pub repeat: Signal<bool>,
    /// Transient message (denied playback, output failure)
    pub notice: Signal<Option<String>>,
}

impl PlayerState {
    /// Seed the signals from an engine snapshot
    #[must_use]
    pub fn from_snapshot(snapshot: &PlayerSnapshot, lyrics: TrackLyrics) -> Self {
        Self {
            transport: Signal::new(snapshot.transport),
            track: Signal::new(TrackView {
                index: snapshot.track_index,
                count: snapshot.track_count,
                title: snapshot.title.clone(),
                artist: snapshot.artist.clone(),
                album: snapshot.album.clone(),
                duration: snapshot.duration,
            }),
            lyrics: Signal::new(lyrics),
            position: Signal::new(snapshot.position),
            active_lyric: Signal::new(snapshot.active_lyric),
            volume: Signal::new(snapshot.volume),
            shuffle: Signal::new(snapshot.shuffle),
            repeat: Signal::new(snapshot.repeat),
            notice: Signal::new(None),
        }
    }

    /// Switch to a new track; position and lyrics reset with it
    pub fn set_track(&mut self, index: usize, track: &Track) {
        let count = self.track.read().count;
        self.track.set(TrackView {
            index,
            count,
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            duration: track.duration(),
        });
        self.lyrics.set(TrackLyrics::from_track(track));
        self.position.set(Duration::ZERO);
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        *self.transport.read() == TransportState::Playing
    }
}
