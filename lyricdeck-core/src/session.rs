//! Mutable player session state and the track selection rule.

use crate::lrc::LrcLine;
use crate::lyric_sync::resolve_active_lyric_at;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Transport phase of the player.
///
/// `Loading` only exists between a transport command and its scheduled resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    Stopped,
    #[default]
    Paused,
    Playing,
    Loading,
}

impl TransportState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Paused => "paused",
            Self::Playing => "playing",
            Self::Loading => "loading",
        }
    }

    /// Where a play/pause toggle leads from this state, or `None` while loading
    #[must_use]
    pub const fn toggle_target(self) -> Option<Self> {
        match self {
            Self::Paused | Self::Stopped => Some(Self::Playing),
            Self::Playing => Some(Self::Paused),
            Self::Loading => None,
        }
    }
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a skip command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipDirection {
    Next,
    Previous,
}

/// Pick the track index a skip lands on.
///
/// With shuffle on, the index is uniform over the whole playlist and may equal
/// `current`. Otherwise it steps one track forward or back, wrapping around.
#[must_use]
pub fn select_next_index<R: Rng + ?Sized>(
    current: usize,
    len: usize,
    direction: SkipDirection,
    shuffle: bool,
    rng: &mut R,
) -> usize {
    if len <= 1 {
        return 0;
    }
    if shuffle {
        return rng.gen_range(0..len);
    }
    match direction {
        SkipDirection::Next => (current + 1) % len,
        SkipDirection::Previous => (current + len - 1) % len,
    }
}

/// State of the single player session
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSession {
    track_index: usize,
    transport: TransportState,
    shuffle: bool,
    repeat: bool,
    volume: f32,
    position: Duration,
    active_lyric: Option<usize>,
}

impl PlayerSession {
    /// Fresh session: first track, paused, at the start
    #[must_use]
    pub fn new(volume: f32) -> Self {
        Self {
            track_index: 0,
            transport: TransportState::Paused,
            shuffle: false,
            repeat: false,
            volume: volume.clamp(0.0, 1.0),
            position: Duration::ZERO,
            active_lyric: None,
        }
    }

    #[must_use]
    pub const fn track_index(&self) -> usize {
        self.track_index
    }

    #[must_use]
    pub const fn transport(&self) -> TransportState {
        self.transport
    }

    #[must_use]
    pub const fn shuffle(&self) -> bool {
        self.shuffle
    }

    #[must_use]
    pub const fn repeat(&self) -> bool {
        self.repeat
    }

    #[must_use]
    pub const fn volume(&self) -> f32 {
        self.volume
    }

    #[must_use]
    pub const fn position(&self) -> Duration {
        self.position
    }

    #[must_use]
    pub const fn active_lyric(&self) -> Option<usize> {
        self.active_lyric
    }

    pub(crate) fn set_transport(&mut self, transport: TransportState) {
        self.transport = transport;
    }

    pub(crate) fn set_shuffle(&mut self, shuffle: bool) {
        self.shuffle = shuffle;
    }

    pub(crate) fn set_repeat(&mut self, repeat: bool) {
        self.repeat = repeat;
    }

    pub(crate) fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    /// Switch track; the position goes back to zero with it
    pub(crate) fn change_track(&mut self, index: usize, lyrics: &[LrcLine]) {
        self.track_index = index;
        self.update_position(Duration::ZERO, lyrics);
    }

    /// Move the playhead and re-resolve the active lyric.
    ///
    /// Returns `true` when the active lyric changed.
    pub(crate) fn update_position(&mut self, position: Duration, lyrics: &[LrcLine]) -> bool {
        self.position = position;
        let active = resolve_active_lyric_at(lyrics, position);
        let changed = active != self.active_lyric;
        self.active_lyric = active;
        changed
    }
}

impl Default for PlayerSession {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_VOLUME)
    }
}
