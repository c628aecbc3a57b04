//! Static, ordered playlist.

use crate::error::{PlayerError, Result};
use crate::lrc::LrcLine;
use std::collections::HashSet;
use std::time::Duration;

/// Where the audio output finds a track's audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSource {
    /// Source locator (file path or URL), opaque to the player
    pub locator: String,
    /// Track length when known up front
    pub duration: Option<Duration>,
}

impl TrackSource {
    #[must_use]
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            duration: None,
        }
    }

    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// A playable item with its lyric sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub source: TrackSource,
    lyrics: Vec<LrcLine>,
}

impl Track {
    /// Create a track. Lyric lines are sorted by timestamp; lines sharing a
    /// timestamp keep their given order.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        source: TrackSource,
        mut lyrics: Vec<LrcLine>,
    ) -> Self {
        lyrics.sort_by_key(|line| line.start_time);
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: None,
            source,
            lyrics,
        }
    }

    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Lyric lines in non-decreasing timestamp order
    #[must_use]
    pub fn lyrics(&self) -> &[LrcLine] {
        &self.lyrics
    }

    #[must_use]
    pub const fn duration(&self) -> Option<Duration> {
        self.source.duration
    }
}

/// Non-empty, ordered collection of tracks with unique ids
#[derive(Debug, Clone)]
pub struct Playlist {
    tracks: Vec<Track>,
}

impl Playlist {
    /// Build a playlist.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::EmptyPlaylist`] for zero tracks and
    /// [`PlayerError::DuplicateTrackId`] when two tracks share an id.
    pub fn new(tracks: Vec<Track>) -> Result<Self> {
        if tracks.is_empty() {
            return Err(PlayerError::EmptyPlaylist);
        }

        let mut seen = HashSet::with_capacity(tracks.len());
        for track in &tracks {
            if !seen.insert(track.id.as_str()) {
                return Err(PlayerError::DuplicateTrackId {
                    id: track.id.clone(),
                });
            }
        }

        Ok(Self { tracks })
    }

    /// Number of tracks (always at least one)
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Always `false`; kept for API symmetry with `len`
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Track at `index`, wrapping around the end of the playlist
    #[must_use]
    pub fn track(&self, index: usize) -> &Track {
        &self.tracks[index % self.tracks.len()]
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> Track {
        Track::new(id, format!("Song {id}"), "Artist", TrackSource::new(format!("{id}.mp3")), vec![])
    }

    #[test]
    fn test_empty_playlist_rejected() {
        assert!(matches!(Playlist::new(vec![]), Err(PlayerError::EmptyPlaylist)));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = Playlist::new(vec![track("a"), track("b"), track("a")]).unwrap_err();
        assert!(matches!(err, PlayerError::DuplicateTrackId { id } if id == "a"));
    }

    #[test]
    fn test_lookup() {
        let playlist = Playlist::new(vec![track("a"), track("b")]).unwrap();
        assert_eq!(playlist.len(), 2);
        assert!(!playlist.is_empty());
        assert_eq!(playlist.track(3).id, "b");
        assert!(playlist.get(2).is_none());
    }

    #[test]
    fn test_track_sorts_lyrics() {
        let t = Track::new(
            "x",
            "X",
            "Y",
            TrackSource::new("x.mp3").with_duration(Duration::from_secs(200)),
            vec![
                LrcLine::new(Duration::from_secs(10), "c"),
                LrcLine::new(Duration::from_secs(0), "a"),
                LrcLine::new(Duration::from_secs(5), "b"),
            ],
        );
        let texts: Vec<_> = t.lyrics().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["a", "b", "c"]);
        assert_eq!(t.duration(), Some(Duration::from_secs(200)));
    }
}
