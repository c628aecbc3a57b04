use crate::error::{PlayerError, Result};
use crate::lrc::LrcFile;
use crate::playlist::{Playlist, Track, TrackSource};
use crate::time::parse_clock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Volume a fresh session starts at
pub const DEFAULT_VOLUME: f32 = 0.7;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LyricdeckConfig {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub playlist: PlaylistConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_volume")]
    pub initial_volume: f32,
    /// Delay between a transport command and its effect
    #[serde(default = "default_transition_delay")]
    pub transition_delay_ms: u64,
    /// How often the simulated output reports its position
    #[serde(default = "default_position_interval")]
    pub position_interval_ms: u64,
    /// Refuse the first play request, like a browser blocking autoplay
    #[serde(default)]
    pub deny_autoplay: bool,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub repeat: bool,
}

const fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

const fn default_transition_delay() -> u64 {
    500
}

const fn default_position_interval() -> u64 {
    250
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            initial_volume: default_volume(),
            transition_delay_ms: default_transition_delay(),
            position_interval_ms: default_position_interval(),
            deny_autoplay: false,
            shuffle: false,
            repeat: false,
        }
    }
}

impl PlayerConfig {
    #[must_use]
    pub const fn transition_delay(&self) -> Duration {
        Duration::from_millis(self.transition_delay_ms)
    }

    #[must_use]
    pub const fn position_interval(&self) -> Duration {
        Duration::from_millis(self.position_interval_ms)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::ConfigInvalid`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if !self.initial_volume.is_finite() || !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(PlayerError::ConfigInvalid {
                message: format!(
                    "player.initial_volume must be between 0.0 and 1.0, got {}",
                    self.initial_volume
                ),
            });
        }
        if self.position_interval_ms == 0 {
            return Err(PlayerError::ConfigInvalid {
                message: "player.position_interval_ms must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to `lyricdeck.log` in the config directory
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaylistConfig {
    #[serde(default)]
    pub tracks: Vec<TrackConfig>,
}

/// One `[[playlist.tracks]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackConfig {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    /// File path or URL handed to the audio output
    pub source: String,
    /// Track length as `m:ss` or `h:mm:ss`
    #[serde(default)]
    pub duration: Option<String>,
    /// Inline LRC text
    #[serde(default)]
    pub lyrics: Option<String>,
    /// LRC file, relative to the config directory unless absolute
    #[serde(default)]
    pub lyrics_file: Option<PathBuf>,
}

impl TrackConfig {
    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(PlayerError::ConfigInvalid {
                message: format!("track \"{}\" has an empty id", self.title),
            });
        }
        if self.lyrics.is_some() && self.lyrics_file.is_some() {
            return Err(PlayerError::ConfigInvalid {
                message: format!("track {}: set either lyrics or lyrics_file, not both", self.id),
            });
        }
        if let Some(duration) = &self.duration {
            if parse_clock(duration).is_none() {
                return Err(PlayerError::ConfigInvalid {
                    message: format!("track {}: invalid duration \"{duration}\"", self.id),
                });
            }
        }
        Ok(())
    }

    /// Resolve the lyrics and build the track
    fn to_track(&self, base_dir: &Path) -> Result<Track> {
        let lrc_text = match (&self.lyrics, &self.lyrics_file) {
            (Some(inline), _) => Some(inline.clone()),
            (None, Some(file)) => Some(fs::read_to_string(base_dir.join(file))?),
            (None, None) => None,
        };

        let lrc = lrc_text.as_deref().map(LrcFile::parse).transpose()?;

        let mut source = TrackSource::new(&self.source);
        let duration = self
            .duration
            .as_deref()
            .and_then(parse_clock)
            .or_else(|| lrc.as_ref().and_then(|l| l.metadata.length));
        if let Some(duration) = duration {
            source = source.with_duration(duration);
        }

        let lines = lrc.map(|l| l.lines).unwrap_or_default();
        if lines.is_empty() {
            warn!("Track {} has no timed lyrics", self.id);
        }

        let track = Track::new(&self.id, &self.title, &self.artist, source, lines);
        Ok(match &self.album {
            Some(album) => track.with_album(album),
            None => track,
        })
    }
}

impl LyricdeckConfig {
    /// Get the configuration directory path
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from file, writing the template with a demo playlist on first run
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written, read, parsed or validated.
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&config_path, CONFIG_TEMPLATE)?;
            info!("Created config template at {}", config_path.display());
        }

        Self::load_from(&config_path)
    }

    /// Load and validate a config file.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::ConfigNotFound`] if `path` does not exist, or a parse
    /// or validation error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PlayerError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate config text.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::ConfigParseError`] for malformed TOML or
    /// [`PlayerError::ConfigInvalid`] for out-of-range values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::ConfigInvalid`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        self.player.validate()?;
        for track in &self.playlist.tracks {
            track.validate()?;
        }
        Ok(())
    }

    /// Build the playlist, resolving `lyrics_file` paths against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::EmptyPlaylist`] when no tracks are configured, or
    /// an IO, LRC or duplicate id error from an individual track.
    pub fn build_playlist(&self, base_dir: &Path) -> Result<Playlist> {
        let tracks = self
            .playlist
            .tracks
            .iter()
            .map(|t| t.to_track(base_dir))
            .collect::<Result<Vec<_>>>()?;
        Playlist::new(tracks)
    }
}

/// Default config written on first run
pub const CONFIG_TEMPLATE: &str = r##"# Lyricdeck Configuration
# ~/.config/lyricdeck/config.toml

[player]
# Starting volume, 0.0 to 1.0
initial_volume = 0.7
# Delay between pressing a transport control and the change taking effect
transition_delay_ms = 500
# How often the playhead position is reported
position_interval_ms = 250
# Refuse the first play request, as browsers do before any user interaction
deny_autoplay = false
shuffle = false
repeat = false

[logging]
# Also write logs to ~/.config/lyricdeck/lyricdeck.log
enabled = false

# Tracks play in the order listed. Each track takes either inline LRC
# (`lyrics`) or a path to an .lrc file (`lyrics_file`, relative to this directory).

[[playlist.tracks]]
id = "awesome-song"
title = "Awesome Song Title"
artist = "Amazing Artist"
album = "Demo Sessions"
source = "demo/awesome-song.mp3"
duration = "3:45"
lyrics = '''
[ti:Awesome Song Title]
[ar:Amazing Artist]
[00:00.00]Lights come up on an empty stage
[00:05.00]Every heartbeat turns the page
[00:12.00]Hold the note until it fades
[00:18.50]We were made for nights like these
[00:25.00]Singing louder than the breeze
'''

[[playlist.tracks]]
id = "second-wind"
title = "Second Wind"
artist = "Amazing Artist"
source = "demo/second-wind.mp3"
duration = "2:58"
lyrics = '''
[00:02.00]Morning breaks across the bay
[00:08.25]Leave the static far away
[00:14.00]Catch the second wind
[00:20.75]And let it carry us home
'''
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_and_builds() {
        let config = LyricdeckConfig::from_toml_str(CONFIG_TEMPLATE).unwrap();
        assert!((config.player.initial_volume - DEFAULT_VOLUME).abs() < f32::EPSILON);
        assert_eq!(config.player.transition_delay(), Duration::from_millis(500));
        assert!(!config.logging.enabled);

        let playlist = config.build_playlist(Path::new(".")).unwrap();
        assert_eq!(playlist.len(), 2);

        let first = playlist.track(0);
        assert_eq!(first.album.as_deref(), Some("Demo Sessions"));
        assert_eq!(first.duration(), Some(Duration::from_secs(225)));
        assert_eq!(first.lyrics().len(), 5);
        assert_eq!(first.lyrics()[1].start_time, Duration::from_secs(5));
    }

    #[test]
    fn test_malformed_inline_lyrics_fail_build() {
        let toml = r#"
[[playlist.tracks]]
id = "a"
title = "A"
artist = "B"
source = "a.mp3"
duration = "1:00"
lyrics = '[18446744073709551615:00:00]x'
"#;
        let config = LyricdeckConfig::from_toml_str(toml).unwrap();
        let err = config.build_playlist(Path::new(".")).unwrap_err();
        assert!(matches!(err, PlayerError::LrcParseError { .. }));
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = LyricdeckConfig::from_toml_str("").unwrap();
        assert_eq!(config.player.position_interval_ms, 250);
        assert!(!config.player.deny_autoplay);
        assert!(config.playlist.tracks.is_empty());
        assert!(matches!(
            config.build_playlist(Path::new(".")),
            Err(PlayerError::EmptyPlaylist)
        ));
    }

    #[test]
    fn test_rejects_out_of_range_volume() {
        let err = LyricdeckConfig::from_toml_str("[player]\ninitial_volume = 1.5\n").unwrap_err();
        assert!(matches!(err, PlayerError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err =
            LyricdeckConfig::from_toml_str("[player]\nposition_interval_ms = 0\n").unwrap_err();
        assert!(matches!(err, PlayerError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_parse_error() {
        let err = LyricdeckConfig::from_toml_str("[player\n").unwrap_err();
        assert!(matches!(err, PlayerError::ConfigParseError(_)));
    }

    #[test]
    fn test_rejects_both_lyric_sources() {
        let toml = r#"
[[playlist.tracks]]
id = "a"
title = "A"
artist = "B"
source = "a.mp3"
lyrics = "[00:01.00]x"
lyrics_file = "a.lrc"
"#;
        let err = LyricdeckConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, PlayerError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_rejects_bad_duration() {
        let toml = r#"
[[playlist.tracks]]
id = "a"
title = "A"
artist = "B"
source = "a.mp3"
duration = "three minutes"
"#;
        let err = LyricdeckConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, PlayerError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_lyrics_file_relative_to_base_dir() {
        let dir = std::env::temp_dir().join(format!("lyricdeck-config-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("song.lrc"), "[length:1:30]\n[00:01.00]one\n[00:04.00]two\n").unwrap();

        let toml = r#"
[[playlist.tracks]]
id = "song"
title = "Song"
artist = "Someone"
source = "song.mp3"
lyrics_file = "song.lrc"
"#;
        let config = LyricdeckConfig::from_toml_str(toml).unwrap();
        let playlist = config.build_playlist(&dir).unwrap();
        let track = playlist.track(0);
        assert_eq!(track.lyrics().len(), 2);
        // Length falls back to the LRC [length] tag
        assert_eq!(track.duration(), Some(Duration::from_secs(90)));

        let missing = LyricdeckConfig::from_toml_str(&toml.replace("song.lrc", "nope.lrc")).unwrap();
        assert!(matches!(missing.build_playlist(&dir), Err(PlayerError::IoError(_))));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_from_missing_path() {
        let err = LyricdeckConfig::load_from(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, PlayerError::ConfigNotFound { .. }));
    }
}
