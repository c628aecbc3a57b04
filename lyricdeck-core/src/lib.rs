pub mod config;
pub mod engine;
pub mod error;
pub mod lrc;
pub mod lyric_sync;
pub mod output;
pub mod paths;
pub mod playlist;
pub mod presentation;
pub mod sequencer;
pub mod session;
pub mod time;

pub use config::{
    LoggingConfig, LyricdeckConfig, PlayerConfig, PlaylistConfig, TrackConfig, CONFIG_TEMPLATE,
    DEFAULT_VOLUME,
};

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;
pub use engine::{PlaybackEngine, PlayerEvent};
pub use error::{PlayerError, Result};
pub use lrc::{LrcFile, LrcLine, LrcMetadata, LrcWord};
pub use lyric_sync::{resolve_active_lyric, resolve_active_lyric_at};
pub use output::{AudioOutput, SimulatedOutput};
pub use paths::{
    config_dir, config_path, log_file_path, theme_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME,
    LOG_FILE_NAME, THEME_FILE_NAME,
};
pub use playlist::{Playlist, Track, TrackSource};
pub use presentation::{effects_for, PlayerSnapshot, VisualEffects};
pub use session::{select_next_index, PlayerSession, SkipDirection, TransportState};
pub use time::DurationExt;
