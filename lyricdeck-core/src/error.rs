use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayerError {
    // Configuration errors
    #[error("Config file not found at {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Playlist errors
    #[error("Playlist has no tracks")]
    EmptyPlaylist,

    #[error("Duplicate track id in playlist: {id}")]
    DuplicateTrackId { id: String },

    // Lyrics errors
    #[error("Failed to parse LRC: {reason}")]
    LrcParseError { reason: String },

    // Playback errors
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Playback denied by audio output: {reason}")]
    PlaybackDenied { reason: String },

    #[error("Audio output {output} failed: {reason}")]
    Output { output: String, reason: String },

    #[error("Player session has been shut down")]
    SessionClosed,

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PlayerError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;
