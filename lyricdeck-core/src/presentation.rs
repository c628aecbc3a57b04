//! Read surface for the presentation layer.
//!
//! [`effects_for`] maps a transport state to the visual treatment the UI applies.
//! It is a pure function of state and never feeds back into the engine.

use crate::session::TransportState;
use crate::time::DurationExt;
use std::time::Duration;

/// Accent colour shared by the glow, equalizer and play button
pub const ACCENT_COLOR: &str = "#8B5CF6";

/// Number of equalizer bars under the track info
pub const EQUALIZER_BARS: usize = 5;

/// Card background, shadow and opacity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerEffect {
    pub background: &'static str,
    pub box_shadow: &'static str,
    pub opacity: f32,
}

/// Artwork scale and rotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArtworkEffect {
    pub scale: f32,
    /// Time for one full turn; `None` means the artwork rests at 0 degrees
    pub spin_period: Option<Duration>,
}

/// Equalizer bar animation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqualizerEffect {
    pub rest_height_px: u32,
    /// Height the bars pulse up to; `None` when static
    pub peak_height_px: Option<u32>,
    pub period: Duration,
    /// Extra delay per bar so the bars ripple
    pub stagger: Duration,
    pub opacity: f32,
}

impl EqualizerEffect {
    /// Animation delay for bar `index`
    #[must_use]
    pub fn bar_delay(&self, index: usize) -> Duration {
        self.stagger * u32::try_from(index).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub const fn is_animated(&self) -> bool {
        self.peak_height_px.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayButtonIcon {
    Play,
    Pause,
    Spinner,
}

impl PlayButtonIcon {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Spinner => "spinner",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayButtonEffect {
    pub icon: PlayButtonIcon,
    pub background: &'static str,
}

/// Everything the UI animates from the transport state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualEffects {
    pub container: ContainerEffect,
    pub artwork: ArtworkEffect,
    pub equalizer: EqualizerEffect,
    pub play_button: PlayButtonEffect,
}

const RESTING_CONTAINER: ContainerEffect = ContainerEffect {
    background: "#121212",
    box_shadow: "0px 4px 20px rgba(0, 0, 0, 0.5)",
    opacity: 1.0,
};

const EQUALIZER_PERIOD: Duration = Duration::from_millis(500);
const EQUALIZER_STAGGER: Duration = Duration::from_millis(100);

/// Visual treatment for a transport state
#[must_use]
pub const fn effects_for(state: TransportState) -> VisualEffects {
    match state {
        TransportState::Playing => VisualEffects {
            container: ContainerEffect {
                background: "#1A1625",
                box_shadow: "0px 0px 40px rgba(139, 92, 246, 0.4)",
                opacity: 1.0,
            },
            artwork: ArtworkEffect {
                scale: 1.0,
                spin_period: Some(Duration::from_secs(20)),
            },
            equalizer: EqualizerEffect {
                rest_height_px: 4,
                peak_height_px: Some(20),
                period: EQUALIZER_PERIOD,
                stagger: EQUALIZER_STAGGER,
                opacity: 1.0,
            },
            play_button: PlayButtonEffect {
                icon: PlayButtonIcon::Pause,
                background: ACCENT_COLOR,
            },
        },
        TransportState::Loading => VisualEffects {
            container: ContainerEffect {
                opacity: 0.8,
                ..RESTING_CONTAINER
            },
            artwork: ArtworkEffect {
                scale: 0.9,
                spin_period: None,
            },
            equalizer: EqualizerEffect {
                rest_height_px: 10,
                peak_height_px: None,
                period: EQUALIZER_PERIOD,
                stagger: EQUALIZER_STAGGER,
                opacity: 0.5,
            },
            play_button: PlayButtonEffect {
                icon: PlayButtonIcon::Spinner,
                background: "#374151",
            },
        },
        TransportState::Paused | TransportState::Stopped => VisualEffects {
            container: RESTING_CONTAINER,
            artwork: ArtworkEffect {
                scale: 0.95,
                spin_period: None,
            },
            equalizer: EqualizerEffect {
                rest_height_px: 4,
                peak_height_px: None,
                period: EQUALIZER_PERIOD,
                stagger: EQUALIZER_STAGGER,
                opacity: 1.0,
            },
            play_button: PlayButtonEffect {
                icon: PlayButtonIcon::Play,
                background: ACCENT_COLOR,
            },
        },
    }
}

/// Point-in-time view of the player for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub transport: TransportState,
    pub track_index: usize,
    pub track_count: usize,
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub active_lyric: Option<usize>,
    pub active_lyric_text: Option<String>,
    pub shuffle: bool,
    pub repeat: bool,
    pub volume: f32,
}

/// Fraction of the track played, `0.0` when the duration is unknown
#[must_use]
pub fn progress(position: Duration, duration: Option<Duration>) -> f32 {
    match duration {
        Some(duration) if !duration.is_zero() => {
            (position.as_secs_f32() / duration.as_secs_f32()).clamp(0.0, 1.0)
        }
        _ => 0.0,
    }
}

/// Track length label, `--:--` when unknown
#[must_use]
pub fn duration_label(duration: Option<Duration>) -> String {
    duration.map_or_else(|| "--:--".to_string(), |d| d.to_clock_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playing_spins_and_glows() {
        let effects = effects_for(TransportState::Playing);
        assert_eq!(effects.artwork.spin_period, Some(Duration::from_secs(20)));
        assert!(effects.equalizer.is_animated());
        assert!(effects.container.box_shadow.contains("139, 92, 246"));
        assert_eq!(effects.play_button.icon, PlayButtonIcon::Pause);
    }

    #[test]
    fn test_loading_dims_and_spins_button() {
        let effects = effects_for(TransportState::Loading);
        assert!((effects.container.opacity - 0.8).abs() < f32::EPSILON);
        assert!(!effects.equalizer.is_animated());
        assert_eq!(effects.equalizer.rest_height_px, 10);
        assert_eq!(effects.play_button.icon, PlayButtonIcon::Spinner);
    }

    #[test]
    fn test_stopped_looks_paused() {
        assert_eq!(
            effects_for(TransportState::Stopped),
            effects_for(TransportState::Paused)
        );
    }

    #[test]
    fn test_bar_delay() {
        let eq = effects_for(TransportState::Playing).equalizer;
        assert_eq!(eq.bar_delay(0), Duration::ZERO);
        assert_eq!(eq.bar_delay(3), Duration::from_millis(300));
    }

    #[test]
    fn test_progress_and_labels() {
        let position = Duration::from_secs(83);
        let duration = Some(Duration::from_secs(225));
        assert_eq!(duration_label(duration), "3:45");
        assert!((progress(position, duration) - 83.0 / 225.0).abs() < 0.001);
        assert!((progress(Duration::from_secs(300), duration) - 1.0).abs() < f32::EPSILON);

        assert_eq!(duration_label(None), "--:--");
        assert!(progress(position, None).abs() < f32::EPSILON);
        assert!(progress(position, Some(Duration::ZERO)).abs() < f32::EPSILON);
    }
}
