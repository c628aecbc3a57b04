use crate::state::PlayerState;
use dioxus::prelude::*;
use lyricdeck_core::{PlaybackEngine, PlayerEvent, SkipDirection, TransportState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const LOG_TARGET: &str = "lyricdeck::bridge";

/// User intents issued by the controls
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerCommand {
    TogglePlayPause,
    Skip(SkipDirection),
    Select(usize),
    SetVolume(f32),
    Seek(Duration),
    ToggleShuffle,
    ToggleRepeat,
    Stop,
}

/// Send a command to the engine without blocking the UI
pub fn dispatch(engine: &Arc<PlaybackEngine>, command: PlayerCommand) {
    let engine = Arc::clone(engine);
    spawn(async move {
        let result = match command {
            PlayerCommand::TogglePlayPause => engine.toggle_play_pause().await,
            PlayerCommand::Skip(direction) => engine.skip(direction).await,
            PlayerCommand::Select(index) => engine.select_track(index).await,
            PlayerCommand::SetVolume(volume) => engine.set_volume(volume).await,
            PlayerCommand::Seek(position) => engine.seek(position).await,
            PlayerCommand::ToggleShuffle => engine.toggle_shuffle().await.map(|_| ()),
            PlayerCommand::ToggleRepeat => engine.toggle_repeat().await.map(|_| ()),
            PlayerCommand::Stop => engine.stop().await,
        };
        if let Err(e) = result {
            warn!(target: LOG_TARGET, "{:?} rejected: {}", command, e);
        }
    });
}

/// Bridge `PlaybackEngine` events to Dioxus signals.
/// Spawns a task that listens to engine events and updates the player state.
pub fn use_player_bridge(engine: Arc<PlaybackEngine>, player: PlayerState) {
    use_future(move || {
        let engine = engine.clone();
        async move {
            let mut rx = engine.subscribe();

            loop {
                match rx.recv().await {
                    Ok(event) => {
                        handle_player_event(&engine, event, player);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        info!(target: LOG_TARGET, "Player event channel closed");
                        break;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        info!(target: LOG_TARGET, "Missed {} player events", n);
                    }
                }
            }
        }
    });
}

fn handle_player_event(engine: &PlaybackEngine, event: PlayerEvent, mut player: PlayerState) {
    match event {
        PlayerEvent::TransportChanged { state } => {
            player.transport.set(state);
            // A new attempt clears the last notice
            if state == TransportState::Loading {
                player.notice.set(None);
            }
        }
        PlayerEvent::TrackChanged { index, .. } => {
            if let Some(track) = engine.playlist().get(index) {
                player.set_track(index, track);
            }
        }
        PlayerEvent::PositionChanged { position } => {
            player.position.set(position);
        }
        PlayerEvent::ActiveLyricChanged { index, .. } => {
            player.active_lyric.set(index);
        }
        PlayerEvent::VolumeChanged { volume } => {
            player.volume.set(volume);
        }
        PlayerEvent::ShuffleChanged { enabled } => {
            player.shuffle.set(enabled);
        }
        PlayerEvent::RepeatChanged { enabled } => {
            player.repeat.set(enabled);
        }
        PlayerEvent::PlaybackDenied { reason } => {
            player
                .notice
                .set(Some(format!("Playback blocked: {reason}. Press play to retry.")));
        }
        PlayerEvent::Error { message } => {
            player.notice.set(Some(message));
        }
    }
}
