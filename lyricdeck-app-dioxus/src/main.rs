#![cfg_attr(feature = "bundle", windows_subsystem = "windows")]
mod app;
mod bridge;
mod components;
mod state;
mod theme_watcher;

use crate::app::App;
use crate::bridge::use_player_bridge;
use crate::state::{PlayerState, TrackLyrics};
use dioxus::desktop::{LogicalSize, WindowBuilder};
use dioxus::prelude::*;
use lyricdeck_core::{
    LyricdeckConfig, PlaybackEngine, PlayerError, PlayerEvent, PlayerSnapshot, Playlist,
    SimulatedOutput, TomlParseError, CONFIG_TEMPLATE,
};
use rfd::{MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const APP_NAME: &str = "Lyricdeck";

/// First frame of the UI, before any player event arrives
#[derive(Clone)]
struct InitialView {
    snapshot: PlayerSnapshot,
    lyrics: TrackLyrics,
}

fn main() {
    // Check config for logging.enabled before full config load
    let file_logging_enabled = check_file_logging_enabled();
    init_tracing(file_logging_enabled);

    // Load config, writing the template with a demo playlist on first run
    let config = match LyricdeckConfig::load_or_create() {
        Ok(config) => config,
        Err(PlayerError::ConfigParseError(parse_error)) => {
            show_config_parse_error_dialog(&parse_error, &LyricdeckConfig::config_path());
            std::process::exit(1);
        }
        Err(PlayerError::ConfigInvalid { message }) => {
            show_config_error_dialog(&message, &LyricdeckConfig::config_path());
            std::process::exit(1);
        }
        Err(e) => {
            error!("{e}");
            show_generic_error_dialog(&e.to_string());
            std::process::exit(1);
        }
    };

    let playlist = match config.build_playlist(&LyricdeckConfig::config_dir()) {
        Ok(playlist) => playlist,
        Err(e) => {
            error!("Failed to build playlist: {e}");
            show_config_error_dialog(&e.to_string(), &LyricdeckConfig::config_path());
            std::process::exit(1);
        }
    };

    // Create tokio runtime for the engine and its deferred transitions
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    let initial_lyrics = TrackLyrics::from_track(playlist.track(0));
    let engine = match runtime.block_on(create_engine(playlist, &config)) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Failed to start player: {e}");
            show_generic_error_dialog(&e.to_string());
            std::process::exit(1);
        }
    };
    let initial = InitialView {
        snapshot: runtime.block_on(engine.snapshot()),
        lyrics: initial_lyrics,
    };

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Set up Ctrl+C handler to trigger graceful shutdown
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    // Background tasks
    let _pump = engine.start();
    runtime.spawn(log_player_events(engine.clone()));
    runtime.spawn(shutdown_on_cancel(engine.clone(), cancel_token.clone()));

    let window = WindowBuilder::new()
        .with_title(APP_NAME)
        .with_resizable(true)
        .with_maximizable(false)
        .with_inner_size(LogicalSize::new(560.0, 640.0));

    let dioxus_config = dioxus::desktop::Config::default()
        .with_window(window)
        .with_disable_context_menu(true);

    // Inject the engine, the first frame's state and the cancellation token before launch
    dioxus::LaunchBuilder::desktop()
        .with_cfg(dioxus_config)
        .with_context(engine)
        .with_context(initial)
        .with_context(cancel_token)
        .launch(app);
}

/// Root component that sets up context and renders the app
fn app() -> Element {
    let initial: InitialView = use_context();
    let player = use_context_provider(|| {
        PlayerState::from_snapshot(&initial.snapshot, initial.lyrics.clone())
    });

    let engine: Arc<PlaybackEngine> = use_context();
    use_player_bridge(engine, player);

    // Closing the window ends the session
    let cancel_token: CancellationToken = use_context();
    use_drop(move || cancel_token.cancel());

    rsx! {
        document::Title { "{APP_NAME}" },
        App {}
    }
}

async fn create_engine(
    playlist: Playlist,
    config: &LyricdeckConfig,
) -> lyricdeck_core::Result<Arc<PlaybackEngine>> {
    let mut output = SimulatedOutput::new(config.player.position_interval());
    if config.player.deny_autoplay {
        output = output.with_denied_plays(1);
    }
    PlaybackEngine::new(playlist, Box::new(output), &config.player).await
}

/// Release the player once shutdown is requested
async fn shutdown_on_cancel(engine: Arc<PlaybackEngine>, cancel_token: CancellationToken) {
    cancel_token.cancelled().await;
    engine.shutdown().await;
    std::process::exit(0);
}

/// Log notable player events to the console
async fn log_player_events(engine: Arc<PlaybackEngine>) {
    let mut rx = engine.subscribe();

    loop {
        match rx.recv().await {
            Ok(event) => match &event {
                PlayerEvent::ActiveLyricChanged {
                    text: Some(text), ..
                } => {
                    info!("\u{266a} {}", text);
                }
                PlayerEvent::PlaybackDenied { reason } => {
                    warn!("Press play again to start playback ({})", reason);
                }
                PlayerEvent::Error { message } => {
                    error!("Player error: {}", message);
                }
                // Transport and track changes are logged by the engine
                _ => {}
            },
            Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                info!("Player event channel closed");
                break;
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                info!("Missed {} player events", n);
            }
        }
    }
}

/// Show a native OS dialog for an invalid configuration
fn show_config_error_dialog(message: &str, config_path: &Path) {
    let description = format!(
        "Your configuration could not be used:\n\n{message}\n\n\
        Please edit the configuration file and restart the player."
    );

    let result = MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title("Lyricdeck - Configuration Error")
        .set_description(&description)
        .set_buttons(MessageButtons::OkCancelCustom(
            "Open Config".into(),
            "Exit".into(),
        ))
        .show();

    if matches!(result, MessageDialogResult::Custom(ref s) if s == "Open Config") {
        if let Err(e) = open::that(config_path) {
            error!("Failed to open config file: {e}");
        }
    }
}

/// Show dialog when config file has TOML parsing errors
fn show_config_parse_error_dialog(parse_error: &TomlParseError, config_path: &Path) {
    let message = format!(
        "Your configuration file has a syntax error and cannot be loaded.\n\n\
        Error: {parse_error}\n\n\
        You can either:\n\
        \u{2022} Open the config file and fix the syntax error\n\
        \u{2022} Reset to the default configuration with the demo playlist"
    );

    let result = MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title("Lyricdeck - Configuration Error")
        .set_description(&message)
        .set_buttons(MessageButtons::OkCancelCustom(
            "Open Config".into(),
            "Reset Config".into(),
        ))
        .show();

    match result {
        MessageDialogResult::Custom(button) if button == "Open Config" => {
            if let Err(e) = open::that(config_path) {
                error!("Failed to open config file: {e}");
            }
        }
        MessageDialogResult::Custom(button) if button == "Reset Config" => {
            if let Err(e) = std::fs::write(config_path, CONFIG_TEMPLATE) {
                error!("Failed to reset config file: {e}");
                MessageDialog::new()
                    .set_level(MessageLevel::Error)
                    .set_title("Lyricdeck - Reset Failed")
                    .set_description(format!("Failed to reset configuration:\n{e}"))
                    .set_buttons(MessageButtons::Ok)
                    .show();
            } else {
                MessageDialog::new()
                    .set_level(MessageLevel::Info)
                    .set_title("Lyricdeck - Configuration Reset")
                    .set_description(
                        "Configuration has been reset to the default template.\n\n\
                        Restart the player to load the demo playlist.",
                    )
                    .set_buttons(MessageButtons::Ok)
                    .show();
            }
        }
        _ => {}
    }
}

/// Show a generic error dialog for unexpected errors
fn show_generic_error_dialog(error_message: &str) {
    let message = format!(
        "An unexpected error occurred:\n\n{error_message}\n\n\
        Please check your configuration file or report this issue."
    );

    MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title("Lyricdeck - Error")
        .set_description(&message)
        .set_buttons(MessageButtons::Ok)
        .show();
}

/// Check if file logging is enabled by reading the config file.
/// This is done before full config loading to set up tracing first.
/// Returns `false` if config doesn't exist or can't be parsed.
fn check_file_logging_enabled() -> bool {
    // Minimal structs to parse just the logging.enabled field
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }
    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    let Ok(content) = std::fs::read_to_string(LyricdeckConfig::config_path()) else {
        return false;
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging.enabled)
        .unwrap_or(false)
}

/// Initialize tracing with console output and optional file logging
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer();

    if file_logging_enabled {
        let log_path = lyricdeck_core::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
