//! Player stylesheet with hot reload.
//!
//! The embedded stylesheet is written to `~/.config/lyricdeck/theme.css` on first
//! run. Edits to that file are picked up while the player is open.

use dioxus::prelude::*;
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("Failed to access theme file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to watch theme file: {0}")]
    Watcher(#[from] notify::Error),
}

/// Stylesheet compiled into the binary
pub const DEFAULT_CSS: &str = include_str!("../assets/default_theme.css");

/// Rapid saves within this window trigger a single reload
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(300);

/// Return the stylesheet at `path`, writing the embedded one there first if missing.
///
/// # Errors
///
/// Returns an error if the file cannot be read, or created on first run.
pub fn ensure_theme_file(path: &Path) -> Result<String, ThemeError> {
    if path.exists() {
        info!("Loading theme from {}", path.display());
        return Ok(fs::read_to_string(path)?);
    }

    info!("Creating theme from template at {}", path.display());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, DEFAULT_CSS)?;
    Ok(DEFAULT_CSS.to_string())
}

/// Read the stylesheet at `path`, falling back to the embedded one
#[must_use]
pub fn read_theme_or_default(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        warn!("Failed to read theme file, using embedded CSS: {}", e);
        DEFAULT_CSS.to_string()
    })
}

/// Watch the directory holding `path`, sending `()` on every debounced change.
///
/// The watcher stops when the returned debouncer is dropped.
fn watch_theme_dir(
    path: &Path,
    tx: mpsc::Sender<()>,
) -> Result<notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>, ThemeError> {
    let theme_file = path.file_name().map(ToOwned::to_owned);
    let mut debouncer = new_debouncer(RELOAD_DEBOUNCE, move |res: DebounceEventResult| {
        let Ok(events) = res else {
            return;
        };
        if events
            .iter()
            .any(|event| event.path.file_name() == theme_file.as_deref())
        {
            // Sync callback; the receiver lives on the UI runtime
            let _ = tx.blocking_send(());
        }
    })?;

    // Editors often replace the file, so watch the parent rather than the file itself
    let dir = path
        .parent()
        .map_or_else(|| path.to_path_buf(), PathBuf::from);
    debouncer.watcher().watch(&dir, RecursiveMode::NonRecursive)?;
    Ok(debouncer)
}

/// Dioxus hook returning the current stylesheet, reloaded whenever the theme file changes.
#[must_use]
pub fn use_theme_watcher(cancel_token: CancellationToken) -> Signal<String> {
    let mut css = use_signal(|| {
        ensure_theme_file(&lyricdeck_core::theme_path()).unwrap_or_else(|e| {
            error!("Failed to initialize theme: {}", e);
            DEFAULT_CSS.to_string()
        })
    });

    use_effect(move || {
        let cancel_token = cancel_token.clone();

        spawn(async move {
            let theme_path = lyricdeck_core::theme_path();
            let (tx, mut rx) = mpsc::channel::<()>(16);

            let debouncer = match watch_theme_dir(&theme_path, tx) {
                Ok(debouncer) => debouncer,
                Err(e) => {
                    error!("{}", e);
                    return;
                }
            };
            info!("Watching {} for changes", theme_path.display());

            loop {
                tokio::select! {
                    () = cancel_token.cancelled() => {
                        debug!("Theme watcher shutting down");
                        break;
                    }
                    Some(()) = rx.recv() => {
                        info!("Theme file changed, reloading CSS");
                        css.set(read_theme_or_default(&theme_path));
                    }
                }
            }

            drop(debouncer);
        });
    });

    css
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_theme_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lyricdeck-theme-{name}-{}", std::process::id()))
    }

    #[test]
    fn test_first_run_writes_embedded_theme() {
        let dir = temp_theme_dir("first-run");
        let path = dir.join("theme.css");
        let _ = fs::remove_dir_all(&dir);

        let css = ensure_theme_file(&path).unwrap();
        assert_eq!(css, DEFAULT_CSS);
        assert_eq!(fs::read_to_string(&path).unwrap(), DEFAULT_CSS);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_existing_theme_is_kept() {
        let dir = temp_theme_dir("existing");
        let path = dir.join("theme.css");
        fs::create_dir_all(&dir).unwrap();
        fs::write(&path, ".player-card { color: red; }").unwrap();

        assert_eq!(ensure_theme_file(&path).unwrap(), ".player-card { color: red; }");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_theme_falls_back() {
        let path = temp_theme_dir("missing").join("nope.css");
        assert_eq!(read_theme_or_default(&path), DEFAULT_CSS);
    }
}
