use crate::components::{LyricsPanel, PlayerCard, PlaylistView};
use crate::theme_watcher::use_theme_watcher;
use dioxus::prelude::*;
use tokio_util::sync::CancellationToken;

/// Root application component: stylesheet, player card, lyrics and track list.
#[component]
pub fn App() -> Element {
    let cancel_token: CancellationToken = use_context();
    let css = use_theme_watcher(cancel_token);

    rsx! {
        style { "{css}" }
        div {
            class: "app",
            PlayerCard {}
            LyricsPanel {}
            PlaylistView {}
        }
    }
}
