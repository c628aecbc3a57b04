use crate::bridge::{dispatch, PlayerCommand};
use crate::state::PlayerState;
use dioxus::prelude::*;
use lyricdeck_core::{DurationExt, PlaybackEngine};
use std::sync::Arc;

/// Track list; clicking a row jumps to that track.
#[component]
pub fn PlaylistView() -> Element {
    let player = use_context::<PlayerState>();
    let engine = use_context::<Arc<PlaybackEngine>>();
    let current = player.track.read().index;

    let rows: Vec<(usize, String, String, String)> = engine
        .playlist()
        .iter()
        .enumerate()
        .map(|(index, track)| {
            let length = track
                .duration()
                .map_or_else(|| "--:--".to_string(), |d| d.to_clock_string());
            (index, track.title.clone(), track.artist.clone(), length)
        })
        .collect();

    rsx! {
        ol {
            class: "playlist",
            for (index, title, artist, length) in rows {
                {
                    let engine = engine.clone();
                    rsx! {
                        li {
                            key: "{index}",
                            class: if index == current { "playlist-row current" } else { "playlist-row" },
                            onclick: move |_| dispatch(&engine, PlayerCommand::Select(index)),
                            span { class: "playlist-title", "{title}" }
                            span { class: "playlist-artist", "{artist}" }
                            span { class: "playlist-length", "{length}" }
                        }
                    }
                }
            }
        }
    }
}
