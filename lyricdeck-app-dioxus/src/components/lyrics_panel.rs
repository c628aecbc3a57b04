use crate::state::{visible_range, PlayerState};
use dioxus::prelude::*;

/// Lines shown above the active line
const VISIBLE_PREVIOUS_LINES: usize = 1;

/// Lines shown below the active line
const VISIBLE_NEXT_LINES: usize = 2;

/// Lyric display: the active line fills over its duration, neighbours are dimmed.
#[component]
pub fn LyricsPanel() -> Element {
    let player = use_context::<PlayerState>();

    let lyrics = player.lyrics.read();
    let active = *player.active_lyric.read();
    let play_state = if player.is_playing() { "running" } else { "paused" };

    if lyrics.is_empty() {
        return rsx! {
            div {
                class: "lyrics-panel empty",
                "No synced lyrics for this track"
            }
        };
    }

    let range = visible_range(
        lyrics.lines.len(),
        active,
        VISIBLE_PREVIOUS_LINES,
        VISIBLE_NEXT_LINES,
    );

    rsx! {
        div {
            class: "lyrics-panel",

            for index in range {
                {
                    let line = &lyrics.lines[index];
                    let is_current = active == Some(index);
                    let class = match active {
                        Some(a) if index == a => "lyric-line current",
                        Some(a) if index < a => "lyric-line sung",
                        _ => "lyric-line upcoming",
                    };
                    let line_style = format!(
                        "--duration: {}ms; --play-state: {play_state};",
                        line.duration.as_millis()
                    );

                    // Keyed per line so the fill animation restarts on line change
                    let line_key = lyrics.line_key(index);

                    rsx! {
                        div {
                            key: "{line_key}",
                            class: "{class}",
                            style: "{line_style}",

                            if is_current {
                                span {
                                    class: "lyric-background",
                                    "{line.text}"
                                }
                                span {
                                    class: "lyric-foreground",
                                    "{line.text}"
                                }
                            } else {
                                "{line.text}"
                            }
                        }
                    }
                }
            }
        }
    }
}
