use crate::bridge::{dispatch, PlayerCommand};
use crate::state::PlayerState;
use dioxus::prelude::*;
use lyricdeck_core::presentation::{duration_label, progress, PlayButtonIcon, EQUALIZER_BARS};
use lyricdeck_core::{effects_for, DurationExt, PlaybackEngine, SkipDirection};
use std::sync::Arc;
use std::time::Duration;

/// Now-playing card: artwork, track info, equalizer, progress and controls.
#[component]
pub fn PlayerCard() -> Element {
    let player = use_context::<PlayerState>();
    let engine = use_context::<Arc<PlaybackEngine>>();

    let effects = effects_for(*player.transport.read());
    let track = player.track.read().clone();
    let position = *player.position.read();
    let volume = *player.volume.read();
    let shuffle = *player.shuffle.read();
    let repeat = *player.repeat.read();
    let notice = player.notice.read().clone();

    let container_style = format!(
        "background: {}; box-shadow: {}; opacity: {};",
        effects.container.background, effects.container.box_shadow, effects.container.opacity
    );

    let artwork_style = effects.artwork.spin_period.map_or_else(
        || format!("transform: scale({});", effects.artwork.scale),
        |period| {
            format!(
                "--scale: {}; animation-duration: {}ms;",
                effects.artwork.scale,
                period.as_millis()
            )
        },
    );
    let artwork_class = if effects.artwork.spin_period.is_some() {
        "artwork spinning"
    } else {
        "artwork"
    };

    let equalizer = effects.equalizer;
    let bar_play_state = if equalizer.is_animated() { "running" } else { "paused" };
    let peak = equalizer.peak_height_px.unwrap_or(equalizer.rest_height_px);
    let bar_styles: Vec<String> = (0..EQUALIZER_BARS)
        .map(|i| {
            format!(
                "--rest: {rest}px; --peak: {peak}px; height: {rest}px; \
                 animation-duration: {}ms; animation-delay: {}ms; animation-play-state: {bar_play_state};",
                equalizer.period.as_millis(),
                equalizer.bar_delay(i).as_millis(),
                rest = equalizer.rest_height_px,
            )
        })
        .collect();
    let equalizer_style = format!("opacity: {};", equalizer.opacity);
    let counter = format!("{} / {}", track.index + 1, track.count);

    let duration_secs = track.duration.map_or(0.0, |d| d.as_secs_f64());
    let position_secs = position.as_secs_f64();
    let progress_pct = progress(position, track.duration) * 100.0;
    let position_label = position.to_clock_string();
    let length_label = duration_label(track.duration);
    let progress_title = position_title(position, track.duration);

    let play_icon = effects.play_button.icon;
    let play_style = format!("background: {};", effects.play_button.background);

    let on_toggle = {
        let engine = engine.clone();
        move |_: MouseEvent| dispatch(&engine, PlayerCommand::TogglePlayPause)
    };
    let on_previous = {
        let engine = engine.clone();
        move |_: MouseEvent| dispatch(&engine, PlayerCommand::Skip(SkipDirection::Previous))
    };
    let on_next = {
        let engine = engine.clone();
        move |_: MouseEvent| dispatch(&engine, PlayerCommand::Skip(SkipDirection::Next))
    };
    let on_shuffle = {
        let engine = engine.clone();
        move |_: MouseEvent| dispatch(&engine, PlayerCommand::ToggleShuffle)
    };
    let on_repeat = {
        let engine = engine.clone();
        move |_: MouseEvent| dispatch(&engine, PlayerCommand::ToggleRepeat)
    };
    let on_seek = {
        let engine = engine.clone();
        move |evt: FormEvent| {
            if let Some(position) = evt
                .value()
                .parse::<f64>()
                .ok()
                .and_then(lyricdeck_core::time::duration_from_secs)
            {
                dispatch(&engine, PlayerCommand::Seek(position));
            }
        }
    };
    let on_stop = {
        let engine = engine.clone();
        move |_: MouseEvent| dispatch(&engine, PlayerCommand::Stop)
    };
    let on_volume = move |evt: FormEvent| {
        if let Ok(volume) = evt.value().parse::<f32>() {
            dispatch(&engine, PlayerCommand::SetVolume(volume));
        }
    };

    rsx! {
        div {
            class: "player-card",
            style: "{container_style}",

            div {
                class: "card-top",

                div {
                    class: "{artwork_class}",
                    style: "{artwork_style}",
                    div { class: "artwork-disc" }
                }

                div {
                    class: "track-info",
                    h2 { class: "track-title", "{track.title}" }
                    p { class: "track-artist", "{track.artist}" }
                    {track.album.as_ref().map(|album| rsx! {
                        p { class: "track-album", "{album}" }
                    })}
                    p { class: "track-counter", "{counter}" }

                    div {
                        class: "equalizer",
                        style: "{equalizer_style}",
                        for (i, bar_style) in bar_styles.iter().enumerate() {
                            div {
                                key: "{i}",
                                class: "equalizer-bar",
                                style: "{bar_style}",
                            }
                        }
                    }
                }
            }

            div {
                class: "progress",
                input {
                    r#type: "range",
                    class: "progress-slider",
                    style: "--progress: {progress_pct}%;",
                    min: "0",
                    max: "{duration_secs}",
                    step: "0.1",
                    value: "{position_secs}",
                    title: "{progress_title}",
                    disabled: track.duration.is_none(),
                    oninput: on_seek,
                }
                div {
                    class: "progress-labels",
                    span { "{position_label}" }
                    span { "{length_label}" }
                }
            }

            div {
                class: "controls",

                button {
                    class: if shuffle { "control toggle active" } else { "control toggle" },
                    title: "Shuffle",
                    onclick: on_shuffle,
                    ShuffleIcon {}
                }
                button {
                    class: "control",
                    title: "Previous",
                    onclick: on_previous,
                    SkipIcon { forward: false }
                }
                button {
                    class: "control play-button",
                    style: "{play_style}",
                    title: "Play/Pause",
                    onclick: on_toggle,
                    {match play_icon {
                        PlayButtonIcon::Play => rsx! { PlayIcon {} },
                        PlayButtonIcon::Pause => rsx! { PauseIcon {} },
                        PlayButtonIcon::Spinner => rsx! { div { class: "spinner" } },
                    }}
                }
                button {
                    class: "control",
                    title: "Next",
                    onclick: on_next,
                    SkipIcon { forward: true }
                }
                button {
                    class: if repeat { "control toggle active" } else { "control toggle" },
                    title: "Repeat",
                    onclick: on_repeat,
                    RepeatIcon {}
                }
            }

            div {
                class: "volume",
                button {
                    class: "control",
                    title: "Stop",
                    onclick: on_stop,
                    StopIcon {}
                }
                VolumeIcon {}
                input {
                    r#type: "range",
                    class: "volume-slider",
                    min: "0",
                    max: "1",
                    step: "0.01",
                    value: "{volume}",
                    oninput: on_volume,
                }
            }

            {notice.map(|notice| rsx! {
                p { class: "notice", "{notice}" }
            })}
        }
    }
}

/// Tooltip for the progress slider
fn position_title(position: Duration, duration: Option<Duration>) -> String {
    duration.map_or_else(
        || position.to_clock_string(),
        |d| format!("{} of {}", position.to_clock_string(), d.to_clock_string()),
    )
}

#[component]
fn PlayIcon() -> Element {
    rsx! {
        svg {
            view_box: "0 0 24 24",
            width: "24",
            height: "24",
            path { d: "M8 5v14l11-7z", fill: "currentColor" }
        }
    }
}

#[component]
fn PauseIcon() -> Element {
    rsx! {
        svg {
            view_box: "0 0 24 24",
            width: "24",
            height: "24",
            path { d: "M6 5h4v14H6zM14 5h4v14h-4z", fill: "currentColor" }
        }
    }
}

#[component]
fn StopIcon() -> Element {
    rsx! {
        svg {
            view_box: "0 0 24 24",
            width: "18",
            height: "18",
            path { d: "M6 6h12v12H6z", fill: "currentColor" }
        }
    }
}

#[component]
fn SkipIcon(forward: bool) -> Element {
    let d = if forward {
        "M6 6l8.5 6L6 18zM16 6h2v12h-2z"
    } else {
        "M18 6l-8.5 6L18 18zM6 6h2v12H6z"
    };
    rsx! {
        svg {
            view_box: "0 0 24 24",
            width: "24",
            height: "24",
            path { d: "{d}", fill: "currentColor" }
        }
    }
}

#[component]
fn ShuffleIcon() -> Element {
    rsx! {
        svg {
            view_box: "0 0 24 24",
            width: "20",
            height: "20",
            path {
                d: "M16 3h5v5M4 20L21 3M21 16v5h-5M15 15l6 6M4 4l5 5",
                fill: "none",
                stroke: "currentColor",
                stroke_width: "2",
            }
        }
    }
}

#[component]
fn RepeatIcon() -> Element {
    rsx! {
        svg {
            view_box: "0 0 24 24",
            width: "20",
            height: "20",
            path {
                d: "M17 1l4 4-4 4M3 11V9a4 4 0 0 1 4-4h14M7 23l-4-4 4-4M21 13v2a4 4 0 0 1-4 4H3",
                fill: "none",
                stroke: "currentColor",
                stroke_width: "2",
            }
        }
    }
}

#[component]
fn VolumeIcon() -> Element {
    rsx! {
        svg {
            view_box: "0 0 24 24",
            width: "18",
            height: "18",
            path {
                d: "M11 5L6 9H2v6h4l5 4zM15.5 8.5a5 5 0 0 1 0 7M19 5a10 10 0 0 1 0 14",
                fill: "none",
                stroke: "currentColor",
                stroke_width: "2",
            }
        }
    }
}
