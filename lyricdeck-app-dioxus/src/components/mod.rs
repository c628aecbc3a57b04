mod lyrics_panel;
mod player_card;
mod playlist_view;

pub use lyrics_panel::LyricsPanel;
pub use player_card::PlayerCard;
pub use playlist_view::PlaylistView;
