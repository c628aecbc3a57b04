use crate::config::PlayerConfig;
use crate::error::{PlayerError, Result};
use crate::output::AudioOutput;
use crate::playlist::{Playlist, Track};
use crate::presentation::PlayerSnapshot;
use crate::sequencer::{Ticket, TransitionSequencer};
use crate::session::{select_next_index, PlayerSession, SkipDirection, TransportState};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Events emitted by the playback engine
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Transport phase changed
    TransportChanged { state: TransportState },
    /// A different track is now current
    TrackChanged {
        index: usize,
        track_id: String,
        title: String,
        artist: String,
    },
    /// Playhead moved (position notification, seek, track change or stop)
    PositionChanged { position: Duration },
    /// The active lyric line changed
    ActiveLyricChanged {
        index: Option<usize>,
        text: Option<String>,
    },
    VolumeChanged { volume: f32 },
    ShuffleChanged { enabled: bool },
    RepeatChanged { enabled: bool },
    /// The audio output refused to start; the player stays paused
    PlaybackDenied { reason: String },
    /// A non-fatal audio output failure
    Error { message: String },
}

/// Deferred outcome of a transport command
#[derive(Debug, Clone, Copy)]
enum Transition {
    Resolve(TransportState),
    ChangeTrack(TrackChange),
}

#[derive(Debug, Clone, Copy)]
enum TrackChange {
    Skip(SkipDirection),
    Select(usize),
}

/// Engine state guarded by a single lock
struct EngineInner {
    session: PlayerSession,
    output: Box<dyn AudioOutput>,
    sequencer: TransitionSequencer,
    closed: bool,
}

impl EngineInner {
    const fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(PlayerError::SessionClosed)
        } else {
            Ok(())
        }
    }
}

/// Owns the player session and the audio output.
///
/// Every mutation, whether a user command, a position notification or a
/// deferred transition, takes the same write lock, so they apply one at a time
/// in arrival order.
pub struct PlaybackEngine {
    playlist: Playlist,
    transition_delay: Duration,
    inner: RwLock<EngineInner>,
    event_tx: broadcast::Sender<PlayerEvent>,
    cancel_token: CancellationToken,
    runtime: Handle,
}

impl PlaybackEngine {
    /// Create the session and load the first track into `output`.
    ///
    /// Must be called from within a tokio runtime; deferred transitions and the
    /// position pump are spawned on it.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid, no tokio runtime is available,
    /// or the output fails to load the first track.
    pub async fn new(
        playlist: Playlist,
        mut output: Box<dyn AudioOutput>,
        config: &PlayerConfig,
    ) -> Result<Arc<Self>> {
        config.validate()?;

        let runtime = Handle::try_current().map_err(|e| PlayerError::Output {
            output: output.name().into(),
            reason: format!("no tokio runtime: {e}"),
        })?;

        let mut session = PlayerSession::new(config.initial_volume);
        session.set_shuffle(config.shuffle);
        session.set_repeat(config.repeat);

        let first = playlist.track(0);
        session.change_track(0, first.lyrics());

        output.load(&first.source).await?;
        output.set_volume(session.volume()).await?;
        output.set_loop(session.repeat()).await?;

        info!(
            "Player session ready: {} track(s), output: {}, first: {} - {}",
            playlist.len(),
            output.name(),
            first.artist,
            first.title
        );

        let (event_tx, _) = broadcast::channel(256);

        Ok(Arc::new(Self {
            playlist,
            transition_delay: config.transition_delay(),
            inner: RwLock::new(EngineInner {
                session,
                output,
                sequencer: TransitionSequencer::new(runtime.clone()),
                closed: false,
            }),
            event_tx,
            cancel_token: CancellationToken::new(),
            runtime,
        }))
    }

    /// Subscribe to player events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    #[must_use]
    pub const fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    /// Token cancelled when the session shuts down
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Current state for rendering
    pub async fn snapshot(&self) -> PlayerSnapshot {
        let inner = self.inner.read().await;
        let session = &inner.session;
        let track = self.playlist.track(session.track_index());

        PlayerSnapshot {
            transport: session.transport(),
            track_index: session.track_index(),
            track_count: self.playlist.len(),
            track_id: track.id.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            position: session.position(),
            duration: track.duration(),
            active_lyric: session.active_lyric(),
            active_lyric_text: lyric_text(track, session.active_lyric()),
            shuffle: session.shuffle(),
            repeat: session.repeat(),
            volume: session.volume(),
        }
    }

    pub async fn transport(&self) -> TransportState {
        self.inner.read().await.session.transport()
    }

    /// Toggle between playing and paused after the transition delay.
    ///
    /// Dropped while a transition is loading.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::SessionClosed`] after [`shutdown`](Self::shutdown).
    pub async fn toggle_play_pause(self: &Arc<Self>) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.ensure_open()?;

        let Some(target) = inner.session.transport().toggle_target() else {
            debug!("Ignoring play/pause while loading");
            return Ok(());
        };

        self.set_transport(&mut inner, TransportState::Loading);
        self.schedule(&mut inner, Transition::Resolve(target));
        Ok(())
    }

    /// Move to the next or previous track and start playing it.
    ///
    /// Always accepted, even while loading: the pending transition is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::SessionClosed`] after [`shutdown`](Self::shutdown).
    pub async fn skip(self: &Arc<Self>, direction: SkipDirection) -> Result<()> {
        self.begin_track_change(TrackChange::Skip(direction)).await
    }

    /// Jump to the track at `index` and start playing it.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::InvalidArgument`] if `index` is outside the playlist,
    /// or [`PlayerError::SessionClosed`] after shutdown.
    pub async fn select_track(self: &Arc<Self>, index: usize) -> Result<()> {
        if index >= self.playlist.len() {
            return Err(PlayerError::invalid_argument(format!(
                "track index {index} out of range (playlist has {} tracks)",
                self.playlist.len()
            )));
        }
        self.begin_track_change(TrackChange::Select(index)).await
    }

    async fn begin_track_change(self: &Arc<Self>, change: TrackChange) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.ensure_open()?;

        if inner.sequencer.cancel_pending() {
            debug!("{:?} supersedes pending transition", change);
        }

        self.set_transport(&mut inner, TransportState::Loading);
        self.schedule(&mut inner, Transition::ChangeTrack(change));
        Ok(())
    }

    /// Set the volume immediately.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::InvalidArgument`] if `volume` is outside `0.0..=1.0`,
    /// leaving the session untouched.
    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        if !volume.is_finite() || !(0.0..=1.0).contains(&volume) {
            return Err(PlayerError::invalid_argument(format!(
                "volume {volume} outside 0.0..=1.0"
            )));
        }

        let mut inner = self.inner.write().await;
        inner.ensure_open()?;

        inner.session.set_volume(volume);
        if let Err(e) = inner.output.set_volume(volume).await {
            self.report_output_error("set volume", &e);
        }
        self.emit(PlayerEvent::VolumeChanged { volume });
        Ok(())
    }

    /// Flip shuffle. Returns the new value.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::SessionClosed`] after shutdown.
    pub async fn toggle_shuffle(&self) -> Result<bool> {
        let mut inner = self.inner.write().await;
        inner.ensure_open()?;

        let enabled = !inner.session.shuffle();
        inner.session.set_shuffle(enabled);
        info!("Shuffle {}", if enabled { "on" } else { "off" });
        self.emit(PlayerEvent::ShuffleChanged { enabled });
        Ok(enabled)
    }

    /// Flip repeat (loop the current track). Returns the new value.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::SessionClosed`] after shutdown.
    pub async fn toggle_repeat(&self) -> Result<bool> {
        let mut inner = self.inner.write().await;
        inner.ensure_open()?;

        let enabled = !inner.session.repeat();
        inner.session.set_repeat(enabled);
        if let Err(e) = inner.output.set_loop(enabled).await {
            self.report_output_error("set loop", &e);
        }
        info!("Repeat {}", if enabled { "on" } else { "off" });
        self.emit(PlayerEvent::RepeatChanged { enabled });
        Ok(enabled)
    }

    /// Move the playhead within the current track.
    ///
    /// Positions past a known track length are clamped to it.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::SessionClosed`] after shutdown.
    pub async fn seek(&self, position: Duration) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.ensure_open()?;

        let track = self.playlist.track(inner.session.track_index());
        let position = track.duration().map_or(position, |d| position.min(d));

        if let Err(e) = inner.output.seek(position).await {
            self.report_output_error("seek", &e);
        }
        self.apply_position(&mut inner, position);
        Ok(())
    }

    /// [`seek`](Self::seek) with a position in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::InvalidArgument`] for negative or non-finite input.
    pub async fn seek_secs(&self, position_secs: f64) -> Result<()> {
        let position = crate::time::duration_from_secs(position_secs).ok_or_else(|| {
            PlayerError::invalid_argument(format!("seek position {position_secs} is not a valid time"))
        })?;
        self.seek(position).await
    }

    /// Stop playback and rewind, cancelling any pending transition.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::SessionClosed`] after shutdown.
    pub async fn stop(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.ensure_open()?;

        if inner.sequencer.cancel_pending() {
            debug!("Stop cancelled pending transition");
        }
        if let Err(e) = inner.output.pause().await {
            self.report_output_error("pause", &e);
        }
        if let Err(e) = inner.output.seek(Duration::ZERO).await {
            self.report_output_error("seek", &e);
        }
        self.apply_position(&mut inner, Duration::ZERO);
        self.set_transport(&mut inner, TransportState::Stopped);
        Ok(())
    }

    /// Position notification from the audio output
    pub async fn on_position_update(&self, position: Duration) {
        let mut inner = self.inner.write().await;
        if inner.closed {
            return;
        }
        self.apply_position(&mut inner, position);
    }

    /// Forward the output's position notifications into the session until shutdown
    #[must_use]
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let engine = Arc::clone(self);
        self.runtime.spawn(async move {
            engine.run_position_pump().await;
        })
    }

    async fn run_position_pump(&self) {
        let mut rx = {
            let inner = self.inner.read().await;
            info!("Listening for position updates from {} output", inner.output.name());
            inner.output.position_updates()
        };

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!("Position pump shutting down");
                    break;
                }
                update = rx.recv() => {
                    match update {
                        Ok(position) => self.on_position_update(position).await,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            debug!("Missed {} position updates", n);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            info!("Position channel closed");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Cancel pending transitions, stop the pump and release the audio output.
    ///
    /// Later commands fail with [`PlayerError::SessionClosed`]. Calling this twice is harmless.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.write().await;
        if inner.closed {
            return;
        }
        inner.closed = true;
        inner.sequencer.shutdown();
        self.cancel_token.cancel();

        if let Err(e) = inner.output.release().await {
            error!("Failed to release audio output: {}", e);
        }
        info!("Player session shut down");
    }

    fn schedule(self: &Arc<Self>, inner: &mut EngineInner, transition: Transition) {
        let engine = Arc::downgrade(self);
        inner
            .sequencer
            .schedule_after(self.transition_delay, move |ticket| async move {
                // A dropped engine means the session is gone; nothing to do
                if let Some(engine) = engine.upgrade() {
                    engine.complete_transition(ticket, transition).await;
                }
            });
    }

    async fn complete_transition(&self, ticket: Ticket, transition: Transition) {
        let mut inner = self.inner.write().await;
        if inner.closed || !inner.sequencer.complete(ticket) {
            debug!("Discarding stale transition {:?}", transition);
            return;
        }

        match transition {
            Transition::Resolve(TransportState::Playing) => {
                self.start_output(&mut inner).await;
            }
            Transition::Resolve(target) => {
                if let Err(e) = inner.output.pause().await {
                    self.report_output_error("pause", &e);
                }
                self.set_transport(&mut inner, target);
            }
            Transition::ChangeTrack(change) => {
                let index = match change {
                    TrackChange::Skip(direction) => self.next_index(&inner.session, direction),
                    TrackChange::Select(index) => index,
                };
                self.change_track(&mut inner, index).await;
                self.start_output(&mut inner).await;
            }
        }
    }

    fn next_index(&self, session: &PlayerSession, direction: SkipDirection) -> usize {
        select_next_index(
            session.track_index(),
            self.playlist.len(),
            direction,
            session.shuffle(),
            &mut rand::thread_rng(),
        )
    }

    async fn change_track(&self, inner: &mut EngineInner, index: usize) {
        let track = self.playlist.track(index);
        inner.session.change_track(index, track.lyrics());

        if let Err(e) = inner.output.load(&track.source).await {
            self.report_output_error("load", &e);
        }

        info!(
            "Track changed: {} - {} ({}/{})",
            track.artist,
            track.title,
            index + 1,
            self.playlist.len()
        );
        self.emit(PlayerEvent::TrackChanged {
            index,
            track_id: track.id.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
        });
        self.emit(PlayerEvent::PositionChanged {
            position: Duration::ZERO,
        });
        self.emit(PlayerEvent::ActiveLyricChanged {
            index: inner.session.active_lyric(),
            text: lyric_text(track, inner.session.active_lyric()),
        });
    }

    /// Issue `play` and settle the transport on the outcome
    async fn start_output(&self, inner: &mut EngineInner) {
        match inner.output.play().await {
            Ok(()) => self.set_transport(inner, TransportState::Playing),
            Err(PlayerError::PlaybackDenied { reason }) => {
                warn!("Playback denied by {} output: {}", inner.output.name(), reason);
                self.set_transport(inner, TransportState::Paused);
                self.emit(PlayerEvent::PlaybackDenied { reason });
            }
            Err(e) => {
                self.report_output_error("play", &e);
                self.set_transport(inner, TransportState::Paused);
            }
        }
    }

    fn apply_position(&self, inner: &mut EngineInner, position: Duration) {
        let track = self.playlist.track(inner.session.track_index());
        let lyric_changed = inner.session.update_position(position, track.lyrics());

        debug!("Position {:?}", position);
        self.emit(PlayerEvent::PositionChanged { position });

        if lyric_changed {
            let index = inner.session.active_lyric();
            self.emit(PlayerEvent::ActiveLyricChanged {
                index,
                text: lyric_text(track, index),
            });
        }
    }

    fn set_transport(&self, inner: &mut EngineInner, state: TransportState) {
        let previous = inner.session.transport();
        inner.session.set_transport(state);
        if previous != state {
            info!("Transport: {} -> {}", previous, state);
        }
        self.emit(PlayerEvent::TransportChanged { state });
    }

    fn report_output_error(&self, action: &str, e: &PlayerError) {
        error!("Audio output failed to {}: {}", action, e);
        self.emit(PlayerEvent::Error {
            message: format!("failed to {action}: {e}"),
        });
    }

    fn emit(&self, event: PlayerEvent) {
        // No subscribers is not an error
        let _ = self.event_tx.send(event);
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        let inner = self.inner.get_mut();
        inner.sequencer.shutdown();
        if !inner.closed {
            warn!("Player session dropped without shutdown; audio output was not released");
        }
    }
}

fn lyric_text(track: &Track, index: Option<usize>) -> Option<String> {
    index
        .and_then(|i| track.lyrics().get(i))
        .map(|line| line.text.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lrc::LrcLine;
    use crate::playlist::TrackSource;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    const DELAY: Duration = Duration::from_millis(500);

    #[derive(Debug, Clone, PartialEq)]
    enum Directive {
        Load(String),
        Play,
        Pause,
        Seek(Duration),
        Volume(f32),
        Loop(bool),
        Release,
    }

    /// Output double that records directives and can refuse to play
    struct RecordingOutput {
        log: Arc<StdMutex<Vec<Directive>>>,
        denied_plays: u32,
        position_tx: broadcast::Sender<Duration>,
    }

    impl RecordingOutput {
        fn new() -> (Self, Arc<StdMutex<Vec<Directive>>>, broadcast::Sender<Duration>) {
            let log = Arc::new(StdMutex::new(Vec::new()));
            let (position_tx, _) = broadcast::channel(16);
            let output = Self {
                log: Arc::clone(&log),
                denied_plays: 0,
                position_tx: position_tx.clone(),
            };
            (output, log, position_tx)
        }

        fn record(&self, directive: Directive) {
            self.log.lock().unwrap().push(directive);
        }
    }

    #[async_trait]
    impl AudioOutput for RecordingOutput {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn load(&mut self, source: &TrackSource) -> Result<()> {
            self.record(Directive::Load(source.locator.clone()));
            Ok(())
        }

        async fn play(&mut self) -> Result<()> {
            if self.denied_plays > 0 {
                self.denied_plays -= 1;
                return Err(PlayerError::PlaybackDenied {
                    reason: "no user gesture".into(),
                });
            }
            self.record(Directive::Play);
            Ok(())
        }

        async fn pause(&mut self) -> Result<()> {
            self.record(Directive::Pause);
            Ok(())
        }

        async fn seek(&mut self, position: Duration) -> Result<()> {
            self.record(Directive::Seek(position));
            Ok(())
        }

        async fn set_volume(&mut self, volume: f32) -> Result<()> {
            self.record(Directive::Volume(volume));
            Ok(())
        }

        async fn set_loop(&mut self, enabled: bool) -> Result<()> {
            self.record(Directive::Loop(enabled));
            Ok(())
        }

        fn position_updates(&self) -> broadcast::Receiver<Duration> {
            self.position_tx.subscribe()
        }

        async fn release(&mut self) -> Result<()> {
            self.record(Directive::Release);
            Ok(())
        }
    }

    fn track(id: &str, secs: u64) -> Track {
        Track::new(
            id,
            format!("Song {id}"),
            "Artist",
            TrackSource::new(format!("{id}.mp3")).with_duration(Duration::from_secs(secs)),
            vec![
                LrcLine::new(Duration::from_secs(0), format!("{id} one")),
                LrcLine::new(Duration::from_secs(5), format!("{id} two")),
                LrcLine::new(Duration::from_secs(10), format!("{id} three")),
            ],
        )
    }

    fn playlist(n: usize) -> Playlist {
        Playlist::new((0..n).map(|i| track(&format!("t{i}"), 180)).collect()).unwrap()
    }

    async fn engine_with(
        n: usize,
        denied_plays: u32,
    ) -> (Arc<PlaybackEngine>, Arc<StdMutex<Vec<Directive>>>, broadcast::Sender<Duration>) {
        let (mut output, log, tx) = RecordingOutput::new();
        output.denied_plays = denied_plays;
        let engine = PlaybackEngine::new(playlist(n), Box::new(output), &PlayerConfig::default())
            .await
            .unwrap();
        (engine, log, tx)
    }

    async fn settle() {
        tokio::time::sleep(DELAY + Duration::from_millis(100)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_session() {
        let (engine, log, _) = engine_with(2, 0).await;
        let snap = engine.snapshot().await;

        assert_eq!(snap.transport, TransportState::Paused);
        assert_eq!(snap.track_index, 0);
        assert_eq!(snap.position, Duration::ZERO);
        assert!((snap.volume - 0.7).abs() < f32::EPSILON);
        assert_eq!(snap.active_lyric, Some(0));
        assert_eq!(snap.active_lyric_text.as_deref(), Some("t0 one"));

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                Directive::Load("t0.mp3".into()),
                Directive::Volume(0.7),
                Directive::Loop(false)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_goes_through_loading() {
        let (engine, log, _) = engine_with(1, 0).await;

        engine.toggle_play_pause().await.unwrap();
        assert_eq!(engine.transport().await, TransportState::Loading);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(engine.transport().await, TransportState::Loading);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(engine.transport().await, TransportState::Playing);
        assert_eq!(log.lock().unwrap().last(), Some(&Directive::Play));

        engine.toggle_play_pause().await.unwrap();
        settle().await;
        assert_eq!(engine.transport().await, TransportState::Paused);
        assert_eq!(log.lock().unwrap().last(), Some(&Directive::Pause));
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_toggle_is_dropped() {
        let (engine, log, _) = engine_with(1, 0).await;

        engine.toggle_play_pause().await.unwrap();
        engine.toggle_play_pause().await.unwrap();
        assert_eq!(engine.transport().await, TransportState::Loading);

        settle().await;
        assert_eq!(engine.transport().await, TransportState::Playing);
        let plays = log.lock().unwrap().iter().filter(|d| **d == Directive::Play).count();
        assert_eq!(plays, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_next_resets_and_plays() {
        let (engine, log, _) = engine_with(2, 0).await;
        engine.on_position_update(Duration::from_secs(12)).await;
        assert_eq!(engine.snapshot().await.active_lyric, Some(2));

        engine.skip(SkipDirection::Next).await.unwrap();
        assert_eq!(engine.transport().await, TransportState::Loading);
        settle().await;

        let snap = engine.snapshot().await;
        assert_eq!(snap.track_index, 1);
        assert_eq!(snap.position, Duration::ZERO);
        assert_eq!(snap.transport, TransportState::Playing);
        assert_eq!(snap.active_lyric_text.as_deref(), Some("t1 one"));

        let log = log.lock().unwrap();
        let tail = &log[log.len() - 2..];
        assert_eq!(tail, [Directive::Load("t1.mp3".into()), Directive::Play]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_while_playing_keeps_playing() {
        let (engine, log, _) = engine_with(3, 0).await;
        engine.toggle_play_pause().await.unwrap();
        settle().await;
        assert_eq!(engine.transport().await, TransportState::Playing);
        engine.on_position_update(Duration::from_secs(7)).await;

        engine.skip(SkipDirection::Next).await.unwrap();
        assert_eq!(engine.transport().await, TransportState::Loading);
        settle().await;

        let snap = engine.snapshot().await;
        assert_eq!(snap.track_index, 1);
        assert_eq!(snap.position, Duration::ZERO);
        assert_eq!(snap.transport, TransportState::Playing);

        let log = log.lock().unwrap();
        let tail = &log[log.len() - 2..];
        assert_eq!(tail, [Directive::Load("t1.mp3".into()), Directive::Play]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_round_trip() {
        for n in 1..5 {
            let (engine, _, _) = engine_with(n, 0).await;
            engine.skip(SkipDirection::Next).await.unwrap();
            settle().await;
            engine.skip(SkipDirection::Previous).await.unwrap();
            settle().await;
            assert_eq!(engine.snapshot().await.track_index, 0, "playlist of {n}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_supersedes_pending_toggle() {
        let (engine, log, _) = engine_with(3, 0).await;

        engine.toggle_play_pause().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        engine.skip(SkipDirection::Next).await.unwrap();
        engine.skip(SkipDirection::Next).await.unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        let snap = engine.snapshot().await;
        // Only the last skip resolves
        assert_eq!(snap.track_index, 1);
        assert_eq!(snap.transport, TransportState::Playing);
        let plays = log.lock().unwrap().iter().filter(|d| **d == Directive::Play).count();
        assert_eq!(plays, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_track() {
        let (engine, _, _) = engine_with(3, 0).await;

        let err = engine.select_track(3).await.unwrap_err();
        assert!(matches!(err, PlayerError::InvalidArgument { .. }));
        assert_eq!(engine.transport().await, TransportState::Paused);

        engine.select_track(2).await.unwrap();
        settle().await;
        let snap = engine.snapshot().await;
        assert_eq!(snap.track_index, 2);
        assert_eq!(snap.transport, TransportState::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shuffle_skip_stays_in_playlist() {
        let (engine, _, _) = engine_with(4, 0).await;
        assert!(engine.toggle_shuffle().await.unwrap());

        for _ in 0..10 {
            engine.skip(SkipDirection::Next).await.unwrap();
            settle().await;
            let snap = engine.snapshot().await;
            assert!(snap.track_index < 4);
            assert_eq!(snap.position, Duration::ZERO);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_volume_validation() {
        let (engine, log, _) = engine_with(1, 0).await;

        let err = engine.set_volume(1.5).await.unwrap_err();
        assert!(matches!(err, PlayerError::InvalidArgument { .. }));
        assert!(engine.set_volume(f32::NAN).await.is_err());
        assert!((engine.snapshot().await.volume - 0.7).abs() < f32::EPSILON);

        engine.set_volume(0.25).await.unwrap();
        assert!((engine.snapshot().await.volume - 0.25).abs() < f32::EPSILON);
        assert_eq!(log.lock().unwrap().last(), Some(&Directive::Volume(0.25)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_forwards_loop() {
        let (engine, log, _) = engine_with(1, 0).await;
        assert!(engine.toggle_repeat().await.unwrap());
        assert_eq!(log.lock().unwrap().last(), Some(&Directive::Loop(true)));
        assert!(!engine.toggle_repeat().await.unwrap());
        assert_eq!(log.lock().unwrap().last(), Some(&Directive::Loop(false)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shuffle_does_not_touch_output() {
        let (engine, log, _) = engine_with(2, 0).await;
        let before = log.lock().unwrap().len();
        engine.toggle_shuffle().await.unwrap();
        assert_eq!(log.lock().unwrap().len(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_playback_denied_recovers_to_paused() {
        let (engine, _, _) = engine_with(1, 1).await;
        let mut events = engine.subscribe();

        engine.toggle_play_pause().await.unwrap();
        settle().await;
        assert_eq!(engine.transport().await, TransportState::Paused);

        let mut denied = false;
        while let Ok(event) = events.try_recv() {
            denied |= matches!(event, PlayerEvent::PlaybackDenied { .. });
        }
        assert!(denied);

        // A later user toggle retries
        engine.toggle_play_pause().await.unwrap();
        settle().await;
        assert_eq!(engine.transport().await, TransportState::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_position_updates_drive_lyrics() {
        let (engine, _, _) = engine_with(1, 0).await;
        let mut events = engine.subscribe();

        engine.on_position_update(Duration::from_secs(3)).await;
        engine.on_position_update(Duration::from_secs(6)).await;

        let snap = engine.snapshot().await;
        assert_eq!(snap.position, Duration::from_secs(6));
        assert_eq!(snap.active_lyric, Some(1));

        let mut lyric_events = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let PlayerEvent::ActiveLyricChanged { index, .. } = event {
                lyric_events.push(index);
            }
        }
        assert_eq!(lyric_events, vec![Some(1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_position_pump() {
        let (engine, _, tx) = engine_with(1, 0).await;
        let pump = engine.start();
        tokio::time::sleep(Duration::from_millis(1)).await;

        tx.send(Duration::from_secs(11)).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(engine.snapshot().await.active_lyric, Some(2));

        engine.shutdown().await;
        pump.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_and_stop() {
        let (engine, log, _) = engine_with(1, 0).await;

        engine.seek(Duration::from_secs(7)).await.unwrap();
        assert_eq!(engine.snapshot().await.active_lyric, Some(1));

        engine.seek(Duration::from_secs(999)).await.unwrap();
        assert_eq!(engine.snapshot().await.position, Duration::from_secs(180));
        assert!(engine.seek_secs(-1.0).await.is_err());

        engine.toggle_play_pause().await.unwrap();
        engine.stop().await.unwrap();
        settle().await;

        let snap = engine.snapshot().await;
        assert_eq!(snap.transport, TransportState::Stopped);
        assert_eq!(snap.position, Duration::ZERO);
        assert!(!log.lock().unwrap().contains(&Directive::Play));

        engine.toggle_play_pause().await.unwrap();
        settle().await;
        assert_eq!(engine.transport().await, TransportState::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_and_releases() {
        let (engine, log, _) = engine_with(2, 0).await;

        engine.skip(SkipDirection::Next).await.unwrap();
        engine.shutdown().await;
        settle().await;

        let snap = engine.snapshot().await;
        assert_eq!(snap.track_index, 0);
        assert_eq!(log.lock().unwrap().last(), Some(&Directive::Release));
        assert!(matches!(
            engine.toggle_play_pause().await,
            Err(PlayerError::SessionClosed)
        ));
        assert!(matches!(engine.set_volume(0.5).await, Err(PlayerError::SessionClosed)));

        // Idempotent
        engine.shutdown().await;
        let releases = log.lock().unwrap().iter().filter(|d| **d == Directive::Release).count();
        assert_eq!(releases, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_always_valid_under_rapid_commands() {
        let (engine, _, _) = engine_with(3, 0).await;

        for step in 0..20 {
            match step % 3 {
                0 => engine.toggle_play_pause().await.unwrap(),
                1 => engine.skip(SkipDirection::Previous).await.unwrap(),
                _ => tokio::time::sleep(Duration::from_millis(300)).await,
            }
        }
        settle().await;

        let state = engine.transport().await;
        assert!(matches!(state, TransportState::Playing | TransportState::Paused));
    }

    #[test]
    fn test_empty_playlist_cannot_build_session() {
        assert!(matches!(Playlist::new(vec![]), Err(PlayerError::EmptyPlaylist)));
    }
}
