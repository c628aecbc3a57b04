//! Audio output collaborator.

use crate::error::{PlayerError, Result};
use crate::playlist::TrackSource;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Capacity of the position notification channel
const POSITION_CHANNEL_CAPACITY: usize = 64;

/// Trait for the component that actually produces sound.
///
/// The [`PlaybackEngine`](crate::PlaybackEngine) exclusively owns one output per
/// session and is the only caller of these methods. Implementations report the
/// playback position through [`position_updates`](AudioOutput::position_updates)
/// at their own cadence.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Returns a human-readable name for this output.
    fn name(&self) -> &'static str;

    /// Replace the loaded source. Resets the output's position to zero.
    async fn load(&mut self, source: &TrackSource) -> Result<()>;

    /// Start or resume playback.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::PlaybackDenied`] when the platform refuses to
    /// start playback (for example before any user interaction).
    async fn play(&mut self) -> Result<()>;

    async fn pause(&mut self) -> Result<()>;

    async fn seek(&mut self, position: Duration) -> Result<()>;

    /// Set the output volume, `0.0..=1.0`.
    async fn set_volume(&mut self, volume: f32) -> Result<()>;

    /// Loop the current track instead of stopping at its end.
    async fn set_loop(&mut self, enabled: bool) -> Result<()>;

    /// Subscribe to position notifications.
    fn position_updates(&self) -> broadcast::Receiver<Duration>;

    /// Stop playback and release the underlying device. Called once at teardown.
    async fn release(&mut self) -> Result<()>;
}

/// Playback clock state shared with the ticker task
#[derive(Debug)]
struct ClockState {
    source: Option<TrackSource>,
    playing: bool,
    looping: bool,
    /// Position at `anchor_instant`
    anchor_position: Duration,
    anchor_instant: Instant,
    denied_plays_remaining: u32,
}

impl ClockState {
    fn position(&self) -> Duration {
        if self.playing {
            self.anchor_position + self.anchor_instant.elapsed()
        } else {
            self.anchor_position
        }
    }

    fn rebase(&mut self, position: Duration) {
        self.anchor_position = position;
        self.anchor_instant = Instant::now();
    }

    /// Advance the clock, handling the end of the track. Returns the position to report.
    fn tick(&mut self) -> Duration {
        let position = self.position();
        let Some(duration) = self.source.as_ref().and_then(|s| s.duration) else {
            return position;
        };

        if position < duration || duration.is_zero() {
            return position;
        }

        if self.looping {
            let wrapped = Duration::from_nanos(
                u64::try_from(position.as_nanos() % duration.as_nanos()).unwrap_or(0),
            );
            self.rebase(wrapped);
            wrapped
        } else {
            self.playing = false;
            self.rebase(duration);
            duration
        }
    }
}

/// Clock-driven output that plays silence.
///
/// Advances a monotonic clock while playing and reports the position every
/// `interval`. Stops at the end of the track unless looping, in which case it
/// wraps to zero. Uses `tokio::time`, so tests can drive it with a paused clock.
pub struct SimulatedOutput {
    state: Arc<Mutex<ClockState>>,
    position_tx: broadcast::Sender<Duration>,
    interval: Duration,
    cancel_token: CancellationToken,
    ticker: Option<JoinHandle<()>>,
}

impl SimulatedOutput {
    /// Create an output reporting its position every `interval`
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        let (position_tx, _) = broadcast::channel(POSITION_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(ClockState {
                source: None,
                playing: false,
                looping: false,
                anchor_position: Duration::ZERO,
                anchor_instant: Instant::now(),
                denied_plays_remaining: 0,
            })),
            position_tx,
            interval,
            cancel_token: CancellationToken::new(),
            ticker: None,
        }
    }

    /// Refuse the first `count` play requests, like a browser blocking autoplay
    #[must_use]
    pub fn with_denied_plays(self, count: u32) -> Self {
        if let Ok(mut state) = self.state.try_lock() {
            state.denied_plays_remaining = count;
        }
        self
    }

    /// Current clock position
    pub async fn position(&self) -> Duration {
        self.state.lock().await.position()
    }

    pub async fn is_playing(&self) -> bool {
        self.state.lock().await.playing
    }

    fn ensure_ticker(&mut self) {
        if self.ticker.is_some() {
            return;
        }

        let state = Arc::clone(&self.state);
        let tx = self.position_tx.clone();
        let cancel_token = self.cancel_token.clone();
        let period = self.interval;

        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = cancel_token.cancelled() => {
                        debug!("Simulated output ticker stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        let position = {
                            let mut state = state.lock().await;
                            if !state.playing {
                                continue;
                            }
                            state.tick()
                        };
                        // No receivers is fine; nobody is listening yet
                        let _ = tx.send(position);
                    }
                }
            }
        }));
    }
}

#[async_trait]
impl AudioOutput for SimulatedOutput {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn load(&mut self, source: &TrackSource) -> Result<()> {
        let mut state = self.state.lock().await;
        debug!("Loading {}", source.locator);
        state.source = Some(source.clone());
        state.rebase(Duration::ZERO);
        Ok(())
    }

    async fn play(&mut self) -> Result<()> {
        if self.cancel_token.is_cancelled() {
            return Err(PlayerError::Output {
                output: self.name().into(),
                reason: "output has been released".into(),
            });
        }

        {
            let mut state = self.state.lock().await;
            if state.denied_plays_remaining > 0 {
                state.denied_plays_remaining -= 1;
                return Err(PlayerError::PlaybackDenied {
                    reason: "playback requires a user gesture".into(),
                });
            }
            if !state.playing {
                let position = state.position();
                state.playing = true;
                state.rebase(position);
            }
        }

        self.ensure_ticker();
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        let mut state = self.state.lock().await;
        let position = state.position();
        state.playing = false;
        state.rebase(position);
        Ok(())
    }

    async fn seek(&mut self, position: Duration) -> Result<()> {
        let mut state = self.state.lock().await;
        state.rebase(position);
        Ok(())
    }

    async fn set_volume(&mut self, volume: f32) -> Result<()> {
        debug!("Simulated output volume set to {volume:.2}");
        Ok(())
    }

    async fn set_loop(&mut self, enabled: bool) -> Result<()> {
        self.state.lock().await.looping = enabled;
        Ok(())
    }

    fn position_updates(&self) -> broadcast::Receiver<Duration> {
        self.position_tx.subscribe()
    }

    async fn release(&mut self) -> Result<()> {
        self.cancel_token.cancel();
        if let Some(ticker) = self.ticker.take() {
            let _ = ticker.await;
        }
        let mut state = self.state.lock().await;
        state.playing = false;
        state.source = None;
        info!("Simulated output released");
        Ok(())
    }
}
