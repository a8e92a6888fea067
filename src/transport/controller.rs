// Transport controller: owns the playlist, the cursor and at most one session
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::audio::engine::{EngineEvent, PlaybackEngine, SessionId};
use crate::audio::error::PlaybackError;
use crate::audio::level;
use crate::library::models::{Locator, Playlist, Track, TrackId};
use crate::queue::{PlayQueue, Step};
use crate::transport::state::{PlayerState, TransportSnapshot};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no track at position {0}")]
    TrackNotFound(usize),
    #[error("track {0} is not in the playlist")]
    UnknownTrack(TrackId),
    #[error("could not open {locator}: {source}")]
    SessionOpenFailed {
        locator: Locator,
        #[source]
        source: PlaybackError,
    },
    #[error("transport has shut down")]
    ActorClosed,
}

pub struct TransportController<E: PlaybackEngine> {
    engine: E,
    queue: PlayQueue,
    session: Option<SessionId>,
    paused: bool,
    auto_advance: bool,
    rng: StdRng,
}

impl<E: PlaybackEngine> TransportController<E> {
    pub fn new(engine: E, playlist: Playlist) -> Self {
        Self {
            engine,
            queue: PlayQueue::new(playlist),
            session: None,
            paused: false,
            auto_advance: true,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic shuffles, for tests and reproducible sessions
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Whether natural completion moves on to the next track
    pub fn with_auto_advance(mut self, auto_advance: bool) -> Self {
        self.auto_advance = auto_advance;
        self
    }

    pub fn state(&self) -> PlayerState {
        match (self.session, self.paused) {
            (None, _) => PlayerState::Idle,
            (Some(_), false) => PlayerState::Playing,
            (Some(_), true) => PlayerState::Paused,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlayerState::Playing
    }

    pub fn current_index(&self) -> Option<usize> {
        self.queue.cursor()
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.queue.current()
    }

    pub fn playlist(&self) -> &[Track] {
        self.queue.tracks()
    }

    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    /// Play the track at `index`. On failure the controller is left idle and the cursor is unchanged.
    pub fn play(&mut self, index: usize) -> Result<(), TransportError> {
        if self.queue.get(index).is_none() {
            return Err(TransportError::TrackNotFound(index));
        }
        self.start_at(index)?;
        self.queue.set_cursor(index);
        Ok(())
    }

    /// Play a track by identifier
    pub fn play_track(&mut self, id: TrackId) -> Result<(), TransportError> {
        let index = self.queue.position_of(id).ok_or(TransportError::UnknownTrack(id))?;
        self.play(index)
    }

    pub fn toggle_play_pause(&mut self) -> PlayerState {
        match (self.session, self.paused) {
            (Some(session), false) => {
                self.engine.pause(session);
                self.paused = true;
                tracing::debug!(%session, "Paused");
            }
            (Some(session), true) => {
                self.engine.resume(session);
                self.paused = false;
                tracing::debug!(%session, "Resumed");
            }
            (None, _) => {}
        }
        self.state()
    }

    pub fn stop(&mut self) {
        if self.session.is_some() {
            tracing::debug!("Stopped");
        }
        self.teardown();
    }

    /// Advance with wrap-around. `Ok(None)` when the playlist is empty.
    pub fn next(&mut self) -> Result<Option<usize>, TransportError> {
        self.navigate(Step::Forward)
    }

    /// Step back with wrap-around. `Ok(None)` when the playlist is empty.
    pub fn previous(&mut self) -> Result<Option<usize>, TransportError> {
        self.navigate(Step::Backward)
    }

    /// Reorder the playlist randomly and start again from its new first track
    pub fn shuffle(&mut self) -> Result<Option<usize>, TransportError> {
        let Some(index) = self.queue.shuffle(&mut self.rng) else {
            return Ok(None);
        };
        tracing::debug!(tracks = self.queue.len(), "Shuffled playlist");
        self.start_at(index)?;
        Ok(Some(index))
    }

    /// The live session played to its end. Completions for sessions that are
    /// no longer live are ignored.
    pub fn on_natural_completion(&mut self, session: SessionId) -> Result<Option<usize>, TransportError> {
        if self.session != Some(session) {
            tracing::debug!(%session, "Ignoring completion of a closed session");
            return Ok(None);
        }
        self.teardown();
        if !self.auto_advance {
            return Ok(None);
        }
        self.next()
    }

    /// The live session failed mid-stream; release it and go idle
    pub fn on_session_failed(&mut self, session: SessionId, error: &PlaybackError) {
        if self.session != Some(session) {
            return;
        }
        tracing::warn!(%session, %error, "Playback stopped by engine error");
        self.teardown();
    }

    /// Route an engine notification
    pub fn handle_engine_event(&mut self, event: EngineEvent) -> Result<Option<usize>, TransportError> {
        match event {
            EngineEvent::Finished(session) => self.on_natural_completion(session),
            EngineEvent::Failed { session, error } => {
                self.on_session_failed(session, &error);
                Ok(None)
            }
        }
    }

    /// Normalised output level in [0, 1]; zero without a session
    pub fn output_level(&self) -> f32 {
        self.session
            .map(|s| level::normalize(self.engine.amplitude(s)))
            .unwrap_or(0.0)
    }

    /// Stop playback and install a different playlist
    pub fn replace_playlist(&mut self, tracks: Playlist) {
        self.teardown();
        tracing::debug!(tracks = tracks.len(), "Playlist replaced");
        self.queue.replace(tracks);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.engine.set_volume(volume);
    }

    pub fn snapshot(&self) -> TransportSnapshot {
        TransportSnapshot {
            state: self.state(),
            current_index: self.queue.cursor(),
            current_track: self.queue.current().cloned(),
            output_level: self.output_level(),
            playlist_len: self.queue.len(),
        }
    }

    fn navigate(&mut self, step: Step) -> Result<Option<usize>, TransportError> {
        // The cursor moves even if the open fails, so repeated steps walk past a bad track
        let Some(index) = self.queue.step(step) else {
            return Ok(None);
        };
        self.start_at(index)?;
        Ok(Some(index))
    }

    /// Replace the session with one for the track at `index`
    fn start_at(&mut self, index: usize) -> Result<(), TransportError> {
        self.teardown();

        let Some(track) = self.queue.get(index) else {
            return Err(TransportError::TrackNotFound(index));
        };
        let locator = track.locator.clone();

        let session = match self.engine.open(&locator) {
            Ok(session) => session,
            Err(source) => {
                tracing::warn!(%locator, error = %source, "Failed to open track");
                return Err(TransportError::SessionOpenFailed { locator, source });
            }
        };
        if let Err(source) = self.engine.start(session) {
            tracing::warn!(%locator, error = %source, "Failed to start track");
            self.engine.close(session);
            return Err(TransportError::SessionOpenFailed { locator, source });
        }

        tracing::info!(index, %session, title = track.display_title(), "Now playing");
        self.session = Some(session);
        self.paused = false;
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            self.engine.close(session);
        }
        self.paused = false;
    }
}

impl<E: PlaybackEngine> Drop for TransportController<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}
