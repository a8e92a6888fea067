// Playback engine: one decode/output pipeline per session
//
// The transport controller talks to the engine through `PlaybackEngine` only.
// `LocalEngine` plays local files: each session runs on its own thread that
// owns the symphonia decoder and the cpal stream, so the device is released
// when that thread exits.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc::UnboundedSender;

use super::decoder::AudioDecoder;
use super::error::{PlaybackError, Result};
use super::output::{remix, AudioOutput, OutputMeter};
use super::resampler::StreamResampler;
use crate::library::models::Locator;

/// Identifies one live playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Asynchronous notifications from the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The session played to the end without being stopped
    Finished(SessionId),
    /// The session hit an unrecoverable error mid-stream
    Failed { session: SessionId, error: PlaybackError },
}

/// The audio collaborator driven by the transport controller.
///
/// A newly opened session is silent until `start`. Completion is reported
/// through the event channel handed to the engine at construction.
pub trait PlaybackEngine: Send {
    fn open(&mut self, locator: &Locator) -> Result<SessionId>;
    fn start(&mut self, session: SessionId) -> Result<()>;
    fn pause(&mut self, session: SessionId);
    fn resume(&mut self, session: SessionId);
    fn close(&mut self, session: SessionId);
    /// Instantaneous output amplitude, 0 for unknown sessions
    fn amplitude(&self, session: SessionId) -> f32;
    fn set_volume(&mut self, volume: f32);
}

struct SessionHandle {
    stop: Arc<AtomicBool>,
    meter: Arc<OutputMeter>,
    thread: Option<JoinHandle<()>>,
}

/// Engine that decodes local files and plays them on the default output device
pub struct LocalEngine {
    events: UnboundedSender<EngineEvent>,
    volume: Arc<Mutex<f32>>,
    next_id: u64,
    sessions: HashMap<SessionId, SessionHandle>,
}

impl LocalEngine {
    pub fn new(events: UnboundedSender<EngineEvent>, volume: f32) -> Self {
        Self {
            events,
            volume: Arc::new(Mutex::new(volume.clamp(0.0, 1.0))),
            next_id: 1,
            sessions: HashMap::new(),
        }
    }

    fn session(&self, id: SessionId) -> Result<&SessionHandle> {
        self.sessions.get(&id).ok_or(PlaybackError::UnknownSession(id.0))
    }
}

impl PlaybackEngine for LocalEngine {
    fn open(&mut self, locator: &Locator) -> Result<SessionId> {
        let id = SessionId(self.next_id);
        self.next_id += 1;

        let stop = Arc::new(AtomicBool::new(false));
        let meter = Arc::new(OutputMeter::default());
        // Sessions start paused; `start` lets the callback consume samples
        meter.set_paused(true);

        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let worker = SessionWorker {
            id,
            path: locator.as_path().to_path_buf(),
            stop: stop.clone(),
            meter: meter.clone(),
            volume: self.volume.clone(),
            events: self.events.clone(),
        };

        let thread = std::thread::Builder::new()
            .name(format!("playback-{}", id.0))
            .spawn(move || worker.run(ready_tx))
            .map_err(|e| PlaybackError::Output(format!("failed to spawn session thread: {}", e)))?;

        let opened = blocking_wait(|| ready_rx.recv().unwrap_or(Err(PlaybackError::SessionLost)));
        if let Err(e) = opened {
            if blocking_wait(|| thread.join()).is_err() {
                tracing::error!(session = %id, "Session thread panicked during open");
            }
            return Err(e);
        }

        tracing::info!(session = %id, locator = %locator, "Session opened");
        self.sessions.insert(id, SessionHandle { stop, meter, thread: Some(thread) });
        Ok(id)
    }

    fn start(&mut self, session: SessionId) -> Result<()> {
        self.session(session)?.meter.set_paused(false);
        Ok(())
    }

    fn pause(&mut self, session: SessionId) {
        if let Ok(handle) = self.session(session) {
            handle.meter.set_paused(true);
        }
    }

    fn resume(&mut self, session: SessionId) {
        if let Ok(handle) = self.session(session) {
            handle.meter.set_paused(false);
        }
    }

    fn close(&mut self, session: SessionId) {
        let Some(mut handle) = self.sessions.remove(&session) else {
            return;
        };
        handle.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = handle.thread.take() {
            if blocking_wait(|| thread.join()).is_err() {
                tracing::error!(session = %session, "Session thread panicked");
            }
        }
        tracing::info!(session = %session, "Session closed");
    }

    fn amplitude(&self, session: SessionId) -> f32 {
        self.session(session).map(|h| h.meter.amplitude()).unwrap_or(0.0)
    }

    fn set_volume(&mut self, volume: f32) {
        *self.volume.lock() = volume.clamp(0.0, 1.0);
    }
}

impl Drop for LocalEngine {
    fn drop(&mut self) {
        let ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        for id in ids {
            self.close(id);
        }
    }
}

/// Wait on a session thread. On a multi-thread runtime the worker is handed
/// off first so other tasks keep running; elsewhere this just calls `wait`.
fn blocking_wait<T>(wait: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(wait)
        }
        _ => wait(),
    }
}

enum SessionEnd {
    Finished,
    Stopped,
    Failed(PlaybackError),
}

/// Everything a session thread needs
struct SessionWorker {
    id: SessionId,
    path: PathBuf,
    stop: Arc<AtomicBool>,
    meter: Arc<OutputMeter>,
    volume: Arc<Mutex<f32>>,
    events: UnboundedSender<EngineEvent>,
}

impl SessionWorker {
    fn run(self, ready: mpsc::SyncSender<Result<()>>) {
        let opened = AudioDecoder::open(&self.path).and_then(|decoder| {
            let output = AudioOutput::new(self.meter.clone(), self.volume.clone())?;
            let resampler = StreamResampler::new(
                decoder.sample_rate(),
                output.sample_rate(),
                decoder.channels(),
            )?;
            Ok((decoder, output, resampler))
        });

        let (mut decoder, mut output, mut resampler) = match opened {
            Ok(parts) => {
                let _ = ready.send(Ok(()));
                parts
            }
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };

        let end = self.pump(&mut decoder, &mut output, &mut resampler);
        self.meter.set_paused(true);

        // A stopped session never reports completion
        let event = match end {
            SessionEnd::Stopped => None,
            SessionEnd::Finished => {
                tracing::debug!(session = %self.id, "Reached end of stream");
                Some(EngineEvent::Finished(self.id))
            }
            SessionEnd::Failed(error) => {
                tracing::error!(session = %self.id, error = %error, "Playback failed mid-stream");
                Some(EngineEvent::Failed { session: self.id, error })
            }
        };
        if let Some(event) = event {
            if self.events.send(event).is_err() {
                tracing::debug!(session = %self.id, "Event receiver gone");
            }
        }
    }

    fn pump(
        &self,
        decoder: &mut AudioDecoder,
        output: &mut AudioOutput,
        resampler: &mut StreamResampler,
    ) -> SessionEnd {
        let in_channels = decoder.channels();
        let out_channels = output.channels() as usize;

        loop {
            if self.stop.load(Ordering::SeqCst) {
                return SessionEnd::Stopped;
            }

            match decoder.decode_next() {
                Ok(Some(samples)) => {
                    let resampled = match resampler.process(&samples) {
                        Ok(s) => s,
                        Err(e) => return SessionEnd::Failed(e),
                    };
                    let mixed = remix(&resampled, in_channels, out_channels);
                    if !output.write_blocking(&mixed, &self.stop) {
                        return SessionEnd::Stopped;
                    }
                }
                Ok(None) => {
                    let tail = match resampler.flush() {
                        Ok(s) => s,
                        Err(e) => return SessionEnd::Failed(e),
                    };
                    let mixed = remix(&tail, in_channels, out_channels);
                    if !output.write_blocking(&mixed, &self.stop) || !output.drain(&self.stop) {
                        return SessionEnd::Stopped;
                    }
                    return SessionEnd::Finished;
                }
                Err(e) => return SessionEnd::Failed(e),
            }
        }
    }
}

#[cfg(test)]
pub mod fake {
    //! Scriptable engine for transport tests

    use super::*;
    use std::collections::HashSet;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Open(Locator),
        Start(SessionId),
        Pause(SessionId),
        Resume(SessionId),
        Close(SessionId),
    }

    #[derive(Debug, Default)]
    pub struct FakeState {
        pub calls: Vec<Call>,
        pub live: HashSet<SessionId>,
        pub bad_locators: HashSet<Locator>,
        pub bad_starts: HashSet<Locator>,
        failing_sessions: HashSet<SessionId>,
        pub amplitude: f32,
        pub volume: f32,
        next_id: u64,
    }

    /// Engine double. Clones share state so tests can inspect an engine moved into an actor.
    #[derive(Debug, Clone, Default)]
    pub struct FakeEngine {
        pub state: Arc<Mutex<FakeState>>,
    }

    impl FakeEngine {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reject(&self, locator: &Locator) {
            self.state.lock().bad_locators.insert(locator.clone());
        }

        /// Let `open` succeed for this locator but fail the following `start`
        pub fn reject_start(&self, locator: &Locator) {
            self.state.lock().bad_starts.insert(locator.clone());
        }

        pub fn live_sessions(&self) -> usize {
            self.state.lock().live.len()
        }

        pub fn set_amplitude(&self, value: f32) {
            self.state.lock().amplitude = value;
        }

        pub fn calls(&self) -> Vec<Call> {
            self.state.lock().calls.clone()
        }

        pub fn opened(&self) -> Vec<Locator> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Open(l) => Some(l),
                    _ => None,
                })
                .collect()
        }
    }

    impl PlaybackEngine for FakeEngine {
        fn open(&mut self, locator: &Locator) -> Result<SessionId> {
            let mut state = self.state.lock();
            state.calls.push(Call::Open(locator.clone()));
            assert!(state.live.is_empty(), "opened a session while another was live");
            if state.bad_locators.contains(locator) {
                return Err(PlaybackError::Open(locator.to_string()));
            }
            state.next_id += 1;
            let id = SessionId(state.next_id);
            state.live.insert(id);
            if state.bad_starts.contains(locator) {
                state.failing_sessions.insert(id);
            }
            Ok(id)
        }

        fn start(&mut self, session: SessionId) -> Result<()> {
            let mut state = self.state.lock();
            state.calls.push(Call::Start(session));
            if !state.live.contains(&session) {
                Err(PlaybackError::UnknownSession(session.0))
            } else if state.failing_sessions.contains(&session) {
                Err(PlaybackError::NoOutputDevice)
            } else {
                Ok(())
            }
        }

        fn pause(&mut self, session: SessionId) {
            self.state.lock().calls.push(Call::Pause(session));
        }

        fn resume(&mut self, session: SessionId) {
            self.state.lock().calls.push(Call::Resume(session));
        }

        fn close(&mut self, session: SessionId) {
            let mut state = self.state.lock();
            state.calls.push(Call::Close(session));
            state.live.remove(&session);
        }

        fn amplitude(&self, session: SessionId) -> f32 {
            let state = self.state.lock();
            if state.live.contains(&session) {
                state.amplitude
            } else {
                0.0
            }
        }

        fn set_volume(&mut self, volume: f32) {
            self.state.lock().volume = volume;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file_leaves_no_session() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut engine = LocalEngine::new(tx, 1.0);
        let dir = tempfile::tempdir().unwrap();

        let result = engine.open(&Locator::new(dir.path().join("missing.mp3")));
        assert!(matches!(result, Err(PlaybackError::Open(_))));
        assert!(engine.sessions.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_open_on_multi_thread_runtime_keeps_ticking() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut engine = LocalEngine::new(tx, 1.0);
        let dir = tempfile::tempdir().unwrap();
        let ticker = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        });

        let result = engine.open(&Locator::new(dir.path().join("missing.flac")));
        assert!(matches!(result, Err(PlaybackError::Open(_))));
        engine.close(SessionId(7));
        ticker.await.unwrap();
    }

    #[tokio::test]
    async fn test_open_on_current_thread_runtime() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut engine = LocalEngine::new(tx, 1.0);
        let dir = tempfile::tempdir().unwrap();

        let result = engine.open(&Locator::new(dir.path().join("missing.flac")));
        assert!(matches!(result, Err(PlaybackError::Open(_))));
    }

    #[test]
    fn test_unknown_session_is_silent() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut engine = LocalEngine::new(tx, 1.0);
        assert_eq!(engine.amplitude(SessionId(42)), 0.0);
        assert!(engine.start(SessionId(42)).is_err());
        engine.pause(SessionId(42));
        engine.close(SessionId(42));
    }

    #[test]
    fn test_volume_is_clamped() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut engine = LocalEngine::new(tx, 3.0);
        assert_eq!(*engine.volume.lock(), 1.0);
        engine.set_volume(-1.0);
        assert_eq!(*engine.volume.lock(), 0.0);
    }
}
