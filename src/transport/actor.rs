//! Single-task event loop around the transport controller
//!
//! User commands and engine events arrive on separate channels and are handled
//! one at a time, so a completion racing with `stop` is resolved by whichever
//! the loop sees first. A level tick refreshes the meter. Every change is
//! published on a watch channel.

use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::audio::engine::{EngineEvent, PlaybackEngine};
use crate::library::models::{Playlist, TrackId};
use crate::transport::controller::{TransportController, TransportError};
use crate::transport::state::{PlayerState, TransportSnapshot};

const COMMAND_QUEUE_DEPTH: usize = 32;

type Reply<T> = oneshot::Sender<T>;

#[derive(Debug)]
pub enum TransportCommand {
    Play { index: usize, reply: Reply<Result<(), TransportError>> },
    PlayTrack { id: TrackId, reply: Reply<Result<(), TransportError>> },
    TogglePlayPause { reply: Reply<PlayerState> },
    Stop { reply: Reply<()> },
    Next { reply: Reply<Result<Option<usize>, TransportError>> },
    Previous { reply: Reply<Result<Option<usize>, TransportError>> },
    Shuffle { reply: Reply<Result<Option<usize>, TransportError>> },
    ReplacePlaylist { tracks: Playlist, reply: Reply<()> },
    SetVolume { volume: f32, reply: Reply<()> },
    Playlist { reply: Reply<Playlist> },
    Shutdown,
}

/// Cloneable front door to a running transport actor
#[derive(Debug, Clone)]
pub struct TransportHandle {
    commands: mpsc::Sender<TransportCommand>,
    snapshots: watch::Receiver<TransportSnapshot>,
}

impl TransportHandle {
    /// Spawn the actor on the current tokio runtime
    pub fn spawn<E>(
        controller: TransportController<E>,
        events: mpsc::UnboundedReceiver<EngineEvent>,
        level_interval: Duration,
    ) -> (Self, JoinHandle<()>)
    where
        E: PlaybackEngine + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());

        let task = tokio::spawn(run_actor(controller, command_rx, events, snapshot_tx, level_interval));

        (
            Self {
                commands: command_tx,
                snapshots: snapshot_rx,
            },
            task,
        )
    }

    /// Receiver that yields every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<TransportSnapshot> {
        self.snapshots.clone()
    }

    /// Latest published state
    pub fn snapshot(&self) -> TransportSnapshot {
        self.snapshots.borrow().clone()
    }

    pub async fn play(&self, index: usize) -> Result<(), TransportError> {
        self.request(|reply| TransportCommand::Play { index, reply }).await?
    }

    pub async fn play_track(&self, id: TrackId) -> Result<(), TransportError> {
        self.request(|reply| TransportCommand::PlayTrack { id, reply }).await?
    }

    pub async fn toggle_play_pause(&self) -> Result<PlayerState, TransportError> {
        self.request(|reply| TransportCommand::TogglePlayPause { reply }).await
    }

    pub async fn stop(&self) -> Result<(), TransportError> {
        self.request(|reply| TransportCommand::Stop { reply }).await
    }

    pub async fn next(&self) -> Result<Option<usize>, TransportError> {
        self.request(|reply| TransportCommand::Next { reply }).await?
    }

    pub async fn previous(&self) -> Result<Option<usize>, TransportError> {
        self.request(|reply| TransportCommand::Previous { reply }).await?
    }

    pub async fn shuffle(&self) -> Result<Option<usize>, TransportError> {
        self.request(|reply| TransportCommand::Shuffle { reply }).await?
    }

    pub async fn replace_playlist(&self, tracks: Playlist) -> Result<(), TransportError> {
        self.request(|reply| TransportCommand::ReplacePlaylist { tracks, reply }).await
    }

    pub async fn set_volume(&self, volume: f32) -> Result<(), TransportError> {
        self.request(|reply| TransportCommand::SetVolume { volume, reply }).await
    }

    pub async fn playlist(&self) -> Result<Playlist, TransportError> {
        self.request(|reply| TransportCommand::Playlist { reply }).await
    }

    /// Ask the actor to stop playback and exit
    pub async fn shutdown(&self) {
        let _ = self.commands.send(TransportCommand::Shutdown).await;
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> TransportCommand,
    ) -> Result<T, TransportError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| TransportError::ActorClosed)?;
        response.await.map_err(|_| TransportError::ActorClosed)
    }
}

async fn run_actor<E: PlaybackEngine>(
    mut controller: TransportController<E>,
    mut commands: mpsc::Receiver<TransportCommand>,
    mut events: mpsc::UnboundedReceiver<EngineEvent>,
    snapshots: watch::Sender<TransportSnapshot>,
    level_interval: Duration,
) {
    tracing::info!(tracks = controller.playlist().len(), "Transport started");

    let mut ticker = tokio::time::interval(level_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(TransportCommand::Shutdown) | None => break,
                Some(command) => handle_command(&mut controller, command, &snapshots),
            },
            Some(event) = events.recv() => {
                tracing::debug!(?event, "Engine event");
                if let Err(e) = controller.handle_engine_event(event) {
                    tracing::warn!(error = %e, "Auto-advance failed");
                }
            }
            _ = ticker.tick() => {}
        }
        publish(&controller, &snapshots);
    }

    controller.stop();
    publish(&controller, &snapshots);
    tracing::info!("Transport stopped");
}

fn handle_command<E: PlaybackEngine>(
    controller: &mut TransportController<E>,
    command: TransportCommand,
    snapshots: &watch::Sender<TransportSnapshot>,
) {
    match command {
        TransportCommand::Play { index, reply } => {
            let result = controller.play(index);
            respond(controller, snapshots, reply, result);
        }
        TransportCommand::PlayTrack { id, reply } => {
            let result = controller.play_track(id);
            respond(controller, snapshots, reply, result);
        }
        TransportCommand::TogglePlayPause { reply } => {
            let state = controller.toggle_play_pause();
            respond(controller, snapshots, reply, state);
        }
        TransportCommand::Stop { reply } => {
            controller.stop();
            respond(controller, snapshots, reply, ());
        }
        TransportCommand::Next { reply } => {
            let result = controller.next();
            respond(controller, snapshots, reply, result);
        }
        TransportCommand::Previous { reply } => {
            let result = controller.previous();
            respond(controller, snapshots, reply, result);
        }
        TransportCommand::Shuffle { reply } => {
            let result = controller.shuffle();
            respond(controller, snapshots, reply, result);
        }
        TransportCommand::ReplacePlaylist { tracks, reply } => {
            controller.replace_playlist(tracks);
            respond(controller, snapshots, reply, ());
        }
        TransportCommand::SetVolume { volume, reply } => {
            controller.set_volume(volume);
            respond(controller, snapshots, reply, ());
        }
        TransportCommand::Playlist { reply } => {
            let tracks = controller.playlist().to_vec();
            respond(controller, snapshots, reply, tracks);
        }
        TransportCommand::Shutdown => {}
    }
}

/// Publish before replying so a caller reading the snapshot sees its own change
fn respond<E: PlaybackEngine, T>(
    controller: &TransportController<E>,
    snapshots: &watch::Sender<TransportSnapshot>,
    reply: Reply<T>,
    value: T,
) {
    publish(controller, snapshots);
    // A dropped receiver only means the caller stopped waiting
    let _ = reply.send(value);
}

fn publish<E: PlaybackEngine>(controller: &TransportController<E>, snapshots: &watch::Sender<TransportSnapshot>) {
    let next = controller.snapshot();
    snapshots.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}
