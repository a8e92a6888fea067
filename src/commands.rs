// Console command handlers
use std::fmt::Write as _;
use std::path::PathBuf;
use thiserror::Error;

use crate::library::import::{import_file, FileKind, ImportOutcome};
use crate::library::models::Track;
use crate::state::AppState;
use crate::transport::{PlayerState, TransportError, TransportSnapshot};

pub const HELP_TEXT: &str = "\
Commands:
  list             show the playlist
  play <n>         play track n (1-based)
  toggle | pause   pause or resume
  stop             stop playback
  next | prev      skip forward or back
  shuffle          shuffle the playlist and play from the top
  level            show the output level
  volume <0-100>   set and remember the output volume
  open [path]      import a file to play or preview
  status           show what is playing
  help             show this text
  quit             exit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    List,
    /// Zero-based playlist position
    Play(usize),
    Toggle,
    Stop,
    Next,
    Previous,
    Shuffle,
    Level,
    /// Volume in [0, 1]
    Volume(f32),
    /// `None` when the user gave no path, which counts as a cancelled pick
    Open(Option<PathBuf>),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}', type 'help' for a list")]
    Unknown(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
    #[error("invalid argument '{value}' for '{command}'")]
    InvalidArgument { command: &'static str, value: String },
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Self, CommandParseError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_lowercase().as_str() {
            "" => return Err(CommandParseError::Empty),
            "list" | "ls" => ConsoleCommand::List,
            "play" => {
                if rest.is_empty() {
                    return Err(CommandParseError::MissingArgument("play"));
                }
                let n: usize = rest.parse().map_err(|_| CommandParseError::InvalidArgument {
                    command: "play",
                    value: rest.to_string(),
                })?;
                if n == 0 {
                    return Err(CommandParseError::InvalidArgument {
                        command: "play",
                        value: rest.to_string(),
                    });
                }
                ConsoleCommand::Play(n - 1)
            }
            "toggle" | "pause" | "resume" => ConsoleCommand::Toggle,
            "stop" => ConsoleCommand::Stop,
            "next" | "n" => ConsoleCommand::Next,
            "prev" | "previous" | "p" => ConsoleCommand::Previous,
            "shuffle" => ConsoleCommand::Shuffle,
            "level" => ConsoleCommand::Level,
            "volume" | "vol" => {
                if rest.is_empty() {
                    return Err(CommandParseError::MissingArgument("volume"));
                }
                let percent: f32 = rest
                    .parse()
                    .ok()
                    .filter(|v: &f32| (0.0..=100.0).contains(v))
                    .ok_or_else(|| CommandParseError::InvalidArgument {
                        command: "volume",
                        value: rest.to_string(),
                    })?;
                ConsoleCommand::Volume(percent / 100.0)
            }
            "open" => ConsoleCommand::Open((!rest.is_empty()).then(|| PathBuf::from(rest))),
            "status" => ConsoleCommand::Status,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" | "q" => ConsoleCommand::Quit,
            other => return Err(CommandParseError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

/// Result of running one console command
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub message: String,
    pub quit: bool,
}

impl Outcome {
    fn say(message: impl Into<String>) -> Self {
        Self { message: message.into(), quit: false }
    }
}

/// Run a command against the transport and describe the result
pub async fn dispatch(command: ConsoleCommand, state: &mut AppState) -> Outcome {
    match run_command(command, state).await {
        Ok(outcome) => outcome,
        Err(TransportError::ActorClosed) => Outcome {
            message: "Player has shut down.".to_string(),
            quit: true,
        },
        Err(e) => Outcome::say(format!("Could not play: {}", e)),
    }
}

async fn run_command(command: ConsoleCommand, state: &mut AppState) -> Result<Outcome, TransportError> {
    let transport = &state.transport;
    let outcome = match command {
        ConsoleCommand::List => {
            let tracks = transport.playlist().await?;
            let current = transport.snapshot().current_index;
            Outcome::say(format_playlist(&tracks, current))
        }
        ConsoleCommand::Play(index) => {
            transport.play(index).await?;
            Outcome::say(format_status(&transport.snapshot()))
        }
        ConsoleCommand::Toggle => {
            let message = match transport.toggle_play_pause().await? {
                PlayerState::Idle => "Nothing is playing.",
                PlayerState::Playing => "Resumed.",
                PlayerState::Paused => "Paused.",
            };
            Outcome::say(message)
        }
        ConsoleCommand::Stop => {
            transport.stop().await?;
            Outcome::say("Stopped.")
        }
        ConsoleCommand::Next => skipped(transport.next().await?, &transport.snapshot()),
        ConsoleCommand::Previous => skipped(transport.previous().await?, &transport.snapshot()),
        ConsoleCommand::Shuffle => skipped(transport.shuffle().await?, &transport.snapshot()),
        ConsoleCommand::Level => {
            let level = transport.snapshot().output_level;
            Outcome::say(format!("Level: {:.0}%", level * 100.0))
        }
        ConsoleCommand::Volume(volume) => {
            transport.set_volume(volume).await?;
            state.settings.playback.volume = volume;
            let mut message = format!("Volume: {:.0}%", volume * 100.0);
            if let Err(e) = state.settings.save(&state.app_dir) {
                tracing::warn!(error = %e, "Failed to persist volume");
                let _ = write!(message, " (not saved: {})", e);
            }
            Outcome::say(message)
        }
        ConsoleCommand::Open(path) => open_file(path, state).await?,
        ConsoleCommand::Status => Outcome::say(format_status(&transport.snapshot())),
        ConsoleCommand::Help => Outcome::say(HELP_TEXT),
        ConsoleCommand::Quit => Outcome {
            message: "Bye.".to_string(),
            quit: true,
        },
    };
    Ok(outcome)
}

async fn open_file(path: Option<PathBuf>, state: &AppState) -> Result<Outcome, TransportError> {
    let file = match import_file(path) {
        Ok(ImportOutcome::Selected(file)) => file,
        Ok(ImportOutcome::Cancelled) => return Ok(Outcome::say("No file selected.")),
        Err(e) => return Ok(Outcome::say(format!("Cannot open: {}", e))),
    };

    let Some(track) = file.to_track() else {
        let kind = match file.kind {
            FileKind::Image => "image",
            FileKind::Pdf => "PDF",
            FileKind::Audio | FileKind::Unsupported => "file",
        };
        return Ok(Outcome::say(format!(
            "Preview: {} ({}, {} bytes)",
            file.locator, kind, file.size_bytes
        )));
    };

    let id = track.id;
    state.transport.replace_playlist(vec![track]).await?;
    state.transport.play_track(id).await?;
    Ok(Outcome::say(format_status(&state.transport.snapshot())))
}

fn skipped(index: Option<usize>, snapshot: &TransportSnapshot) -> Outcome {
    match index {
        None => Outcome::say("Playlist is empty."),
        Some(_) => Outcome::say(format_status(snapshot)),
    }
}

pub fn format_track(track: &Track) -> String {
    match &track.artist {
        Some(artist) => format!("{} - {}", track.display_title(), artist),
        None => track.display_title().to_string(),
    }
}

pub fn format_playlist(tracks: &[Track], current: Option<usize>) -> String {
    if tracks.is_empty() {
        return "Playlist is empty.".to_string();
    }
    let mut out = String::new();
    for (i, track) in tracks.iter().enumerate() {
        let marker = if current == Some(i) { '>' } else { ' ' };
        let _ = writeln!(out, "{} {:>3}. {}", marker, i + 1, format_track(track));
    }
    out.truncate(out.trim_end().len());
    out
}

pub fn format_status(snapshot: &TransportSnapshot) -> String {
    let state = match snapshot.state {
        PlayerState::Idle => "Stopped",
        PlayerState::Playing => "Playing",
        PlayerState::Paused => "Paused",
    };
    match (&snapshot.current_track, snapshot.state) {
        (Some(track), PlayerState::Playing | PlayerState::Paused) => format!(
            "{}: {} [{}/{}]",
            state,
            format_track(track),
            snapshot.current_index.map(|i| i + 1).unwrap_or(0),
            snapshot.playlist_len
        ),
        _ => format!("{} ({} tracks)", state, snapshot.playlist_len),
    }
}
