// Songdeck - Console Music Player
// Module declarations
pub mod audio;
pub mod commands;
pub mod library;
pub mod logging;
pub mod metadata;
pub mod queue;
pub mod settings;
pub mod state;
pub mod transport;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use audio::LocalEngine;
use commands::{dispatch, format_status, ConsoleCommand, HELP_TEXT};
use library::{DirectoryLibrary, LibraryError, MediaLibrarySource, Playlist};
use settings::AppSettings;
use state::AppState;
use transport::{TransportController, TransportHandle, TransportSnapshot};

#[derive(Debug, Parser)]
#[command(name = "songdeck", version, about = "Play a folder of music from the terminal")]
pub struct Cli {
    /// Music directory to scan (overrides the saved setting)
    #[arg(long, env = "SONGDECK_LIBRARY")]
    pub library: Option<PathBuf>,

    /// Directory holding settings and logs
    #[arg(long, env = "SONGDECK_APP_DIR", default_value = ".songdeck")]
    pub app_dir: PathBuf,

    /// Output volume in percent for this run
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub volume: Option<u8>,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _log_guard = match logging::init_logging(&cli.app_dir) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            None
        }
    };
    tracing::info!("=== Songdeck starting ===");

    let mut settings = AppSettings::load(&cli.app_dir).context("Failed to load settings")?;
    if let Some(root) = cli.library {
        settings.library.root = Some(root);
    }
    if let Some(percent) = cli.volume {
        settings.playback.volume = f32::from(percent) / 100.0;
    }

    let tracks = load_library(settings.library.root.clone()).await?;
    println!("Loaded {} tracks. Type 'help' for commands.", tracks.len());

    let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
    let engine = LocalEngine::new(events_tx, settings.playback.volume);
    let controller = TransportController::new(engine, tracks)
        .with_auto_advance(settings.playback.auto_advance);
    let (transport, actor) = TransportHandle::spawn(
        controller,
        events_rx,
        settings.playback.level_interval(),
    );

    let mut state = AppState::new(transport, settings, cli.app_dir);
    console_loop(&mut state).await?;

    state.transport.shutdown().await;
    if let Err(e) = actor.await {
        tracing::error!(error = %e, "Transport task panicked");
    }
    tracing::info!("=== Songdeck exiting ===");
    Ok(())
}

async fn load_library(root: Option<PathBuf>) -> anyhow::Result<Playlist> {
    let source = DirectoryLibrary::new(root);
    let fetched = tokio::task::spawn_blocking(move || source.fetch_tracks())
        .await
        .context("Library scan task failed")?;

    match fetched {
        Ok(tracks) => Ok(tracks),
        Err(LibraryError::NotConfigured) => {
            println!("No music directory set. Use --library <dir> or 'open <file>'.");
            Ok(Playlist::new())
        }
        Err(e) => {
            tracing::error!(error = %e, "Library scan failed");
            println!("Could not read the music library: {}", e);
            Ok(Playlist::new())
        }
    }
}

async fn console_loop(state: &mut AppState) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut updates = state.transport.subscribe();
    let mut last = updates.borrow().clone();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let outcome = match ConsoleCommand::parse(&line) {
                    Ok(command) => {
                        tracing::debug!(?command, "Console command");
                        dispatch(command, state).await
                    }
                    Err(e) => commands::Outcome { message: format!("{}\n{}", e, HELP_TEXT), quit: false },
                };
                println!("{}", outcome.message);
                if outcome.quit {
                    break;
                }
                last = state.transport.snapshot();
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = updates.borrow_and_update().clone();
                if track_changed(&last, &current) {
                    println!("{}", format_status(&current));
                }
                last = current;
            }
        }
    }
    Ok(())
}

/// Level ticks alone are not worth printing
fn track_changed(before: &TransportSnapshot, after: &TransportSnapshot) -> bool {
    before.state != after.state || before.current_index != after.current_index
}
