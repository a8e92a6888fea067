//! File-based logging
//!
//! The console front-end owns stdout, so tracing output goes to a daily
//! rolling file in the app directory instead.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_DIR: &str = "logs";
const LOG_FILE_PREFIX: &str = "songdeck";
const DEFAULT_FILTER: &str = "songdeck=debug,songdeck_lib=debug,symphonia=warn,warn";

/// Initialize the logging system.
///
/// Logs are written to `<app_dir>/logs/songdeck.YYYY-MM-DD`. The level can be
/// controlled via `RUST_LOG`. Keep the returned guard alive for the lifetime of
/// the program or buffered lines are lost on exit.
pub fn init_logging(app_dir: &Path) -> anyhow::Result<WorkerGuard> {
    let log_dir = app_dir.join(LOG_DIR);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!(dir = %log_dir.display(), "Logging initialized");
    Ok(guard)
}
