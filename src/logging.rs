//! File logging.
//!
//! The terminal is in raw mode while the game runs, so logs only go to a
//! non-blocking file writer. Keep the returned guard alive until exit or the
//! tail of the log is lost.

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE: &str = "colour-balls.log";

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub dir: PathBuf,
    /// `EnvFilter` directives, e.g. `info,colour_balls_core=debug`.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            filter: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// `COLOUR_BALLS_LOG_DIR`, then `COLOUR_BALLS_LOG` falling back to `RUST_LOG`.
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let non_empty = |key: &str| env::var(key).ok().filter(|s| !s.trim().is_empty());

        Self {
            dir: non_empty("COLOUR_BALLS_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.dir),
            filter: non_empty("COLOUR_BALLS_LOG")
                .or_else(|| non_empty("RUST_LOG"))
                .unwrap_or(defaults.filter),
        }
    }
}

pub fn init(config: &LogConfig) -> Result<WorkerGuard> {
    let appender = RollingFileAppender::new(Rotation::DAILY, &config.dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_thread_names(true)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()?;

    info!(dir = %config.dir.display(), "logger initialized");
    Ok(guard)
}
