//! Logging setup: env-overridable filter, local-time console output and an
//! optional daily-rolling log file.

use std::path::Path;

use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::LogConfig;
use crate::utils::fs;

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "live_recorder=info,flv=info";

/// Prefix of the rolling log files.
pub const LOG_FILE_PREFIX: &str = "live-recorder.log";

/// Custom timer that uses the local timezone via chrono.
///
/// Recording file names use local time too, so logs and files line up.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Picks the filter: `RUST_LOG` first, then the configured directive, then the default.
fn build_filter(configured: Option<&str>) -> crate::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    match configured {
        Some(directive) => EnvFilter::try_new(directive)
            .map_err(|e| crate::Error::config(format!("Invalid filter directive: {}", e))),
        None => Ok(EnvFilter::new(DEFAULT_LOG_FILTER)),
    }
}

/// Initialize the global subscriber.
///
/// # Returns
/// The file writer's guard when a log directory is configured; keep it alive
/// for the app lifetime so buffered lines are flushed on exit.
pub fn init_logging(config: &LogConfig) -> crate::Result<Option<WorkerGuard>> {
    let filter = build_filter(config.filter.as_deref())?;

    let (file_output, guard) = match config.dir.as_deref() {
        Some(log_dir) => {
            let (layer, guard) = file_layer(log_dir)?;
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // The boxed file layer sits directly on the registry; the filter still
    // applies globally.
    tracing_subscriber::registry()
        .with(file_output)
        .with(filter)
        .with(fmt::layer().with_ansi(true).with_timer(LocalTimer)) // Console output with local time
        .try_init()
        .map_err(|e| {
            crate::Error::Other(format!("Failed to set global default subscriber: {}", e))
        })?;

    Ok(guard)
}

type BoxedLayer = Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>;

fn file_layer(log_dir: &Path) -> crate::Result<(BoxedLayer, WorkerGuard)> {
    fs::ensure_dir_all_sync_with_op("creating log directory", log_dir)?;

    // Create file appender with daily rotation
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_timer(LocalTimer)
        .boxed();
    Ok((layer, guard))
}
