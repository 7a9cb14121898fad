// Logging setup - stderr output plus an optional rotating JSON file
//
// Human-readable logs go to stderr so stdout stays clean for command output.
// With file logging enabled, a second JSON layer writes through a
// non-blocking appender.
//
// Filter precedence: RUST_LOG env var > config file level > "info"

use crate::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the file appender, or `None` if the log directory can't be used
fn file_appender(config: &LoggingConfig) -> Option<RollingFileAppender> {
    if let Err(e) = std::fs::create_dir_all(&config.file_dir) {
        eprintln!(
            "Warning: Could not create log directory {}: {}",
            config.file_dir.display(),
            e
        );
        return None;
    }

    RollingFileAppender::builder()
        .rotation(config.file_rotation.rotation())
        .filename_prefix(&config.file_prefix)
        .build(&config.file_dir)
        .map_err(|e| eprintln!("Warning: Could not open log file: {}", e))
        .ok()
}

/// Install the global subscriber
///
/// Keep the returned guard alive until exit; dropping it flushes and stops
/// the file writer thread.
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    let appender = if config.file_enabled {
        file_appender(config)
    } else {
        None
    };

    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(guard)
}
