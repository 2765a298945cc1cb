//! Logging infrastructure.
//!
//! Structured logging for the streaming engine, with dual output:
//! - a non-blocking file appender under the given log directory
//! - stdout, for tailing during development
//!
//! The filter is configurable via the `RUST_LOG` environment variable and
//! defaults to `info`.

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default log directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "tilestream.log";

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping the guard flushes and closes the file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initializes the global logging subscriber.
///
/// Creates the log directory if needed and truncates the previous log file,
/// then installs file and stdout layers behind an `EnvFilter`.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or the log file
/// cannot be truncated.
pub fn init_logging(log_dir: &str, log_file: &str) -> Result<LoggingGuard, io::Error> {
    fs::create_dir_all(log_dir)?;

    // Truncate whatever the previous session left behind.
    let log_path = Path::new(log_dir).join(log_file);
    fs::write(&log_path, "")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .compact();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true)
        .compact();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
