//! Logging setup with file rotation.

use crate::error::{CliError, Result as CliResult};

use std::path::Path;

use gsm_config::LoggingConfig;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::__tracing_subscriber_SubscriberExt};

const DEFAULT_FILE_PREFIX: &str = "gsm";

/// Setup logging with console and rotating file output.
///
/// # Log Layers
/// - Console: human-readable on stderr, colored when `logging.colored` is set
/// - File: plain text, daily rotation, 7-day retention
///
/// `RUST_LOG` takes precedence over `logging.level`.
pub fn setup_logging(config: &LoggingConfig, logs_dir: &Path) -> CliResult<()> {
    std::fs::create_dir_all(logs_dir).map_err(|e| {
        CliError::logging(format!("cannot create {}: {e}", logs_dir.display()))
    })?;

    // stdout carries command output only
    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(config.colored)
        .with_writer(std::io::stderr);

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(7) // Keep 7 days of logs
        .filename_prefix(config.file.as_deref().unwrap_or(DEFAULT_FILE_PREFIX))
        .filename_suffix("log")
        .build(logs_dir)
        .map_err(|e| CliError::logging(e.to_string()))?;

    let file_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_writer(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| CliError::logging(e.to_string()))?;

    // Bridge `log` records from the config crate
    tracing_log::LogTracer::init().map_err(|e| CliError::logging(e.to_string()))?;

    Ok(())
}

/// Filter used when `RUST_LOG` is unset. At the default `info` level the
/// runtime logs its state transitions at debug as well.
pub(crate) fn default_directive(config: &LoggingConfig) -> String {
    let level = config.level.as_directive();
    if level == "info" {
        String::from("info,gsm_runtime=debug")
    } else {
        String::from(level)
    }
}
