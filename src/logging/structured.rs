//! Subscriber setup
//!
//! Two layers share one registry. The console layer writes to stderr and
//! carries operational events at the requested level; per-record events
//! (target [`RECORD_TARGET`]) reach it only as warnings, so a large batch
//! does not flood the terminal with field issues. The optional JSON file layer keeps
//! the full per-record stream next to the diagnostic trail.
//!
//! Neither layer ever sees original field values: the record macros only
//! carry origins, paths, action names and error labels.

use crate::config::LoggingConfig;
use crate::domain::{DeidError, Result};
use std::str::FromStr;
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Target of per-record events (skips, field issues)
pub const RECORD_TARGET: &str = "deident::records";

const LOG_FILE_PREFIX: &str = "deident";
const LOG_FILE_SUFFIX: &str = "log";

/// Keeps the file writer alive; drop it last to flush buffered lines
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Installs the global subscriber
///
/// `RUST_LOG` replaces the console directives when set. The file layer
/// always uses [`file_directives`], so the per-record stream is complete
/// regardless of what the console shows.
///
/// # Errors
///
/// Returns a configuration error for an unknown level or rotation, or when
/// the log directory cannot be created.
pub fn init_logging(level: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let level = parse_log_level(level)?;

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_directives(level)));
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(console_filter)
        .boxed();

    let (file, file_guard) = if config.local_enabled {
        let (layer, guard) = file_layer(level, config)?;
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .init();

    tracing::info!(
        level = %level,
        file = config.local_enabled,
        rotation = %config.local_rotation,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// JSON lines layer writing to `<local_path>/deident[.<period>].log`
///
/// # Errors
///
/// Returns a configuration error for an unknown rotation or an unusable
/// log directory.
pub fn file_layer<S>(
    level: Level,
    config: &LoggingConfig,
) -> Result<(Box<dyn Layer<S> + Send + Sync>, WorkerGuard)>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let appender = RollingFileAppender::builder()
        .rotation(rotation(&config.local_rotation)?)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(&config.local_path)
        .map_err(|e| {
            DeidError::Configuration(format!(
                "Cannot log to directory {}: {e}",
                config.local_path
            ))
        })?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_target(true)
        .with_writer(writer)
        .with_filter(EnvFilter::new(file_directives(level)))
        .boxed();

    Ok((layer, guard))
}

/// Console filter: the crate at `level`, record events only when they warn
pub fn console_directives(level: Level) -> String {
    let records = if level < Level::WARN { level } else { Level::WARN };
    format!("deident={level},{RECORD_TARGET}={records}")
}

/// File filter: the crate at `level`, record events down to debug
pub fn file_directives(level: Level) -> String {
    let records = if level > Level::DEBUG { level } else { Level::DEBUG };
    format!("deident={level},{RECORD_TARGET}={records}")
}

/// Parses `trace`, `debug`, `info`, `warn` or `error`, ignoring case
pub fn parse_log_level(level: &str) -> Result<Level> {
    Level::from_str(level.trim()).map_err(|_| {
        DeidError::Configuration(format!(
            "Invalid log level: {level}. Must be one of: trace, debug, info, warn, error"
        ))
    })
}

fn rotation(name: &str) -> Result<Rotation> {
    match name {
        "daily" => Ok(Rotation::DAILY),
        "hourly" => Ok(Rotation::HOURLY),
        "never" => Ok(Rotation::NEVER),
        other => Err(DeidError::Configuration(format!(
            "Invalid logging.local_rotation '{other}'"
        ))),
    }
}
