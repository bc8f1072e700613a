//! Logger setup for the executables
//!
//! Records go to stdout with coloured level tags and to the session log file
//! with plain tags. Targets which log on every control cycle are capped at
//! `debug` regardless of the requested level.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{info, Level, Record};
use std::fmt;
use thiserror::Error;

// Internal imports
use crate::session::{self, Session};

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Targets which log at `trace` level on every cycle of a fast loop.
const CYCLIC_TARGETS: [&str; 3] = [
    "drive_lib::drive_ctrl",
    "drive_lib::controller",
    "drive_lib::fusion",
];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level of at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Cannot open the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("A logger has already been set: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `min_level` must be `Info` or more verbose. Must only be called once per
/// process, a second call returns [`LoggerInitError::FernInitError`].
pub fn logger_init(min_level: LevelFilter, session: &Session) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file =
        fern::log_file(&session.log_file_path).map_err(LoggerInitError::LogFileInitError)?;

    let mut root = fern::Dispatch::new().level(min_level);
    for target in CYCLIC_TARGETS.iter() {
        root = root.level_for(*target, min_level.min(LevelFilter::Debug));
    }

    root.chain(
        fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{}",
                    Line::new(record, message, level_tag(record.level()))
                ))
            })
            .chain(std::io::stdout()),
    )
    .chain(
        fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{}",
                    Line::new(record, message, plain_tag(record.level()))
                ))
            })
            .chain(log_file),
    )
    .apply()
    .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE ITEMS
// ---------------------------------------------------------------------------

/// One formatted log line.
///
/// The target is only shown for `debug` and `trace` records.
struct Line<'a, T: fmt::Display> {
    elapsed_s: f64,
    tag: T,
    target: Option<&'a str>,
    message: &'a dyn fmt::Display,
}

impl<'a, T: fmt::Display> Line<'a, T> {
    fn new(record: &'a Record, message: &'a fmt::Arguments, tag: T) -> Self {
        Self {
            elapsed_s: session::get_elapsed_seconds(),
            tag,
            target: if record.level() > Level::Info {
                Some(record.target())
            } else {
                None
            },
            message,
        }
    }
}

impl<'a, T: fmt::Display> fmt::Display for Line<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:10.6} {}] ", self.elapsed_s, self.tag)?;
        if let Some(target) = self.target {
            write!(f, "{}: ", target)?;
        }
        write!(f, "{}", self.message)
    }
}

fn plain_tag(level: Level) -> &'static str {
    match level {
        Level::Trace => "TRC",
        Level::Debug => "DBG",
        Level::Info => "INF",
        Level::Warn => "WRN",
        Level::Error => "ERR",
    }
}

fn level_tag(level: Level) -> ColoredString {
    let tag = plain_tag(level);
    match level {
        Level::Trace => tag.dimmed().italic(),
        Level::Debug => tag.dimmed(),
        Level::Info => tag.normal(),
        Level::Warn => tag.yellow(),
        Level::Error => tag.red().bold(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_line_format() {
        let line = Line {
            elapsed_s: 1.5,
            tag: plain_tag(Level::Debug),
            target: Some("drive_lib::controller"),
            message: &"speed 12",
        };
        assert_eq!(
            line.to_string(),
            "[  1.500000 DBG] drive_lib::controller: speed 12"
        );

        let line = Line {
            elapsed_s: 0.0,
            tag: plain_tag(Level::Info),
            target: None,
            message: &"started",
        };
        assert_eq!(line.to_string(), "[  0.000000 INF] started");
    }
}
