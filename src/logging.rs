//! Logging setup for console and optional file output.
//!
//! Builds a `tracing` subscriber with a compact console layer and, when a log
//! file is configured, a non-blocking file layer appending to it. The returned
//! guard must be held for the lifetime of the program so buffered log lines
//! are flushed on exit.

use chrono::Local;
use std::fmt as stdfmt;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt as tsfmt, registry};

/// Console log verbosity selected from the CLI flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Informational logging (default).
    Normal,
    /// Debug logging.
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    fn directive(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
        }
    }
}

/// Timestamp formatter producing `DD/MM/YY HH:MM:SS` in local time.
struct LocalHumanTime;

impl FormatTime for LocalHumanTime {
    fn format_time(
        &self,
        w: &mut tracing_subscriber::fmt::format::Writer<'_>,
    ) -> stdfmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%d/%m/%y %H:%M:%S"))
    }
}

/// Initializes the global subscriber.
///
/// When `log_file` is set but cannot be opened, a warning goes to stderr and
/// logging continues console-only rather than aborting the program.
pub fn init(verbosity: Verbosity, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::new(verbosity.directive());

    if let Some(path) = log_file {
        match open_append(path) {
            Ok(file) => {
                let (writer, guard) = tracing_appender::non_blocking(file);
                let stdout_layer = tsfmt::layer()
                    .with_timer(LocalHumanTime)
                    .with_target(false)
                    .compact();
                let file_layer = tsfmt::layer()
                    .with_timer(LocalHumanTime)
                    .with_target(false)
                    .with_ansi(false)
                    .compact()
                    .with_writer(writer);

                registry()
                    .with(env_filter)
                    .with(stdout_layer)
                    .with(file_layer)
                    .init();
                return Some(guard);
            }
            Err(e) => {
                eprintln!(
                    "Failed to open log file {}: {}. Continuing with console logging only.",
                    path.display(),
                    e
                );
            }
        }
    }

    let stdout_layer = tsfmt::layer()
        .with_timer(LocalHumanTime)
        .with_target(false)
        .compact();
    registry().with(env_filter).with(stdout_layer).init();
    None
}

fn open_append(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    std::fs::OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(true, false), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Quiet);
    }

    #[test]
    fn test_verbosity_filter_directives() {
        assert_eq!(Verbosity::Quiet.directive(), "error");
        assert_eq!(Verbosity::Normal.directive(), "info");
        assert_eq!(Verbosity::Verbose.directive(), "debug");
    }
}
