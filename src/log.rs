//! Log output.
//!
//! Everything is logged through [`tracing`]. Each command run installs a
//! subscriber that writes to the stderr of its [`Env`], so tests see the log
//! output of the command they run.

use std::fmt::Display;

use tracing::{Level, Subscriber};

use crate::env::Env;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// The level selected by the number of `-v` and `-q` flags.
    pub fn from_flags(verbose: u8, quiet: u8) -> Self {
        match (verbose, quiet) {
            (0, 0) => LogLevel::Info,
            (0, 1) => LogLevel::Warning,
            (0, _) => LogLevel::Error,
            (1, _) => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    fn level(self) -> Level {
        match self {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warning => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }

    fn text(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

/// A subscriber logging at `level` and above to the stderr of `env`.
///
/// Colors are only used when stderr is a terminal.
pub fn subscriber(env: &impl Env, level: LogLevel) -> impl Subscriber + Send + Sync + 'static {
    let stderr = env.stderr();
    let ansi = stderr.is_terminal();
    tracing_subscriber::fmt()
        .with_writer(stderr)
        .with_max_level(level.level())
        .with_ansi(ansi)
        .with_target(false)
        .without_time()
        .finish()
}
