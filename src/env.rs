//! Access to the outside world.
//!
//! Commands never touch the process arguments, the standard streams, the
//! working directory or the clock directly. They go through an [`Env`] so
//! that tests can run them against a [`fake::FakeEnv`].

use std::borrow::Cow;
use std::ffi::OsString;
use std::io::Write as _;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::{fmt, io};

use chrono::{DateTime, Utc};
use tracing_subscriber::fmt::MakeWriter;

#[cfg(test)]
pub mod fake;

mod real;
pub use real::RealEnv;

//------------ Env -----------------------------------------------------------

pub trait Env {
    /// The command line, `argv[0]` included.
    fn args_os(&self) -> impl Iterator<Item = OsString>;

    fn stdout(&self) -> Stream<impl io::Write>;

    /// The stream diagnostics and log output go to.
    fn stderr(&self) -> Stream<impl io::Write + Send + Sync + 'static + use<Self>>;

    /// Resolve a relative path against the working directory.
    fn in_cwd<'a>(&self, path: &'a impl AsRef<Path>) -> Cow<'a, Path>;

    /// The moment the program was invoked.
    ///
    /// Signature inception and the default expirations are derived from
    /// this, so it is sampled once.
    fn now(&self) -> DateTime<Utc>;
}

impl<'e, E: Env> Env for &'e E {
    fn args_os(&self) -> impl Iterator<Item = OsString> {
        E::args_os(self)
    }

    fn stdout(&self) -> Stream<impl io::Write> {
        E::stdout(self)
    }

    fn stderr(&self) -> Stream<impl io::Write + Send + Sync + 'static + use<'e, E>> {
        E::stderr(self)
    }

    fn in_cwd<'a>(&self, path: &'a impl AsRef<Path>) -> Cow<'a, Path> {
        E::in_cwd(self, path)
    }

    fn now(&self) -> DateTime<Utc> {
        E::now(self)
    }
}

//------------ Stream --------------------------------------------------------

/// An output stream that can be used with [`write!`] without handling errors.
///
/// Write failures are dropped, the same way `println!` treats them. The
/// stream also serves as the writer of the log subscriber.
pub struct Stream<T: io::Write> {
    inner: Mutex<T>,
    is_terminal: bool,
}

impl<T: io::Write> Stream<T> {
    fn new(inner: T, is_terminal: bool) -> Self {
        Self {
            inner: Mutex::new(inner),
            is_terminal,
        }
    }

    fn inner(&self) -> MutexGuard<'_, T> {
        // A panic mid-write leaves the writer usable.
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }

    pub fn write_fmt(&mut self, args: fmt::Arguments<'_>) {
        let _ = self.inner().write_fmt(args);
    }

    pub fn write_str(&mut self, s: &str) {
        let _ = self.inner().write_all(s.as_bytes());
    }

    /// Whether escape sequences will be understood.
    pub fn is_terminal(&self) -> bool {
        self.is_terminal
    }
}

impl<T: io::Write> io::Write for &Stream<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner().flush()
    }
}

impl<'a, T: io::Write + 'a> MakeWriter<'a> for Stream<T> {
    type Writer = &'a Self;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}
