use std::borrow::Cow;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::{fmt, io};

use chrono::{DateTime, TimeZone, Utc};

use crate::error::Error;
use crate::{parse_args, run, Args};

use super::{Env, Stream};

//------------ FakeCmd -------------------------------------------------------

/// A command line run against a [`FakeEnv`].
///
/// Every builder method returns a modified copy, so a base command can be
/// shared between several invocations in one test.
#[derive(Clone)]
pub struct FakeCmd {
    argv: Vec<OsString>,
    dir: Option<PathBuf>,
    clock: DateTime<Utc>,
}

impl FakeCmd {
    /// The clock every [`FakeCmd`] starts with: 2024-03-01T12:00:00Z.
    pub fn default_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    /// A command with the given leading arguments, `argv[0]` included.
    pub fn new<S: Into<OsString>>(argv: impl IntoIterator<Item = S>) -> Self {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            dir: None,
            clock: Self::default_now(),
        }
    }

    /// Resolve relative paths against `dir`.
    pub fn cwd(&self, dir: impl AsRef<Path>) -> Self {
        let mut cmd = self.clone();
        cmd.dir = Some(dir.as_ref().into());
        cmd
    }

    /// Pin the invocation clock.
    pub fn now(&self, now: DateTime<Utc>) -> Self {
        let mut cmd = self.clone();
        cmd.clock = now;
        cmd
    }

    /// Append arguments.
    pub fn args<S: Into<OsString>>(&self, args: impl IntoIterator<Item = S>) -> Self {
        let mut cmd = self.clone();
        cmd.argv.extend(args.into_iter().map(Into::into));
        cmd
    }

    pub fn parse(&self) -> Result<Args, Error> {
        parse_args(FakeEnv::from(self.clone()))
    }

    /// Run the command and capture what it printed.
    pub fn run(&self) -> FakeResult {
        let env = FakeEnv::from(self.clone());
        let exit_code = run(&env);
        FakeResult {
            exit_code,
            stdout: env.get_stdout(),
            stderr: env.get_stderr(),
        }
    }
}

//------------ FakeResult ----------------------------------------------------

#[derive(Debug)]
pub struct FakeResult {
    pub exit_code: u8,
    pub stdout: String,
    pub stderr: String,
}

//------------ FakeEnv -------------------------------------------------------

/// An environment with captured output, a fixed clock and a chosen
/// working directory.
pub struct FakeEnv {
    pub cmd: FakeCmd,
    pub stdout: Captured,
    pub stderr: Captured,
}

impl FakeEnv {
    pub fn get_stdout(&self) -> String {
        self.stdout.to_string()
    }

    pub fn get_stderr(&self) -> String {
        self.stderr.to_string()
    }
}

impl From<FakeCmd> for FakeEnv {
    fn from(cmd: FakeCmd) -> Self {
        Self {
            cmd,
            stdout: Captured::default(),
            stderr: Captured::default(),
        }
    }
}

impl Env for FakeEnv {
    fn args_os(&self) -> impl Iterator<Item = OsString> {
        self.cmd.argv.clone().into_iter()
    }

    fn stdout(&self) -> Stream<impl io::Write> {
        Stream::new(self.stdout.clone(), false)
    }

    fn stderr(&self) -> Stream<impl io::Write + Send + Sync + 'static + use<>> {
        Stream::new(self.stderr.clone(), false)
    }

    fn in_cwd<'a>(&self, path: &'a impl AsRef<Path>) -> Cow<'a, Path> {
        match self.cmd.dir.as_deref() {
            Some(dir) => Cow::Owned(dir.join(path)),
            None => Cow::Borrowed(path.as_ref()),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.cmd.clock
    }
}

//------------ Captured ------------------------------------------------------

/// Shared buffer standing in for stdout or stderr.
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Display for Captured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0.lock().unwrap()))
    }
}
