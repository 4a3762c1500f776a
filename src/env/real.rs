use std::borrow::Cow;
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};

use super::{Env, Stream};

/// Use real I/O
#[derive(Default)]
pub struct RealEnv {
    invoked_at: OnceLock<DateTime<Utc>>,
}

impl Env for RealEnv {
    fn args_os(&self) -> impl Iterator<Item = OsString> {
        std::env::args_os()
    }

    fn stdout(&self) -> Stream<impl io::Write> {
        Stream::new(io::stdout(), io::stdout().is_terminal())
    }

    fn stderr(&self) -> Stream<impl io::Write + Send + Sync + 'static + use<>> {
        Stream::new(io::stderr(), io::stderr().is_terminal())
    }

    fn in_cwd<'a>(&self, path: &'a impl AsRef<Path>) -> Cow<'a, Path> {
        path.as_ref().into()
    }

    fn now(&self) -> DateTime<Utc> {
        *self.invoked_at.get_or_init(Utc::now)
    }
}
