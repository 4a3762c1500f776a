use std::fmt;
use std::{error, io};

use crate::env::Env;

//------------ ErrorKind -----------------------------------------------------

/// The stage or concern an [`Error`] originated from.
///
/// Every kind is fatal to a signing run; the kind only exists so that callers
/// and tests can tell failures apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid configuration.
    Config,

    /// Malformed zone file text.
    Parse,

    /// Key backend could not be opened, initialised or logged into.
    Session,

    /// A key could not be retrieved or created.
    Key,

    /// The key backend failed to produce a signature.
    Sign,

    /// NSEC3 owner name hashes kept colliding.
    Collision,

    /// Reading or writing a stream failed.
    Io,

    /// Anything else, including command line usage errors.
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Config => "configuration error",
            ErrorKind::Parse => "parse error",
            ErrorKind::Session => "session error",
            ErrorKind::Key => "key error",
            ErrorKind::Sign => "signing error",
            ErrorKind::Collision => "hash collision",
            ErrorKind::Io => "I/O error",
            ErrorKind::Other => "error",
        })
    }
}

//------------ Error ---------------------------------------------------------

/// The error type of every fallible operation in this crate.
///
/// The payload is boxed so that `Result<T>` stays small on the happy path.
pub struct Error(Box<Inner>);

struct Inner {
    cause: Cause,

    /// What the program was doing, innermost first.
    context: Vec<Box<str>>,
}

#[derive(Debug)]
enum Cause {
    /// The command line was rejected, or help was requested.
    Usage(clap::Error),

    /// The program failed after the command line was accepted.
    Failure { kind: ErrorKind, message: Box<str> },
}

impl Error {
    /// Construct a new error of the given kind.
    pub fn new(kind: ErrorKind, message: &str) -> Self {
        Self::from_cause(Cause::Failure {
            kind,
            message: message.into(),
        })
    }

    fn from_cause(cause: Cause) -> Self {
        Self(Box::new(Inner {
            cause,
            context: Vec::new(),
        }))
    }

    pub fn config(error: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Config, &error.to_string())
    }

    pub fn parse(error: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Parse, &error.to_string())
    }

    pub fn session(error: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Session, &error.to_string())
    }

    pub fn key(error: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Key, &error.to_string())
    }

    pub fn sign(error: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Sign, &error.to_string())
    }

    pub fn collision(error: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Collision, &error.to_string())
    }

    pub fn io(error: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Io, &error.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match &self.0.cause {
            Cause::Usage(_) => ErrorKind::Other,
            Cause::Failure { kind, .. } => *kind,
        }
    }

    /// Wrap the error in one more layer of context.
    ///
    /// `context` completes the phrase "while ...".
    pub fn context(mut self, context: &str) -> Self {
        self.0.context.push(context.into());
        self
    }

    /// Report the error on the streams of `env`.
    pub fn pretty_print(&self, env: impl Env) {
        let message = match &self.0.cause {
            // Clap renders its own messages. Help and version output is not
            // an error and goes to stdout.
            Cause::Usage(err) => {
                if err.use_stderr() {
                    write!(env.stderr(), "{}", err.render().ansi());
                } else {
                    write!(env.stdout(), "{}", err.render());
                }
                return;
            }
            Cause::Failure { message, .. } => message,
        };

        let prog = env
            .args_os()
            .next()
            .map(|arg| arg.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dnssign".into());
        let mut stderr = env.stderr();
        let marker = if stderr.is_terminal() {
            "\x1B[31mERROR:\x1B[0m"
        } else {
            "ERROR:"
        };
        writeln!(stderr, "[{prog}] {marker} {message}");
        for context in &self.0.context {
            writeln!(stderr, "... while {context}");
        }
    }

    /// The process exit code for this error.
    ///
    /// Usage errors keep clap's code, 2, and help output exits with 0.
    pub fn exit_code(&self) -> u8 {
        match &self.0.cause {
            Cause::Usage(err) => err.exit_code() as u8,
            Cause::Failure { .. } => 1,
        }
    }
}

//--- From

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Self::new(ErrorKind::Other, message)
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Self::new(ErrorKind::Other, &message)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::io(err)
    }
}

impl From<clap::Error> for Error {
    fn from(err: clap::Error) -> Self {
        Self::from_cause(Cause::Usage(err))
    }
}

//--- Display and Debug

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.cause {
            Cause::Usage(err) => err.fmt(f),
            Cause::Failure { message, .. } => f.write_str(message),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("cause", &self.0.cause)
            .field("context", &self.0.context)
            .finish()
    }
}

impl error::Error for Error {}

//------------ Macros --------------------------------------------------------

// `macro_export` puts the macros at the crate root. They are hidden there
// and re-exported from this module instead.

#[doc(inline)]
pub use crate::bail;

#[doc(inline)]
pub use crate::ensure;

/// Return an [`Error`] of the given kind from the current function.
#[doc(hidden)]
#[macro_export]
macro_rules! bail {
    ($kind:ident, $fmt:expr) => {
        return Err($crate::error::Error::new(
            $crate::error::ErrorKind::$kind,
            &format!($fmt),
        ))
    };

    ($kind:ident, $fmt:expr, $($args:tt)*) => {
        return Err($crate::error::Error::new(
            $crate::error::ErrorKind::$kind,
            &format!($fmt, $($args)*),
        ))
    };
}

/// Return an [`Error`] of the given kind if the condition does not hold.
#[doc(hidden)]
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $kind:ident, $fmt:expr) => {
        if !$cond { $crate::error::bail!($kind, $fmt); }
    };

    ($cond:expr, $kind:ident, $fmt:expr, $($args:tt)*) => {
        if !$cond { $crate::error::bail!($kind, $fmt, $($args)*); }
    };
}

//------------ Result --------------------------------------------------------

pub type Result<T> = core::result::Result<T, Error>;

/// Attach context to the error of a [`Result`].
pub trait Context: Sized {
    fn context(self, context: &str) -> Self;

    /// Like [`Context::context`], but only builds the text on failure.
    fn with_context(self, context: impl FnOnce() -> String) -> Self;
}

impl<T> Context for Result<T> {
    fn context(self, context: &str) -> Self {
        self.map_err(|err| err.context(context))
    }

    fn with_context(self, context: impl FnOnce() -> String) -> Self {
        self.map_err(|err| err.context(&context()))
    }
}
