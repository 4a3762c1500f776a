use clap::ArgAction;

use super::commands::Command;
use super::error::Error;
use crate::env::Env;
use crate::log::{self, LogLevel};

#[derive(Clone, Debug, clap::Parser)]
#[command(version, disable_help_subcommand = true)]
pub struct Args {
    /// Log more details, repeat for even more
    #[arg(short, long, action = ArgAction::Count, global = true, conflicts_with = "quiet")]
    pub(crate) verbose: u8,

    /// Log warnings and errors only, repeat to log errors only
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub(crate) quiet: u8,

    #[command(subcommand)]
    pub(crate) command: Command,
}

impl Args {
    /// Run the command with logging set up as requested.
    pub fn execute(self, env: impl Env) -> Result<(), Error> {
        let level = LogLevel::from_flags(self.verbose, self.quiet);
        let subscriber = log::subscriber(&env, level);
        tracing::subscriber::with_default(subscriber, || self.command.execute(&env))
    }
}

impl From<Command> for Args {
    fn from(value: Command) -> Self {
        Args {
            verbose: 0,
            quiet: 0,
            command: value,
        }
    }
}
