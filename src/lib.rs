//! Sign DNS zones with DNSSEC.
//!
//! The engine reads a zone from a master file, adds the DNSKEY RRset and an
//! NSEC or NSEC3 chain and signs every authoritative RRset with keys kept in
//! PEM files or in a PKCS#11 module. The command line front end lives in
//! [`commands`].

pub mod args;
pub mod chain;
pub mod commands;
pub mod config;
pub mod context;
pub mod env;
pub mod error;
pub mod keys;
pub mod log;
pub mod parse;
pub mod record;
pub mod signer;
pub mod util;
pub mod zonefile;

use clap::Parser;

pub use args::Args;
use env::Env;
use error::Error;

/// Parse the command line of `env`.
pub fn parse_args(env: impl Env) -> Result<Args, Error> {
    Args::try_parse_from(env.args_os()).map_err(Error::from)
}

/// Run the command given on the command line of `env`.
///
/// Errors are printed to the stderr of `env`. Returns the exit code.
pub fn run(env: impl Env) -> u8 {
    let res = parse_args(&env).and_then(|args| args.execute(&env));
    match res {
        Ok(()) => 0,
        Err(err) => {
            err.pretty_print(&env);
            err.exit_code()
        }
    }
}
