//! The commands of _dnssign_.
pub mod nsec3hash;
pub mod sign;

use crate::env::Env;

use super::error::Error;

#[allow(clippy::large_enum_variant)]
#[derive(Clone, Debug, clap::Subcommand)]
pub enum Command {
    /// Sign a zone with keys from a key file pair or a PKCS#11 module
    ///
    /// The zone is read from a master file, stripped of any DNSSEC records
    /// it carries and written back with a DNSKEY RRset, an NSEC or NSEC3
    /// chain and an RRSIG for every authoritative RRset.
    ///
    /// The output goes to '<name>-signed<.ext>' next to the input unless
    /// '--output' says otherwise.
    #[command(name = "sign", verbatim_doc_comment)]
    Sign(self::sign::Sign),

    /// Print the NSEC3 hash of a given domain name
    #[command(name = "nsec3-hash")]
    Nsec3Hash(self::nsec3hash::Nsec3Hash),
}

impl Command {
    pub fn execute(self, env: impl Env) -> Result<(), Error> {
        match self {
            Self::Sign(sign) => sign.execute(env),
            Self::Nsec3Hash(nsec3hash) => nsec3hash.execute(env),
        }
    }
}
