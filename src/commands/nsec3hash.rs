use clap::builder::ValueParser;

use crate::chain::nsec3::hash_to_string;
use crate::env::Env;
use crate::error::Error;
use crate::parse::{parse_name, parse_salt};
use crate::record::rdata::NSEC3_SHA1;
use crate::record::Name;

#[derive(Clone, Debug, clap::Args)]
pub struct Nsec3Hash {
    /// The hashing algorithm to use
    #[arg(
        long,
        short = 'a',
        value_name = "NUMBER_OR_MNEMONIC",
        default_value = "SHA-1",
        value_parser = ValueParser::new(Nsec3Hash::parse_nsec3_alg)
    )]
    algorithm: u8,

    /// The number of hash iterations
    #[arg(long, short = 'i', visible_short_alias = 't', default_value_t = 0)]
    iterations: u16,

    /// The salt in hex representation
    #[arg(
        long,
        short = 's',
        value_name = "HEX_STRING",
        default_value = "-",
        value_parser = ValueParser::new(parse_salt)
    )]
    // Spelled out so clap takes it as one value rather than a list.
    salt: ::std::vec::Vec<u8>,

    /// The domain name to hash
    #[arg(value_name = "DOMAIN_NAME", value_parser = ValueParser::new(parse_name))]
    name: Name,
}

impl Nsec3Hash {
    pub fn parse_nsec3_alg(arg: &str) -> Result<u8, Error> {
        if let Ok(num) = arg.parse::<u8>() {
            if num == NSEC3_SHA1 {
                Ok(num)
            } else {
                Err(Error::from("unknown algorithm number"))
            }
        } else if arg.eq_ignore_ascii_case("SHA-1") || arg.eq_ignore_ascii_case("SHA1") {
            Ok(NSEC3_SHA1)
        } else {
            Err(Error::from("unknown algorithm mnemonic"))
        }
    }
}

impl Nsec3Hash {
    pub fn execute(self, env: impl Env) -> Result<(), Error> {
        let hash = hash_to_string(&self.name, &self.salt, self.iterations);
        writeln!(env.stdout(), "{hash}.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::env::fake::FakeCmd;

    #[test]
    fn rfc5155_vectors() {
        let cmd = FakeCmd::new(["dnssign", "nsec3-hash", "-i", "12", "-s", "aabbccdd"]);

        let res = cmd.args(["example"]).run();
        assert_eq!(res.exit_code, 0);
        assert_eq!(res.stdout, "0p9mhaveqvm6t7vbl5lop2u3t2rp3tom.\n");

        let res = cmd.args(["A.EXAMPLE."]).run();
        assert_eq!(res.stdout, "35mthgpgcu1qg68fab165klnsnk3dpvl.\n");
    }

    #[test]
    fn ldns_style_iterations_alias() {
        let res = FakeCmd::new(["dnssign", "nsec3-hash", "-t", "12", "-s", "AABBCCDD", "example"])
            .run();
        assert_eq!(res.stdout, "0p9mhaveqvm6t7vbl5lop2u3t2rp3tom.\n");
    }

    #[test]
    fn bad_arguments() {
        let cmd = FakeCmd::new(["dnssign", "nsec3-hash"]);
        assert!(cmd.args(["-a", "2", "example."]).parse().is_err());
        assert!(cmd.args(["-a", "md5", "example."]).parse().is_err());
        assert!(cmd.args(["-s", "xyz", "example."]).parse().is_err());
        assert!(cmd.args(["-i", "-1", "example."]).parse().is_err());
        assert!(cmd.args(["-a", "sha-1", "example."]).parse().is_ok());
        assert!(cmd.args(["-a", "1", "example."]).parse().is_ok());
    }
}
