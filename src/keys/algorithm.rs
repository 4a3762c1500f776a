//! The signing algorithms.

use std::fmt;
use std::str::FromStr;

use ring::digest;

use crate::error::Error;

/// A DNSSEC signing algorithm supported by the key backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignAlgorithm {
    /// RSA/SHA-256, algorithm 8.
    RsaSha256,

    /// ECDSA P-256 with SHA-256, algorithm 13.
    EcdsaP256Sha256,

    /// Ed25519, algorithm 15.
    Ed25519,
}

/// The names accepted on the command line, besides mnemonics and numbers.
const REGISTRY: &[(&str, SignAlgorithm)] = &[
    ("rsa", SignAlgorithm::RsaSha256),
    ("ecdsa", SignAlgorithm::EcdsaP256Sha256),
    ("ed25519", SignAlgorithm::Ed25519),
];

impl SignAlgorithm {
    pub const ALL: [SignAlgorithm; 3] = [
        SignAlgorithm::RsaSha256,
        SignAlgorithm::EcdsaP256Sha256,
        SignAlgorithm::Ed25519,
    ];

    /// The DNSSEC algorithm number.
    pub fn number(self) -> u8 {
        match self {
            SignAlgorithm::RsaSha256 => 8,
            SignAlgorithm::EcdsaP256Sha256 => 13,
            SignAlgorithm::Ed25519 => 15,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            SignAlgorithm::RsaSha256 => "RSASHA256",
            SignAlgorithm::EcdsaP256Sha256 => "ECDSAP256SHA256",
            SignAlgorithm::Ed25519 => "ED25519",
        }
    }

    /// The digest applied to the signed data before the private key
    /// operation, if the algorithm uses a separate one.
    ///
    /// Backends that only offer raw signing mechanisms hash with this first.
    pub fn digest(self) -> Option<&'static digest::Algorithm> {
        match self {
            SignAlgorithm::RsaSha256 | SignAlgorithm::EcdsaP256Sha256 => Some(&digest::SHA256),
            SignAlgorithm::Ed25519 => None,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.number() == number)
    }
}

impl FromStr for SignAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let found = REGISTRY
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, alg)| *alg)
            .or_else(|| {
                Self::ALL
                    .into_iter()
                    .find(|alg| alg.mnemonic().eq_ignore_ascii_case(s))
            })
            .or_else(|| s.parse().ok().and_then(Self::from_number));
        found.ok_or_else(|| Error::config(format!("unknown signing algorithm '{s}'")))
    }
}

impl fmt::Display for SignAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn registry_lookup() {
        assert_eq!("rsa".parse::<SignAlgorithm>().unwrap().number(), 8);
        assert_eq!("ECDSA".parse::<SignAlgorithm>().unwrap().number(), 13);
        assert_eq!("ed25519".parse::<SignAlgorithm>().unwrap().number(), 15);
        assert_eq!(
            "ecdsap256sha256".parse::<SignAlgorithm>().unwrap(),
            SignAlgorithm::EcdsaP256Sha256
        );
        assert_eq!(
            "8".parse::<SignAlgorithm>().unwrap(),
            SignAlgorithm::RsaSha256
        );
    }

    #[test]
    fn unknown_algorithm_is_config_error() {
        let err = "dsa".parse::<SignAlgorithm>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("dsa"));
        assert!("5".parse::<SignAlgorithm>().is_err());
    }
}
