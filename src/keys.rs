//! Key storage backends.
//!
//! The signer only talks to a [`KeySession`]. A session hands out
//! [`SigningKey`]s, which carry the public half of a key and an opaque
//! handle the session uses to find the private half again when signing.

mod algorithm;
pub mod file;
#[cfg(feature = "pkcs11")]
pub mod pkcs11;

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};

pub use self::algorithm::SignAlgorithm;
use crate::config::{BackendConfig, SignConfig};
use crate::env::Env;
use crate::error::Result;
use crate::record::rdata::{Dnskey, DNSKEY_SEP, DNSKEY_ZONE};

//------------ KeyRole -------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyRole {
    Zsk,
    Ksk,
}

impl KeyRole {
    /// The DNSKEY flags for keys of this role.
    pub fn flags(self) -> u16 {
        match self {
            KeyRole::Zsk => DNSKEY_ZONE,
            KeyRole::Ksk => DNSKEY_ZONE | DNSKEY_SEP,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KeyRole::Zsk => "zsk",
            KeyRole::Ksk => "ksk",
        }
    }
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KeyRole::Zsk => "ZSK",
            KeyRole::Ksk => "KSK",
        })
    }
}

//------------ SigningKey ----------------------------------------------------

/// Identifies the private key inside the session that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyHandle(pub(crate) usize);

/// A key as handed out by a [`KeySession`].
#[derive(Clone, Debug)]
pub struct SigningKey {
    pub role: KeyRole,
    pub algorithm: SignAlgorithm,

    /// The public key in DNSKEY format.
    pub public_key: Bytes,

    /// When signatures made with this key must expire at the latest.
    pub expiration: DateTime<Utc>,

    handle: KeyHandle,
}

impl SigningKey {
    pub fn new(
        role: KeyRole,
        algorithm: SignAlgorithm,
        public_key: Bytes,
        expiration: DateTime<Utc>,
        handle: KeyHandle,
    ) -> Self {
        Self {
            role,
            algorithm,
            public_key,
            expiration,
            handle,
        }
    }

    pub fn handle(&self) -> KeyHandle {
        self.handle
    }

    pub fn flags(&self) -> u16 {
        self.role.flags()
    }

    /// The DNSKEY record data for this key.
    pub fn dnskey(&self) -> Dnskey {
        Dnskey {
            flags: self.flags(),
            protocol: 3,
            algorithm: self.algorithm.number(),
            public_key: self.public_key.clone(),
        }
    }

    pub fn key_tag(&self) -> u16 {
        self.dnskey().key_tag()
    }
}

//------------ KeySession ----------------------------------------------------

/// An open connection to a key backend.
///
/// Sessions are opened once per run. [`KeySession::end`] releases the
/// backend and may be called more than once; implementations also call it
/// when dropped so that error paths release the backend too.
pub trait KeySession: Send + Sync {
    /// The zone signing key, creating one if there is none and
    /// `create_if_missing` is set.
    fn retrieve_or_create_zsk(&mut self, create_if_missing: bool) -> Result<SigningKey>;

    /// The key signing key, creating one if there is none and
    /// `create_if_missing` is set.
    fn retrieve_or_create_ksk(&mut self, create_if_missing: bool) -> Result<SigningKey>;

    /// Sign `data` with the private half of `key`.
    ///
    /// The result is in the format of the RRSIG signature field.
    fn sign(&self, data: &[u8], key: &SigningKey) -> Result<Bytes>;

    /// Release the backend.
    fn end(&mut self) -> Result<()>;
}

/// Open the backend selected by `config`.
pub fn open_session(env: impl Env, config: &SignConfig) -> Result<Box<dyn KeySession>> {
    match &config.backend {
        BackendConfig::File { zsk_path, ksk_path } => {
            let session = file::FileSession::open(
                env.in_cwd(zsk_path).into_owned(),
                env.in_cwd(ksk_path).into_owned(),
                config,
            )?;
            Ok(Box::new(session))
        }
        #[cfg(feature = "pkcs11")]
        BackendConfig::Pkcs11 {
            module_path,
            user_pin,
            key_label,
        } => {
            let session = pkcs11::Pkcs11Session::open(
                &env.in_cwd(module_path),
                user_pin,
                key_label,
                config,
            )?;
            Ok(Box::new(session))
        }
        #[cfg(not(feature = "pkcs11"))]
        BackendConfig::Pkcs11 { .. } => Err(crate::error::Error::config(
            "this build does not include PKCS#11 support",
        )),
    }
}

/// Encode an RSA public key in the DNSKEY format of RFC 3110.
pub(crate) fn rsa_dnskey_public_key(modulus: &[u8], exponent: &[u8]) -> Bytes {
    let modulus = strip_leading_zeros(modulus);
    let exponent = strip_leading_zeros(exponent);
    let mut key = Vec::with_capacity(3 + exponent.len() + modulus.len());
    if exponent.len() <= 255 {
        key.push(exponent.len() as u8);
    } else {
        key.push(0);
        key.extend_from_slice(&(exponent.len() as u16).to_be_bytes());
    }
    key.extend_from_slice(exponent);
    key.extend_from_slice(modulus);
    key.into()
}

fn strip_leading_zeros(mut value: &[u8]) -> &[u8] {
    while let [0, rest @ ..] = value {
        value = rest;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsa_public_key_format() {
        let key = rsa_dnskey_public_key(&[0, 0xc1, 0x02], &[0x01, 0x00, 0x01]);
        assert_eq!(key.as_ref(), [3, 1, 0, 1, 0xc1, 0x02]);

        let long_exponent = vec![1; 256];
        let key = rsa_dnskey_public_key(&[0xaa], &long_exponent);
        assert_eq!(&key[..3], [0, 1, 0]);
        assert_eq!(key.len(), 3 + 256 + 1);
    }

    #[test]
    fn roles() {
        assert_eq!(KeyRole::Zsk.flags(), 256);
        assert_eq!(KeyRole::Ksk.flags(), 257);
    }
}
