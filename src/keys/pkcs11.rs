//! Keys held by a PKCS#11 module.
//!
//! Keys are token objects carrying the configured label. Their `CKA_ID`
//! holds the role and the expiry as `<role>:<unix seconds>` so that a later
//! run finds the key that is still current.

use std::path::Path;
use std::sync::Mutex;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use cryptoki::context::{CInitializeArgs, Pkcs11};
use cryptoki::mechanism::Mechanism;
use cryptoki::object::{Attribute, AttributeType, ObjectClass, ObjectHandle};
use cryptoki::session::{Session, UserType};
use cryptoki::types::AuthPin;
use ring::digest;
use tracing::{debug, info, warn};

use super::{rsa_dnskey_public_key, KeyHandle, KeyRole, KeySession, SignAlgorithm, SigningKey};
use crate::config::SignConfig;
use crate::error::{Error, Result};

/// DER encoded OID of the P-256 curve, as `CKA_EC_PARAMS` wants it.
const P256_PARAMS: &[u8] = &[0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07];

const RSA_MODULUS_BITS: u64 = 2048;

//------------ Pkcs11Session -------------------------------------------------

pub struct Pkcs11Session {
    /// The logged in session, `None` once ended.
    session: Option<Mutex<Session>>,

    /// Kept so the module stays loaded for as long as the session.
    _module: Pkcs11,

    label: String,
    algorithm: SignAlgorithm,
    zsk_expiration: DateTime<Utc>,
    ksk_expiration: DateTime<Utc>,
    inception: DateTime<Utc>,

    /// Private key objects by [`KeyHandle`].
    keys: Vec<(KeyRole, ObjectHandle)>,
}

/// A key object found on the token.
struct StoredKey {
    private: ObjectHandle,
    public: ObjectHandle,
    expiry: i64,
}

impl Pkcs11Session {
    /// Load the module, log into the first slot with a token and, with
    /// `create_keys` set, outdate the keys currently stored.
    ///
    /// The PIN never appears in error messages.
    pub fn open(
        module_path: &Path,
        user_pin: &str,
        label: &str,
        config: &SignConfig,
    ) -> Result<Self> {
        if config.algorithm == SignAlgorithm::Ed25519 {
            return Err(Error::key(
                "Ed25519 keys are not supported with PKCS#11 modules",
            ));
        }

        let module = Pkcs11::new(module_path).map_err(|err| {
            Error::session(format!(
                "cannot load PKCS#11 module '{}': {err}",
                module_path.display()
            ))
        })?;
        module.initialize(CInitializeArgs::OsThreads).map_err(|err| {
            Error::session(format!(
                "cannot initialize PKCS#11 module '{}': {err} \
                 (check that the module's token database is readable and writable)",
                module_path.display()
            ))
        })?;

        let slot = module
            .get_slots_with_token()
            .map_err(|err| Error::session(format!("cannot list PKCS#11 slots: {err}")))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::session("no PKCS#11 slot with a token available"))?;
        let session = module
            .open_rw_session(slot)
            .map_err(|err| Error::session(format!("cannot open PKCS#11 session: {err}")))?;
        session
            .login(UserType::User, Some(&AuthPin::new(user_pin.into())))
            .map_err(|err| Error::session(format!("PKCS#11 login failed: {err}")))?;
        debug!("logged into PKCS#11 slot {slot}");

        let mut this = Self {
            session: Some(Mutex::new(session)),
            _module: module,
            label: label.into(),
            algorithm: config.algorithm,
            zsk_expiration: config.zsk_expiration,
            ksk_expiration: config.ksk_expiration,
            inception: config.inception,
            keys: Vec::new(),
        };
        if config.create_keys {
            this.outdate_keys()?;
        }
        Ok(this)
    }

    fn with_session<T>(&self, op: impl FnOnce(&Session) -> Result<T>) -> Result<T> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| Error::session("key session has already ended"))?;
        let guard = session.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        op(&guard)
    }

    /// Set the expiry of every key with our label to now.
    fn outdate_keys(&mut self) -> Result<()> {
        let now = self.inception.timestamp();
        let label = self.label.clone();
        self.with_session(|session| {
            let objects = session
                .find_objects(&[Attribute::Label(label.clone().into_bytes())])
                .map_err(|err| Error::key(format!("cannot list keys: {err}")))?;
            for object in objects {
                let Some((role, _)) = read_id(session, object)? else {
                    continue;
                };
                session
                    .update_attributes(object, &[Attribute::Id(make_id(role, now))])
                    .map_err(|err| Error::key(format!("cannot outdate {role}: {err}")))?;
            }
            Ok(())
        })?;
        info!("outdated existing keys labelled '{}'", self.label);
        Ok(())
    }

    /// The current key of `role`: unexpired with the latest expiry.
    fn find(&self, role: KeyRole) -> Result<Option<StoredKey>> {
        let now = self.inception.timestamp();
        self.with_session(|session| {
            let template = [
                Attribute::Label(self.label.clone().into_bytes()),
                Attribute::Class(ObjectClass::PRIVATE_KEY),
            ];
            let mut best: Option<StoredKey> = None;
            for private in session
                .find_objects(&template)
                .map_err(|err| Error::key(format!("cannot list keys: {err}")))?
            {
                let Some((found_role, expiry)) = read_id(session, private)? else {
                    continue;
                };
                if found_role != role || expiry <= now {
                    continue;
                }
                if best.as_ref().is_some_and(|best| best.expiry >= expiry) {
                    continue;
                }
                let public = session
                    .find_objects(&[
                        Attribute::Label(self.label.clone().into_bytes()),
                        Attribute::Class(ObjectClass::PUBLIC_KEY),
                        Attribute::Id(make_id(role, expiry)),
                    ])
                    .map_err(|err| Error::key(format!("cannot list keys: {err}")))?
                    .into_iter()
                    .next();
                match public {
                    Some(public) => {
                        best = Some(StoredKey {
                            private,
                            public,
                            expiry,
                        })
                    }
                    None => warn!("{role} without public key object on the token, skipped"),
                }
            }
            Ok(best)
        })
    }

    fn generate(&self, role: KeyRole, expiration: DateTime<Utc>) -> Result<StoredKey> {
        let expiry = expiration.timestamp();
        let id = make_id(role, expiry);
        let label = self.label.clone().into_bytes();
        self.with_session(|session| {
            let common = [
                Attribute::Token(true),
                Attribute::Label(label.clone()),
                Attribute::Id(id.clone()),
            ];
            let (mechanism, mut public_template) = match self.algorithm {
                SignAlgorithm::RsaSha256 => (
                    Mechanism::RsaPkcsKeyPairGen,
                    vec![
                        Attribute::ModulusBits(RSA_MODULUS_BITS.into()),
                        Attribute::PublicExponent(vec![0x01, 0x00, 0x01]),
                    ],
                ),
                SignAlgorithm::EcdsaP256Sha256 => (
                    Mechanism::EccKeyPairGen,
                    vec![Attribute::EcParams(P256_PARAMS.to_vec())],
                ),
                SignAlgorithm::Ed25519 => {
                    return Err(Error::key("Ed25519 keys are not supported with PKCS#11"))
                }
            };
            public_template.extend(common.iter().cloned());
            public_template.push(Attribute::Verify(true));

            let mut private_template = common.to_vec();
            private_template.extend([
                Attribute::Private(true),
                Attribute::Sensitive(true),
                Attribute::Extractable(false),
                Attribute::Sign(true),
            ]);

            let (public, private) = session
                .generate_key_pair(&mechanism, &public_template, &private_template)
                .map_err(|err| Error::key(format!("cannot generate {role}: {err}")))?;
            Ok(StoredKey {
                private,
                public,
                expiry,
            })
        })
    }

    fn public_key(&self, object: ObjectHandle) -> Result<Bytes> {
        self.with_session(|session| match self.algorithm {
            SignAlgorithm::RsaSha256 => {
                let attrs = session
                    .get_attributes(object, &[AttributeType::Modulus, AttributeType::PublicExponent])
                    .map_err(|err| Error::key(format!("cannot read public key: {err}")))?;
                let mut modulus = None;
                let mut exponent = None;
                for attr in attrs {
                    match attr {
                        Attribute::Modulus(m) => modulus = Some(m),
                        Attribute::PublicExponent(e) => exponent = Some(e),
                        _ => {}
                    }
                }
                match (modulus, exponent) {
                    (Some(m), Some(e)) => Ok(rsa_dnskey_public_key(&m, &e)),
                    _ => Err(Error::key("RSA public key attributes missing")),
                }
            }
            _ => {
                let point = session
                    .get_attributes(object, &[AttributeType::EcPoint])
                    .map_err(|err| Error::key(format!("cannot read public key: {err}")))?
                    .into_iter()
                    .find_map(|attr| match attr {
                        Attribute::EcPoint(point) => Some(point),
                        _ => None,
                    })
                    .ok_or_else(|| Error::key("EC point attribute missing"))?;
                ec_point_to_dnskey(&point)
            }
        })
    }

    fn retrieve_or_create(&mut self, role: KeyRole, create_if_missing: bool) -> Result<SigningKey> {
        let stored = match self.find(role)? {
            Some(stored) => {
                debug!("found {role} on the token");
                stored
            }
            None if create_if_missing => {
                let expiration = match role {
                    KeyRole::Zsk => self.zsk_expiration,
                    KeyRole::Ksk => self.ksk_expiration,
                };
                let stored = self.generate(role, expiration)?;
                info!("generated new {role} labelled '{}'", self.label);
                stored
            }
            None => {
                return Err(Error::key(format!(
                    "no current {role} labelled '{}' and key creation is disabled",
                    self.label
                )))
            }
        };

        let public_key = self.public_key(stored.public)?;
        let expiration = DateTime::from_timestamp(stored.expiry, 0)
            .ok_or_else(|| Error::key(format!("{role} has an invalid expiry")))?;
        let handle = KeyHandle(self.keys.len());
        self.keys.push((role, stored.private));
        Ok(SigningKey::new(
            role,
            self.algorithm,
            public_key,
            expiration,
            handle,
        ))
    }
}

impl KeySession for Pkcs11Session {
    fn retrieve_or_create_zsk(&mut self, create_if_missing: bool) -> Result<SigningKey> {
        self.retrieve_or_create(KeyRole::Zsk, create_if_missing)
    }

    fn retrieve_or_create_ksk(&mut self, create_if_missing: bool) -> Result<SigningKey> {
        self.retrieve_or_create(KeyRole::Ksk, create_if_missing)
    }

    fn sign(&self, data: &[u8], key: &SigningKey) -> Result<Bytes> {
        let (_, private) = self
            .keys
            .get(key.handle().0)
            .filter(|(role, _)| *role == key.role)
            .copied()
            .ok_or_else(|| Error::sign(format!("unknown {} handle", key.role)))?;
        self.with_session(|session| {
            let signature = match key.algorithm {
                SignAlgorithm::RsaSha256 => session.sign(&Mechanism::Sha256RsaPkcs, private, data),
                SignAlgorithm::EcdsaP256Sha256 => {
                    let hashed = digest::digest(&digest::SHA256, data);
                    // CKM_ECDSA signs a prehashed message.
                    session.sign(&Mechanism::Ecdsa, private, hashed.as_ref())
                }
                SignAlgorithm::Ed25519 => {
                    return Err(Error::sign("Ed25519 is not supported with PKCS#11"))
                }
            };
            signature
                .map(Bytes::from)
                .map_err(|err| Error::sign(format!("PKCS#11 signing failed: {err}")))
        })
    }

    fn end(&mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            let session = session.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
            self.keys.clear();
            session
                .logout()
                .map_err(|err| Error::session(format!("PKCS#11 logout failed: {err}")))?;
            debug!("PKCS#11 session ended");
        }
        Ok(())
    }
}

impl Drop for Pkcs11Session {
    fn drop(&mut self) {
        if let Err(err) = self.end() {
            warn!("{err}");
        }
    }
}

//------------ Helpers -------------------------------------------------------

fn make_id(role: KeyRole, expiry: i64) -> Vec<u8> {
    format!("{}:{expiry}", role.as_str()).into_bytes()
}

fn parse_id(id: &[u8]) -> Option<(KeyRole, i64)> {
    let id = std::str::from_utf8(id).ok()?;
    let (role, expiry) = id.split_once(':')?;
    let role = match role {
        "zsk" => KeyRole::Zsk,
        "ksk" => KeyRole::Ksk,
        _ => return None,
    };
    Some((role, expiry.parse().ok()?))
}

/// The role and expiry stored in an object's ID, if it is one of ours.
fn read_id(session: &Session, object: ObjectHandle) -> Result<Option<(KeyRole, i64)>> {
    let attrs = session
        .get_attributes(object, &[AttributeType::Id])
        .map_err(|err| Error::key(format!("cannot read key ID: {err}")))?;
    Ok(attrs.into_iter().find_map(|attr| match attr {
        Attribute::Id(id) => parse_id(&id),
        _ => None,
    }))
}

/// Turn a `CKA_EC_POINT` into the DNSKEY public key of algorithm 13.
///
/// Modules return the point wrapped in a DER octet string, some without.
fn ec_point_to_dnskey(point: &[u8]) -> Result<Bytes> {
    let raw = match point {
        [0x04, 0x41, rest @ ..] if rest.len() == 65 => rest,
        _ => point,
    };
    match raw {
        [0x04, xy @ ..] if xy.len() == 64 => Ok(Bytes::copy_from_slice(xy)),
        _ => Err(Error::key("unexpected EC point format")),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use ring::signature::{UnparsedPublicKey, ECDSA_P256_SHA256_FIXED};

    use super::*;
    use crate::config::BackendConfig;
    use crate::env::fake::{FakeCmd, FakeEnv};
    use crate::keys::open_session;

    #[test]
    fn ids_round_trip() {
        let id = make_id(KeyRole::Ksk, 1_740_830_400);
        assert_eq!(id, b"ksk:1740830400");
        assert_eq!(parse_id(&id), Some((KeyRole::Ksk, 1_740_830_400)));
        assert_eq!(parse_id(b"other"), None);
        assert_eq!(parse_id(b"csk:1"), None);
    }

    #[test]
    fn ec_points() {
        let mut point = vec![0x04, 0x41, 0x04];
        point.extend_from_slice(&[7; 64]);
        assert_eq!(ec_point_to_dnskey(&point).unwrap().len(), 64);
        assert_eq!(ec_point_to_dnskey(&point[2..]).unwrap().len(), 64);
        assert!(ec_point_to_dnskey(&[0x04, 1, 2]).is_err());
    }

    /// Runs against an initialized SoftHSM2 token. `DNSSIGN_PKCS11_MODULE`
    /// names the module, `DNSSIGN_PKCS11_PIN` the user PIN.
    #[ignore = "should only be run if SoftHSM2 is installed and a token is initialized"]
    #[test]
    fn softhsm_session() {
        let module_path = std::env::var("DNSSIGN_PKCS11_MODULE")
            .unwrap_or_else(|_| "/usr/lib/softhsm/libsofthsm2.so".into());
        let user_pin = std::env::var("DNSSIGN_PKCS11_PIN").unwrap_or_else(|_| "1234".into());
        let key_label = format!("dnssign-test-{}", std::process::id());
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let mut config = SignConfig {
            zone: "example.com.".parse().unwrap(),
            file_path: "example.com.zone".into(),
            output_path: "example.com-signed.zone".into(),
            create_keys: true,
            nsec3: false,
            opt_out: false,
            nsec3_iterations: 0,
            nsec3_salt_length: 8,
            digest: false,
            info: false,
            update_serial: true,
            algorithm: SignAlgorithm::EcdsaP256Sha256,
            inception: now,
            zsk_expiration: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            ksk_expiration: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            rrsig_expiration: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            backend: BackendConfig::Pkcs11 {
                module_path: module_path.into(),
                user_pin,
                key_label,
            },
        };
        let env = || FakeEnv::from(FakeCmd::new(["dnssign"]));

        let mut session = open_session(env(), &config).unwrap();
        let zsk = session.retrieve_or_create_zsk(true).unwrap();
        let ksk = session.retrieve_or_create_ksk(true).unwrap();
        assert_eq!(zsk.flags(), 256);
        assert_eq!(ksk.flags(), 257);
        assert_eq!(zsk.public_key.len(), 64);
        assert_ne!(zsk.public_key, ksk.public_key);
        assert_eq!(zsk.expiration, config.zsk_expiration);

        let data = b"signed data";
        for key in [&zsk, &ksk] {
            let sig = session.sign(data, key).unwrap();
            assert_eq!(sig.len(), 64);
            let mut point = vec![0x04];
            point.extend_from_slice(&key.public_key);
            UnparsedPublicKey::new(&ECDSA_P256_SHA256_FIXED, &point)
                .verify(data, &sig)
                .unwrap();
        }
        session.end().unwrap();
        session.end().unwrap();
        assert!(session.sign(data, &zsk).is_err());

        // A second run finds the stored keys.
        config.create_keys = false;
        let mut session = open_session(env(), &config).unwrap();
        let zsk2 = session.retrieve_or_create_zsk(false).unwrap();
        let ksk2 = session.retrieve_or_create_ksk(false).unwrap();
        assert_eq!(zsk2.public_key, zsk.public_key);
        assert_eq!(ksk2.key_tag(), ksk.key_tag());
        session.end().unwrap();
    }
}
