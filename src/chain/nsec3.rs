//! The NSEC3 chain.
//!
//! Owner names are hashed with a per-zone salt. Should two distinct names
//! hash to the same value the chain cannot be built, so a new salt is drawn
//! and everything is hashed again, up to [`MAX_SALT_ATTEMPTS`] times.

use std::collections::{BTreeMap, BTreeSet};

use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use tracing::{debug, warn};

use super::OwnerInfo;
use crate::error::{Error, Result};
use crate::record::rdata::{base32hex, Nsec3, Nsec3param, NSEC3_OPT_OUT, NSEC3_SHA1};
use crate::record::{Class, Name, OrderedZone, Record, RecordData, Rtype, TypeBitmap};

/// How often a salt is drawn before giving up on hash collisions.
pub const MAX_SALT_ATTEMPTS: usize = 8;

//------------ Nsec3Config ---------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nsec3Config {
    pub iterations: u16,
    pub salt_length: u8,
    pub opt_out: bool,
}

impl Default for Nsec3Config {
    fn default() -> Self {
        Self {
            iterations: 0,
            salt_length: 8,
            opt_out: false,
        }
    }
}

//------------ OwnerHasher ---------------------------------------------------

/// Computes the hashed owner name of RFC 5155, section 5.
pub trait OwnerHasher {
    fn hash(&self, name: &Name, salt: &[u8], iterations: u16) -> Vec<u8>;
}

/// The SHA-1 hash, the only algorithm defined for NSEC3.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha1Hasher;

impl OwnerHasher for Sha1Hasher {
    fn hash(&self, name: &Name, salt: &[u8], iterations: u16) -> Vec<u8> {
        let mut ctx = digest::Context::new(&digest::SHA1_FOR_LEGACY_USE_ONLY);
        ctx.update(&name.to_canonical_wire());
        ctx.update(salt);
        let mut hash = ctx.finish();
        for _ in 0..iterations {
            let mut ctx = digest::Context::new(&digest::SHA1_FOR_LEGACY_USE_ONLY);
            ctx.update(hash.as_ref());
            ctx.update(salt);
            hash = ctx.finish();
        }
        hash.as_ref().to_vec()
    }
}

/// The NSEC3 hash of `name` in presentation format.
pub fn hash_to_string(name: &Name, salt: &[u8], iterations: u16) -> String {
    base32hex(&Sha1Hasher.hash(name, salt, iterations))
}

//------------ SaltSource ----------------------------------------------------

/// Provides salts for the NSEC3 chain.
pub trait SaltSource {
    fn salt(&mut self, len: u8) -> Result<Vec<u8>>;
}

/// Random salts from the system random number generator.
pub struct RandomSalt {
    rng: SystemRandom,
}

impl RandomSalt {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl Default for RandomSalt {
    fn default() -> Self {
        Self::new()
    }
}

impl SaltSource for RandomSalt {
    fn salt(&mut self, len: u8) -> Result<Vec<u8>> {
        let mut salt = vec![0; usize::from(len)];
        self.rng
            .fill(&mut salt)
            .map_err(|_| Error::from("cannot generate a random salt"))?;
        Ok(salt)
    }
}

//------------ Nsec3Chain ----------------------------------------------------

/// A generated NSEC3 chain.
#[derive(Debug)]
pub struct Nsec3Chain {
    /// The NSEC3 records in hash order followed by the NSEC3PARAM record.
    pub records: Vec<Record>,

    /// The salt that was eventually used.
    pub salt: Vec<u8>,

    /// How many salts were tried.
    pub attempts: usize,
}

//------------ Nsec3Builder --------------------------------------------------

pub struct Nsec3Builder<'a, H, S> {
    config: &'a Nsec3Config,
    hasher: &'a H,
    salts: S,
}

/// A name in the chain before hashing.
struct ChainName {
    name: Name,
    types: TypeBitmap,
}

impl<'a, H: OwnerHasher, S: SaltSource> Nsec3Builder<'a, H, S> {
    pub fn new(config: &'a Nsec3Config, hasher: &'a H, salts: S) -> Self {
        Self {
            config,
            hasher,
            salts,
        }
    }

    /// Build the chain for `zone`.
    ///
    /// Fails with a collision error if every salt attempt produced a
    /// collision, or right away if the salt is empty since it can never
    /// change.
    pub fn generate(mut self, zone: &OrderedZone, ttl: u32) -> Result<Nsec3Chain> {
        let names = self.chain_names(zone);
        let apex = zone.apex();
        let class = zone.soa().map_or(Class::IN, |soa| soa.class);

        for attempt in 1..=MAX_SALT_ATTEMPTS {
            let salt = self.salts.salt(self.config.salt_length)?;
            match self.hash_all(&names, &salt) {
                Ok(hashed) => {
                    debug!(
                        "hashed {} names with salt {} after {attempt} attempt(s)",
                        hashed.len(),
                        hex::encode(&salt)
                    );
                    let records = self.build(hashed, apex, class, ttl, &salt)?;
                    return Ok(Nsec3Chain {
                        records,
                        salt,
                        attempts: attempt,
                    });
                }
                Err((first, second)) => {
                    if salt.is_empty() {
                        return Err(Error::collision(format!(
                            "NSEC3 hashes of '{first}' and '{second}' collide and an empty salt cannot be changed"
                        )));
                    }
                    warn!(
                        "NSEC3 hashes of '{first}' and '{second}' collide, retrying with a new salt (attempt {attempt} of {MAX_SALT_ATTEMPTS})"
                    );
                }
            }
        }
        Err(Error::collision(format!(
            "NSEC3 hash collisions persisted after {MAX_SALT_ATTEMPTS} salts"
        )))
    }

    /// The names to hash: owners and empty non-terminals.
    ///
    /// With opt-out, unsigned delegations are left out and so are empty
    /// non-terminals that only exist because of them.
    fn chain_names(&self, zone: &OrderedZone) -> Vec<ChainName> {
        let apex = zone.apex();
        let owners: Vec<OwnerInfo<'_>> = super::owners(zone)
            .into_iter()
            .filter(|owner| !(self.config.opt_out && owner.is_unsigned_delegation()))
            .collect();

        let present: BTreeSet<&Name> = owners.iter().map(|o| o.name).collect();
        let mut empty_non_terminals = BTreeSet::new();
        for owner in &owners {
            let mut parent = owner.name.parent();
            while let Some(name) = parent {
                if !name.is_below(apex) {
                    break;
                }
                if !present.contains(&name) {
                    empty_non_terminals.insert(name.clone());
                }
                parent = name.parent();
            }
        }

        let mut names: Vec<ChainName> = owners
            .into_iter()
            .map(|owner| {
                let mut types = owner.types.clone();
                if owner.has_signed_rrsets() {
                    types.insert(Rtype::RRSIG);
                }
                if owner.name == apex {
                    types.insert(Rtype::NSEC3PARAM);
                }
                ChainName {
                    name: owner.name.clone(),
                    types,
                }
            })
            .collect();
        names.extend(empty_non_terminals.into_iter().map(|name| ChainName {
            name,
            types: TypeBitmap::new(),
        }));
        names
    }

    /// Hash every name, returning the names of a colliding pair on failure.
    fn hash_all<'n>(
        &self,
        names: &'n [ChainName],
        salt: &[u8],
    ) -> std::result::Result<BTreeMap<Vec<u8>, &'n ChainName>, (Name, Name)> {
        let mut hashed = BTreeMap::new();
        for entry in names {
            let hash = self
                .hasher
                .hash(&entry.name, salt, self.config.iterations);
            if let Some(other) = hashed.insert(hash, entry) {
                return Err((other.name.clone(), entry.name.clone()));
            }
        }
        Ok(hashed)
    }

    fn build(
        &self,
        hashed: BTreeMap<Vec<u8>, &ChainName>,
        apex: &Name,
        class: Class,
        ttl: u32,
        salt: &[u8],
    ) -> Result<Vec<Record>> {
        let flags = if self.config.opt_out { NSEC3_OPT_OUT } else { 0 };
        let hashes: Vec<&Vec<u8>> = hashed.keys().collect();

        let mut records = Vec::with_capacity(hashed.len() + 1);
        for (i, (hash, entry)) in hashed.iter().enumerate() {
            let next = hashes[(i + 1) % hashes.len()];
            let owner = apex.prepend(base32hex(hash).as_bytes())?;
            records.push(Record::new(
                owner,
                ttl,
                class,
                Rtype::NSEC3,
                RecordData::Nsec3(Nsec3 {
                    hash_algorithm: NSEC3_SHA1,
                    flags,
                    iterations: self.config.iterations,
                    salt: salt.to_vec(),
                    next_owner: next.clone(),
                    types: entry.types.clone(),
                }),
            ));
        }
        records.push(Record::new(
            apex.clone(),
            ttl,
            class,
            Rtype::NSEC3PARAM,
            RecordData::Nsec3param(Nsec3param {
                hash_algorithm: NSEC3_SHA1,
                flags: 0,
                iterations: self.config.iterations,
                salt: salt.to_vec(),
            }),
        ));
        Ok(records)
    }
}

//============ Tests =========================================================
