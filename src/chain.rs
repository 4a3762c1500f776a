//! Authenticated denial of existence.
//!
//! Both chains are computed from an [`OrderedZone`] and then merged back
//! into it. The zone must already contain every record that is going to be
//! signed, including the DNSKEY RRset, so the type bitmaps are complete.

pub mod nsec;
pub mod nsec3;

use std::collections::HashMap;

use tracing::info;

use crate::error::{Error, Result};
use crate::record::{Name, OrderedZone, Rtype, TypeBitmap};

pub use self::nsec3::{Nsec3Config, OwnerHasher, RandomSalt, SaltSource, Sha1Hasher};

//------------ Denial --------------------------------------------------------

/// The kind of denial of existence to generate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Denial {
    Nsec,
    Nsec3(Nsec3Config),
}

/// Generate the chain selected by `denial` and add it to `zone`.
///
/// Returns the number of records added.
pub fn add_chain(zone: &mut OrderedZone, denial: &Denial) -> Result<usize> {
    let ttl = denial_ttl(zone)?;
    let records = match denial {
        Denial::Nsec => nsec::generate(zone, ttl),
        Denial::Nsec3(config) => {
            let chain =
                nsec3::Nsec3Builder::new(config, &Sha1Hasher, RandomSalt::new()).generate(zone, ttl)?;
            chain.records
        }
    };
    let count = records.len();
    zone.extend(records);
    info!("added {count} denial of existence records");
    Ok(count)
}

/// The TTL for NSEC, NSEC3 and NSEC3PARAM records.
///
/// RFC 9077: the lower of the SOA MINIMUM field and the SOA TTL.
pub fn denial_ttl(zone: &OrderedZone) -> Result<u32> {
    let soa = zone
        .soa()
        .ok_or_else(|| Error::parse("zone has no SOA record"))?;
    let minimum = soa.data.as_soa().map_or(soa.ttl, |data| data.minimum);
    Ok(minimum.min(soa.ttl))
}

//------------ NameKind ------------------------------------------------------

/// The role a name plays with respect to zone cuts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameKind {
    /// Authoritative data, including the apex.
    Authoritative,

    /// A delegation point: a non-apex name with NS records.
    Delegation { has_ds: bool },

    /// Below a delegation point, glue or occluded data.
    Occluded,
}

impl NameKind {
    /// Whether an RRset of the given type at a name of this kind is signed.
    ///
    /// RFC 4035, section 2.2: at a delegation point only DS and the denial
    /// records are authoritative.
    pub fn is_signed(self, rtype: Rtype) -> bool {
        match self {
            NameKind::Authoritative => rtype != Rtype::RRSIG,
            NameKind::Delegation { .. } => {
                matches!(rtype, Rtype::DS | Rtype::NSEC)
            }
            NameKind::Occluded => false,
        }
    }
}

/// A name that takes part in the denial chain.
#[derive(Clone, Debug)]
pub struct OwnerInfo<'a> {
    pub name: &'a Name,
    pub kind: NameKind,

    /// The types present, restricted to NS and DS at delegations.
    pub types: TypeBitmap,
}

impl OwnerInfo<'_> {
    /// Whether this name owns at least one signed RRset.
    pub fn has_signed_rrsets(&self) -> bool {
        self.types.iter().any(|rtype| self.kind.is_signed(rtype))
    }

    pub fn is_unsigned_delegation(&self) -> bool {
        self.kind == NameKind::Delegation { has_ds: false }
    }
}

/// Classify every owner name of the zone.
pub fn classify(zone: &OrderedZone) -> HashMap<&Name, NameKind> {
    let mut kinds = HashMap::new();
    let mut cut: Option<&Name> = None;
    for owner in zone.owners() {
        if cut.is_some_and(|cut| owner.is_below(cut)) {
            kinds.insert(owner, NameKind::Occluded);
            continue;
        }
        cut = None;

        let types = types_at(zone, owner);
        let kind = if owner != zone.apex() && types.contains(Rtype::NS) {
            cut = Some(owner);
            NameKind::Delegation {
                has_ds: types.contains(Rtype::DS),
            }
        } else {
            NameKind::Authoritative
        };
        kinds.insert(owner, kind);
    }
    kinds
}

/// The owner names that are not occluded, in canonical order.
pub fn owners(zone: &OrderedZone) -> Vec<OwnerInfo<'_>> {
    let kinds = classify(zone);
    zone.owners()
        .into_iter()
        .filter_map(|name| {
            let kind = *kinds.get(name)?;
            let mut types = types_at(zone, name);
            match kind {
                NameKind::Occluded => return None,
                NameKind::Delegation { .. } => {
                    types = types
                        .iter()
                        .filter(|t| matches!(*t, Rtype::NS | Rtype::DS))
                        .collect()
                }
                NameKind::Authoritative => {}
            }
            Some(OwnerInfo { name, kind, types })
        })
        .collect()
}

fn types_at(zone: &OrderedZone, name: &Name) -> TypeBitmap {
    let records = zone.records();
    let start = records.partition_point(|r| r.owner < *name);
    records[start..]
        .iter()
        .take_while(|r| r.owner == *name)
        .map(|r| r.rtype)
        .filter(|rtype| !rtype.is_dnssec_generated())
        .collect()
}
