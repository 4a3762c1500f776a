//! The NSEC chain.

use crate::record::rdata::Nsec;
use crate::record::{OrderedZone, Record, RecordData, Rtype};

/// Generate one NSEC record per owner name.
///
/// The records link the names in canonical order and the last one points
/// back to the apex. Each bitmap lists the types at the name plus NSEC and
/// RRSIG, since every NSEC record gets signed.
pub fn generate(zone: &OrderedZone, ttl: u32) -> Vec<Record> {
    let owners = super::owners(zone);
    let class = zone.soa().map_or(crate::record::Class::IN, |soa| soa.class);

    owners
        .iter()
        .enumerate()
        .map(|(i, owner)| {
            let next = &owners[(i + 1) % owners.len()];
            let mut types = owner.types.clone();
            types.insert(Rtype::NSEC);
            types.insert(Rtype::RRSIG);
            Record::new(
                owner.name.clone(),
                ttl,
                class,
                Rtype::NSEC,
                RecordData::Nsec(Nsec {
                    next: next.name.clone(),
                    types,
                }),
            )
        })
        .collect()
}
