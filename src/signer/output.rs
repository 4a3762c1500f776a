//! Writing the signed zone.

use std::collections::HashMap;
use std::io;

use crate::record::{Name, OrderedZone, Record, Rtype};

/// Write `zone` in master file format.
///
/// The SOA RRset comes first, followed by its signatures. Every other RRset
/// follows in canonical order, each directly followed by the RRSIGs that
/// cover it.
pub fn write_zone(zone: &OrderedZone, mut target: impl io::Write) -> io::Result<()> {
    let rrsets = zone.rrsets();
    let mut signatures: HashMap<(&Name, Rtype), Vec<&Record>> = HashMap::new();
    for set in rrsets.iter().filter(|set| set.rtype() == Rtype::RRSIG) {
        for rrsig in set.iter() {
            if let Some(data) = rrsig.data.as_rrsig() {
                signatures
                    .entry((&rrsig.owner, data.type_covered))
                    .or_default()
                    .push(rrsig);
            }
        }
    }

    let soa = rrsets
        .iter()
        .filter(|set| set.rtype() == Rtype::SOA && set.owner() == zone.apex());
    let rest = rrsets
        .iter()
        .filter(|set| !(set.rtype() == Rtype::SOA && set.owner() == zone.apex()))
        .filter(|set| set.rtype() != Rtype::RRSIG);

    for rrset in soa.chain(rest) {
        for record in rrset.iter() {
            writeln!(target, "{record}")?;
        }
        if let Some(rrsigs) = signatures.get(&(rrset.owner(), rrset.rtype())) {
            for rrsig in rrsigs {
                writeln!(target, "{rrsig}")?;
            }
        }
    }
    target.flush()
}
