//! Zone digests, RFC 8976.

use ring::digest;

use crate::error::{Error, Result};
use crate::record::rdata::{Zonemd, ZONEMD_SCHEME_SIMPLE, ZONEMD_SHA384};
use crate::record::{OrderedZone, Record, RecordData, Rtype};

/// A ZONEMD record with an all-zero digest.
///
/// It is added before the denial chain is built so the apex type bitmap
/// includes ZONEMD. Its TTL is the SOA TTL.
pub fn placeholder(zone: &OrderedZone) -> Result<Record> {
    let soa = zone
        .soa()
        .ok_or_else(|| Error::parse("zone has no SOA record"))?;
    let serial = soa.data.as_soa().map_or(0, |soa| soa.serial);
    Ok(Record::new(
        zone.apex().clone(),
        soa.ttl,
        soa.class,
        Rtype::ZONEMD,
        RecordData::Zonemd(Zonemd {
            serial,
            scheme: ZONEMD_SCHEME_SIMPLE,
            hash_algorithm: ZONEMD_SHA384,
            digest: vec![0; digest::SHA384_OUTPUT_LEN],
        }),
    ))
}

/// The SIMPLE scheme SHA-384 digest of the zone.
///
/// Every RRset is included in canonical order, except the apex ZONEMD
/// RRset and the apex RRSIGs covering it.
pub fn digest(zone: &OrderedZone) -> Vec<u8> {
    let mut ctx = digest::Context::new(&digest::SHA384);
    let mut wire = Vec::new();
    for rrset in zone.rrsets() {
        for record in rrset.iter() {
            if is_excluded(zone, record) {
                continue;
            }
            wire.clear();
            record.compose_canonical(record.ttl, &mut wire);
            ctx.update(&wire);
        }
    }
    ctx.finish().as_ref().to_vec()
}

/// Replace the digest of the apex ZONEMD record.
pub fn set_digest(zone: &mut OrderedZone, value: Vec<u8>) {
    let apex = zone.apex().clone();
    zone.update(|record| {
        if record.owner == apex {
            if let RecordData::Zonemd(zonemd) = &mut record.data {
                zonemd.digest = value.clone();
            }
        }
    });
}

fn is_excluded(zone: &OrderedZone, record: &Record) -> bool {
    if record.owner != *zone.apex() {
        return false;
    }
    match &record.data {
        RecordData::Zonemd(_) => true,
        RecordData::Rrsig(rrsig) => rrsig.type_covered == Rtype::ZONEMD,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::record::Name;
    use crate::zonefile::read_zone;

    fn zone(text: &str) -> OrderedZone {
        read_zone(Name::from_str("example.").unwrap(), text.as_bytes(), false)
            .unwrap()
            .zone
    }

    // RFC 8976, appendix A.1.
    const SIMPLE_ZONE: &str = "\
example.      86400  IN  SOA     ns1 admin 2018031900 1800 900 604800 86400
              86400  IN  NS      ns1
              86400  IN  NS      ns2
              86400  IN  ZONEMD  2018031900 1 1 (
                                 c68090d90a7aed71
                                 6bc459f9340e3d7c
                                 1370d4d24b7e2fc3
                                 a1ddc0b9a87153b9
                                 a9713b3c9ae5cc27
                                 777f98b8e730044c )
ns1           3600   IN  A       203.0.113.63
ns2           3600   IN  AAAA    2001:db8::63
";

    #[test]
    fn rfc8976_simple_example() {
        let zone = zone(SIMPLE_ZONE);
        assert_eq!(
            hex::encode(digest(&zone)),
            "c68090d90a7aed716bc459f9340e3d7c1370d4d24b7e2fc3\
             a1ddc0b9a87153b9a9713b3c9ae5cc27777f98b8e730044c"
        );
    }

    #[test]
    fn placeholder_then_digest() {
        let mut zone = zone(
            "@ 600 IN SOA ns hostmaster 7 7200 3600 1209600 300\n\
             @ 600 IN NS ns\n\
             ns 600 IN A 192.0.2.1\n",
        );
        let before = digest(&zone);
        let record = placeholder(&zone).unwrap();
        assert_eq!(record.ttl, 600);
        zone.extend([record]);
        // The placeholder itself is not part of the digest.
        assert_eq!(digest(&zone), before);

        set_digest(&mut zone, before.clone());
        let zonemd = zone
            .records()
            .iter()
            .find_map(|r| match &r.data {
                RecordData::Zonemd(z) => Some(z.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(zonemd.serial, 7);
        assert_eq!(zonemd.digest, before);
        assert_eq!(zonemd.digest.len(), 48);
    }
}
