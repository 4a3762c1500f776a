//! The signing pipeline.
//!
//! Preparing a zone for signing strips whatever DNSSEC data it carries and
//! adds the records that are to be signed along with the rest: the DNSKEY
//! RRset and, if requested, a ZONEMD placeholder and an informational TXT
//! record. Once the denial chain has been added, [`sign_zone`] signs every
//! authoritative RRset and finishes the zone digest.

pub mod output;
mod rrset;
pub mod zonemd;

use rayon::prelude::*;
use tracing::{debug, info, warn};

pub use self::output::write_zone;
pub use self::rrset::{rrsig_time, rrsig_template, signed_data, Signer};
use crate::chain::classify;
use crate::error::{Error, Result};
use crate::keys::SigningKey;
use crate::record::rdata::Txt;
use crate::record::{OrderedZone, Record, RecordData, RecordSet, Rtype};

/// Remove the records that signing regenerates.
///
/// Returns the number of records removed.
pub fn strip_dnssec(zone: &mut OrderedZone, strip_zonemd: bool) -> usize {
    let apex = zone.apex().clone();
    let before = zone.len();
    zone.retain(|record| {
        let stale = record.rtype.is_dnssec_generated()
            || (strip_zonemd && record.rtype == Rtype::ZONEMD && record.owner == apex);
        !stale
    });
    let removed = before - zone.len();
    if removed > 0 {
        warn!("removed {removed} existing DNSSEC records from the input, they are regenerated");
    }
    removed
}

/// Add the DNSKEY RRset for `keys` at the apex.
pub fn add_dnskeys(zone: &mut OrderedZone, ttl: u32, keys: &[&SigningKey]) -> Result<()> {
    let class = zone
        .soa()
        .ok_or_else(|| Error::parse("zone has no SOA record"))?
        .class;
    let apex = zone.apex().clone();
    let records: Vec<Record> = keys
        .iter()
        .map(|key| {
            debug!(
                "adding {} with key tag {} ({})",
                key.role,
                key.key_tag(),
                key.algorithm
            );
            Record::new(
                apex.clone(),
                ttl,
                class,
                Rtype::DNSKEY,
                RecordData::Dnskey(key.dnskey()),
            )
        })
        .collect();
    zone.extend(records);
    Ok(())
}

/// Add a TXT record with `text` at the apex.
pub fn add_info(zone: &mut OrderedZone, ttl: u32, text: &str) -> Result<()> {
    let class = zone
        .soa()
        .ok_or_else(|| Error::parse("zone has no SOA record"))?
        .class;
    let record = Record::new(
        zone.apex().clone(),
        ttl,
        class,
        Rtype::TXT,
        RecordData::Txt(Txt::from_text(text)),
    );
    zone.extend([record]);
    Ok(())
}

/// Add a ZONEMD record to be filled in by [`sign_zone`].
pub fn add_zonemd(zone: &mut OrderedZone) -> Result<()> {
    let record = zonemd::placeholder(zone)?;
    zone.extend([record]);
    Ok(())
}

/// Sign every authoritative RRset of the zone and add the signatures.
///
/// With `digest` set, the apex ZONEMD RRset is filled in once everything
/// else is signed and then signed itself. Returns the number of signatures
/// added.
pub fn sign_zone(zone: &mut OrderedZone, signer: &Signer<'_>, digest: bool) -> Result<usize> {
    let apex = zone.apex().clone();
    let is_apex_zonemd =
        |set: &RecordSet<'_>| set.rtype() == Rtype::ZONEMD && *set.owner() == apex;

    let rrsigs = sign_rrsets(zone, signer, |set| !(digest && is_apex_zonemd(set)))?;
    let mut count = rrsigs.len();
    zone.extend(rrsigs);

    if digest {
        let value = zonemd::digest(zone);
        debug!("zone digest {}", hex::encode(&value));
        zonemd::set_digest(zone, value);
        let rrsigs = sign_rrsets(zone, signer, is_apex_zonemd)?;
        count += rrsigs.len();
        zone.extend(rrsigs);
    }

    info!("signed {count} RRsets");
    Ok(count)
}

/// Sign the authoritative RRsets selected by `include`, in parallel.
fn sign_rrsets(
    zone: &OrderedZone,
    signer: &Signer<'_>,
    include: impl Fn(&RecordSet<'_>) -> bool,
) -> Result<Vec<Record>> {
    let kinds = classify(zone);
    let rrsets: Vec<RecordSet<'_>> = zone
        .rrsets()
        .into_iter()
        .filter(|set| {
            kinds
                .get(set.owner())
                .is_some_and(|kind| kind.is_signed(set.rtype()))
        })
        .filter(|set| include(set))
        .collect();
    rrsets.par_iter().map(|set| signer.sign(set)).collect()
}
