//! Reading zones from master files.
//!
//! The master file syntax is handled by the zonefile scanner of the
//! `domain` crate. Its records are turned into our own [`Record`]s via
//! their uncompressed wire format.

use std::io;

use bytes::Bytes;
use domain::base::name::{FlattenInto, ToLabelIter};
use domain::base::rdata::ComposeRecordData;
use domain::rdata::ZoneRecordData;
use domain::zonefile::inplace::{self, Entry};
use tracing::debug;

use crate::error::{Error, Result};
use crate::record::{Class, Name, OrderedZone, Record, RecordData, Rtype};

type ScannedName = domain::base::Name<Bytes>;
type ScannedRecord = domain::base::Record<ScannedName, ZoneRecordData<Bytes, ScannedName>>;

//------------ ParsedZone ----------------------------------------------------

/// The outcome of reading a zone.
#[derive(Debug)]
pub struct ParsedZone {
    pub zone: OrderedZone,

    /// The MINIMUM field of the SOA record.
    pub min_ttl: u32,
}

//------------ ZoneReader ----------------------------------------------------

/// Reads a zone from master file text.
///
/// ```rust,ignore
/// let parsed = ZoneReader::new()
///     .zone(apex)
///     .input(std::fs::File::open("example.com.zone")?)
///     .bump_serial(true)
///     .read()?;
/// ```
#[derive(Default)]
pub struct ZoneReader<'a> {
    zone: Option<Name>,
    input: Option<Box<dyn io::Read + 'a>>,
    bump_serial: bool,
}

impl<'a> ZoneReader<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The apex of the zone, which is also the initial origin.
    pub fn zone(mut self, zone: Name) -> Self {
        self.zone = Some(zone);
        self
    }

    pub fn input(mut self, input: impl io::Read + 'a) -> Self {
        self.input = Some(Box::new(input));
        self
    }

    /// Increase the SOA serial by two.
    pub fn bump_serial(mut self, bump: bool) -> Self {
        self.bump_serial = bump;
        self
    }

    pub fn read(self) -> Result<ParsedZone> {
        let apex = self
            .zone
            .ok_or_else(|| Error::config("no zone name given"))?;
        let mut input = self
            .input
            .ok_or_else(|| Error::config("no zone input given"))?;

        let mut wire = Vec::new();
        apex.compose(&mut wire);
        let origin = ScannedName::from_octets(Bytes::from(wire))
            .map_err(|err| Error::config(format!("invalid zone name '{apex}': {err}")))?;

        let mut reader = inplace::Zonefile::load(&mut input)?;
        reader.set_origin(origin);

        let mut records = Vec::new();
        for entry in reader {
            let entry = entry.map_err(|err| Error::parse(format!("invalid zone file: {err}")))?;
            match entry {
                Entry::Record(record) => {
                    let record = convert(record.flatten_into())?;
                    if !record.owner.ends_with(&apex) {
                        return Err(Error::parse(format!(
                            "record '{}' is outside the zone '{apex}'",
                            record.owner
                        )));
                    }
                    records.push(record);
                }
                Entry::Include { .. } => {
                    return Err(Error::parse(
                        "invalid zone file: $INCLUDE directive is not supported",
                    ))
                }
            }
        }
        finish(apex, records, self.bump_serial)
    }
}

/// Parse a zone held in memory.
pub fn read_zone(zone: Name, text: &[u8], bump_serial: bool) -> Result<ParsedZone> {
    ZoneReader::new()
        .zone(zone)
        .input(text)
        .bump_serial(bump_serial)
        .read()
}

/// Turn a scanned record into one of ours.
fn convert(record: ScannedRecord) -> Result<Record> {
    let owner = Name::from_labels(
        record
            .owner()
            .iter_labels()
            .filter(|label| !label.is_root())
            .map(|label| label.as_slice()),
    )?;
    let rtype = Rtype(record.rtype().to_int());

    let mut wire = Vec::new();
    record
        .data()
        .compose_rdata(&mut wire)
        .unwrap_or_else(|err| match err {});
    let data = RecordData::from_wire(rtype, &wire)
        .map_err(|err| Error::parse(format!("invalid zone file: record '{owner}': {err}")))?;

    Ok(Record::new(
        owner,
        record.ttl().as_secs(),
        Class(record.class().to_int()),
        rtype,
        data,
    ))
}

/// Check the SOA record and build the ordered zone.
fn finish(apex: Name, mut records: Vec<Record>, bump_serial: bool) -> Result<ParsedZone> {
    let mut soa_count = 0;
    let mut min_ttl = 0;
    for record in &mut records {
        if let RecordData::Soa(soa) = &mut record.data {
            if record.owner != apex {
                return Err(Error::parse(format!(
                    "SOA record at '{}' instead of the apex",
                    record.owner
                )));
            }
            if bump_serial {
                soa.serial = soa.serial.wrapping_add(2);
            }
            soa_count += 1;
            min_ttl = soa.minimum;
        }
    }
    match soa_count {
        1 => {}
        0 => return Err(Error::parse(format!("no SOA record found for '{apex}'"))),
        _ => return Err(Error::parse("more than one SOA record")),
    }

    let zone = OrderedZone::new(apex, records);
    debug!("read {} records for zone '{}'", zone.len(), zone.apex());
    Ok(ParsedZone { zone, min_ttl })
}

//============ Tests =========================================================
