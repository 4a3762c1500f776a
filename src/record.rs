//! The in-memory zone model and its canonical order.

mod bitmap;
mod name;
pub mod rdata;
mod rtype;
mod wire;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

pub use self::bitmap::TypeBitmap;
pub use self::name::Name;
pub use self::rdata::RecordData;
pub use self::rtype::{Class, Rtype};

//------------ Record --------------------------------------------------------

/// A single resource record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub owner: Name,
    pub ttl: u32,
    pub class: Class,
    pub rtype: Rtype,
    pub data: RecordData,
}

impl Record {
    pub fn new(owner: Name, ttl: u32, class: Class, rtype: Rtype, data: RecordData) -> Self {
        Self {
            owner,
            ttl,
            class,
            rtype,
            data,
        }
    }

    /// The canonical wire format of the record data.
    pub fn canonical_rdata(&self) -> Vec<u8> {
        self.data.to_canonical_wire(self.rtype)
    }

    /// Append the canonical form of the whole record with the given TTL.
    ///
    /// This is the per record part of the signed data of RFC 4034, section
    /// 3.1.8.1: owner, type, class, TTL, RDLENGTH and RDATA.
    pub fn compose_canonical(&self, ttl: u32, target: &mut Vec<u8>) {
        self.owner.compose_canonical(target);
        target.extend_from_slice(&self.rtype.0.to_be_bytes());
        target.extend_from_slice(&self.class.0.to_be_bytes());
        target.extend_from_slice(&ttl.to_be_bytes());
        let rdata = self.canonical_rdata();
        target.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        target.extend_from_slice(&rdata);
    }

    /// Compare two records in canonical order.
    ///
    /// Owner name first, then type, class and finally the canonical record
    /// data. The TTL does not take part.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.owner
            .cmp(&other.owner)
            .then(self.rtype.cmp(&other.rtype))
            .then(self.class.cmp(&other.class))
            .then_with(|| self.canonical_rdata().cmp(&other.canonical_rdata()))
    }

    fn sort_key(&self) -> SortKey {
        (
            self.owner.canonical_key(),
            self.rtype,
            self.class,
            self.canonical_rdata(),
        )
    }
}

type SortKey = (Vec<Box<[u8]>>, Rtype, Class, Vec<u8>);

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.owner, self.ttl, self.class, self.rtype, self.data
        )
    }
}

//------------ RecordSet -----------------------------------------------------

/// All records sharing owner, type and class.
///
/// Literal duplicates are dropped and the members are in canonical order.
#[derive(Clone, Debug)]
pub struct RecordSet<'a> {
    records: Vec<&'a Record>,
}

impl<'a> RecordSet<'a> {
    /// The first member, present in every set.
    pub fn first(&self) -> &'a Record {
        self.records[0]
    }

    pub fn owner(&self) -> &'a Name {
        &self.first().owner
    }

    pub fn rtype(&self) -> Rtype {
        self.first().rtype
    }

    pub fn class(&self) -> Class {
        self.first().class
    }

    pub fn ttl(&self) -> u32 {
        self.first().ttl
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.records.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

//------------ OrderedZone ---------------------------------------------------

/// The records of one zone in canonical order.
///
/// Every mutation re-establishes the order and the TTL invariant: all
/// members of an RRset carry the lowest TTL found among them. RRSIG records
/// are exempt from the latter as their TTLs follow the covered RRset.
#[derive(Clone, Debug)]
pub struct OrderedZone {
    apex: Name,
    records: Vec<Record>,
}

impl OrderedZone {
    pub fn new(apex: Name, records: Vec<Record>) -> Self {
        let mut zone = Self { apex, records };
        zone.canonicalize();
        zone
    }

    pub fn apex(&self) -> &Name {
        &self.apex
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The SOA record at the apex.
    pub fn soa(&self) -> Option<&Record> {
        self.records
            .iter()
            .find(|r| r.rtype == Rtype::SOA && r.owner == self.apex)
    }

    /// Add records and restore the canonical order.
    pub fn extend(&mut self, records: impl IntoIterator<Item = Record>) {
        self.records.extend(records);
        self.canonicalize();
    }

    /// Keep only the records for which `keep` returns true.
    pub fn retain(&mut self, keep: impl FnMut(&Record) -> bool) {
        self.records.retain(keep);
    }

    /// Apply `f` to every record, then restore the canonical order.
    pub fn update(&mut self, f: impl FnMut(&mut Record)) {
        self.records.iter_mut().for_each(f);
        self.canonicalize();
    }

    /// The RRsets in canonical order.
    pub fn rrsets(&self) -> Vec<RecordSet<'_>> {
        let mut sets: Vec<RecordSet<'_>> = Vec::new();
        let mut prev: Option<(&Record, Vec<u8>)> = None;
        for record in &self.records {
            let rdata = record.canonical_rdata();
            match &prev {
                Some((last, last_rdata)) if same_rrset(last, record) => {
                    if *last_rdata != rdata {
                        if let Some(set) = sets.last_mut() {
                            set.records.push(record);
                        }
                    }
                }
                _ => sets.push(RecordSet {
                    records: vec![record],
                }),
            }
            prev = Some((record, rdata));
        }
        sets
    }

    /// The distinct owner names in canonical order.
    pub fn owners(&self) -> Vec<&Name> {
        let mut owners: Vec<&Name> = Vec::new();
        for record in &self.records {
            if owners.last() != Some(&&record.owner) {
                owners.push(&record.owner);
            }
        }
        owners
    }

    fn canonicalize(&mut self) {
        self.records.sort_by_cached_key(Record::sort_key);

        let mut min_ttl: HashMap<(Name, Rtype, Class), u32> = HashMap::new();
        for record in self.records.iter().filter(|r| r.rtype != Rtype::RRSIG) {
            min_ttl
                .entry((record.owner.clone(), record.rtype, record.class))
                .and_modify(|ttl| *ttl = (*ttl).min(record.ttl))
                .or_insert(record.ttl);
        }
        for record in self.records.iter_mut().filter(|r| r.rtype != Rtype::RRSIG) {
            if let Some(ttl) = min_ttl.get(&(record.owner.clone(), record.rtype, record.class)) {
                record.ttl = *ttl;
            }
        }
    }
}

fn same_rrset(a: &Record, b: &Record) -> bool {
    a.owner == b.owner && a.rtype == b.rtype && a.class == b.class
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    use super::rdata::{Field, Generic};
    use super::*;

    fn a(owner: &str, ttl: u32, addr: [u8; 4]) -> Record {
        Record::new(
            Name::from_str(owner).unwrap(),
            ttl,
            Class::IN,
            Rtype::A,
            RecordData::Generic(Generic {
                fields: vec![Field::Ipv4(Ipv4Addr::from(addr))],
            }),
        )
    }

    fn txt(owner: &str, ttl: u32, text: &str) -> Record {
        Record::new(
            Name::from_str(owner).unwrap(),
            ttl,
            Class::IN,
            Rtype::TXT,
            RecordData::Txt(rdata::Txt::from_text(text)),
        )
    }

    fn zone(records: Vec<Record>) -> OrderedZone {
        OrderedZone::new(Name::from_str("example.").unwrap(), records)
    }

    #[test]
    fn sort_order_and_idempotence() {
        let z = zone(vec![
            txt("b.example.", 300, "x"),
            a("B.example.", 300, [192, 0, 2, 2]),
            a("b.example.", 300, [192, 0, 2, 1]),
            a("example.", 300, [192, 0, 2, 9]),
            a("a.b.example.", 300, [192, 0, 2, 1]),
        ]);
        let owners: Vec<String> = z.records().iter().map(|r| r.owner.to_string()).collect();
        assert_eq!(
            owners,
            ["example.", "b.example.", "B.example.", "b.example.", "a.b.example."]
        );
        assert_eq!(z.records()[1].rtype, Rtype::A);
        assert_eq!(z.records()[3].rtype, Rtype::TXT);

        for pair in z.records().windows(2) {
            assert_ne!(pair[0].canonical_cmp(&pair[1]), Ordering::Greater);
        }

        let again = OrderedZone::new(z.apex().clone(), z.records().to_vec());
        assert_eq!(again.records(), z.records());
    }

    #[test]
    fn ttls_are_normalized_per_rrset() {
        let z = zone(vec![
            a("www.example.", 600, [192, 0, 2, 1]),
            a("www.example.", 300, [192, 0, 2, 2]),
            txt("www.example.", 900, "keep"),
        ]);
        let ttls: Vec<(Rtype, u32)> = z.records().iter().map(|r| (r.rtype, r.ttl)).collect();
        assert_eq!(ttls, [(Rtype::A, 300), (Rtype::A, 300), (Rtype::TXT, 900)]);
    }

    #[test]
    fn duplicates_are_kept_but_not_in_rrsets() {
        let z = zone(vec![
            a("www.example.", 300, [192, 0, 2, 1]),
            a("www.example.", 300, [192, 0, 2, 1]),
            a("www.example.", 300, [192, 0, 2, 2]),
        ]);
        assert_eq!(z.len(), 3);
        let sets = z.rrsets();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].len(), 2);
        assert_eq!(z.owners().len(), 1);
    }
}
