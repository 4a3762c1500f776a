//! Record data.
//!
//! The types the signer creates or inspects have their own structs. Other
//! well-known types are described by a field schema so they can be read,
//! canonicalized and printed without a dedicated type each. Anything else is
//! kept as opaque octets in the RFC 3597 format.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use chrono::DateTime;

use super::bitmap::TypeBitmap;
use super::name::Name;
use super::rtype::Rtype;

//------------ RecordData ----------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordData {
    Soa(Soa),
    /// DNSKEY and CDNSKEY.
    Dnskey(Dnskey),
    Rrsig(Rrsig),
    Nsec(Nsec),
    Nsec3(Nsec3),
    Nsec3param(Nsec3param),
    Zonemd(Zonemd),
    Txt(Txt),
    Generic(Generic),
    Unknown(Vec<u8>),
}

impl RecordData {
    /// Append the wire format.
    ///
    /// With `canonical` set, embedded names of the types listed in
    /// [`Rtype::has_canonical_names`] are lowercased.
    pub fn compose(&self, rtype: Rtype, canonical: bool, target: &mut Vec<u8>) {
        let lower = canonical && rtype.has_canonical_names();
        match self {
            RecordData::Soa(soa) => soa.compose(lower, target),
            RecordData::Dnskey(key) => key.compose(target),
            RecordData::Rrsig(sig) => {
                sig.compose_without_signature(lower, target);
                target.extend_from_slice(&sig.signature);
            }
            RecordData::Nsec(nsec) => nsec.compose(target),
            RecordData::Nsec3(nsec3) => nsec3.compose(target),
            RecordData::Nsec3param(param) => param.compose(target),
            RecordData::Zonemd(zonemd) => zonemd.compose(target),
            RecordData::Txt(txt) => txt.compose(target),
            RecordData::Generic(generic) => generic.compose(lower, target),
            RecordData::Unknown(data) => target.extend_from_slice(data),
        }
    }

    /// The canonical wire format as a new vector.
    pub fn to_canonical_wire(&self, rtype: Rtype) -> Vec<u8> {
        let mut wire = Vec::new();
        self.compose(rtype, true, &mut wire);
        wire
    }

    pub fn as_soa(&self) -> Option<&Soa> {
        match self {
            RecordData::Soa(soa) => Some(soa),
            _ => None,
        }
    }

    pub fn as_dnskey(&self) -> Option<&Dnskey> {
        match self {
            RecordData::Dnskey(key) => Some(key),
            _ => None,
        }
    }

    pub fn as_rrsig(&self) -> Option<&Rrsig> {
        match self {
            RecordData::Rrsig(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn as_nsec(&self) -> Option<&Nsec> {
        match self {
            RecordData::Nsec(nsec) => Some(nsec),
            _ => None,
        }
    }

    pub fn as_nsec3(&self) -> Option<&Nsec3> {
        match self {
            RecordData::Nsec3(nsec3) => Some(nsec3),
            _ => None,
        }
    }
}

impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordData::Soa(soa) => soa.fmt(f),
            RecordData::Dnskey(key) => key.fmt(f),
            RecordData::Rrsig(sig) => sig.fmt(f),
            RecordData::Nsec(nsec) => nsec.fmt(f),
            RecordData::Nsec3(nsec3) => nsec3.fmt(f),
            RecordData::Nsec3param(param) => param.fmt(f),
            RecordData::Zonemd(zonemd) => zonemd.fmt(f),
            RecordData::Txt(txt) => txt.fmt(f),
            RecordData::Generic(generic) => generic.fmt(f),
            RecordData::Unknown(data) => {
                write!(f, "\\# {}", data.len())?;
                if !data.is_empty() {
                    write!(f, " {}", hex::encode_upper(data))?;
                }
                Ok(())
            }
        }
    }
}

//------------ Soa -----------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Soa {
    pub mname: Name,
    pub rname: Name,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

impl Soa {
    fn compose(&self, lower: bool, target: &mut Vec<u8>) {
        compose_name(&self.mname, lower, target);
        compose_name(&self.rname, lower, target);
        for value in [
            self.serial,
            self.refresh,
            self.retry,
            self.expire,
            self.minimum,
        ] {
            target.extend_from_slice(&value.to_be_bytes());
        }
    }
}

impl fmt::Display for Soa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {}",
            self.mname,
            self.rname,
            self.serial,
            self.refresh,
            self.retry,
            self.expire,
            self.minimum
        )
    }
}

//------------ Dnskey --------------------------------------------------------

/// Flag bit marking a zone key.
pub const DNSKEY_ZONE: u16 = 0x0100;

/// Flag bit marking a secure entry point, set on key signing keys.
pub const DNSKEY_SEP: u16 = 0x0001;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dnskey {
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub public_key: Bytes,
}

impl Dnskey {
    fn compose(&self, target: &mut Vec<u8>) {
        target.extend_from_slice(&self.flags.to_be_bytes());
        target.push(self.protocol);
        target.push(self.algorithm);
        target.extend_from_slice(&self.public_key);
    }

    /// The key tag as defined in RFC 4034, appendix B.
    pub fn key_tag(&self) -> u16 {
        if self.algorithm == 1 {
            // RSAMD5 uses the most significant 16 bits of the modulus.
            let key = &self.public_key;
            return match key.len() {
                n if n >= 3 => u16::from_be_bytes([key[n - 3], key[n - 2]]),
                _ => 0,
            };
        }

        let mut rdata = Vec::with_capacity(4 + self.public_key.len());
        self.compose(&mut rdata);
        let mut acc: u32 = 0;
        for (i, octet) in rdata.iter().enumerate() {
            if i % 2 == 0 {
                acc += u32::from(*octet) << 8;
            } else {
                acc += u32::from(*octet);
            }
        }
        acc += (acc >> 16) & 0xffff;
        (acc & 0xffff) as u16
    }
}

impl fmt::Display for Dnskey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.flags,
            self.protocol,
            self.algorithm,
            BASE64.encode(&self.public_key)
        )
    }
}

//------------ Rrsig ---------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rrsig {
    pub type_covered: Rtype,
    pub algorithm: u8,
    pub labels: u8,
    pub original_ttl: u32,
    pub expiration: u32,
    pub inception: u32,
    pub key_tag: u16,
    pub signer: Name,
    pub signature: Bytes,
}

impl Rrsig {
    /// Append every field but the signature.
    ///
    /// This is the first part of the signed data of RFC 4034, section
    /// 3.1.8.1, in which case the signer name must be lowercased.
    pub fn compose_without_signature(&self, lower: bool, target: &mut Vec<u8>) {
        target.extend_from_slice(&self.type_covered.0.to_be_bytes());
        target.push(self.algorithm);
        target.push(self.labels);
        target.extend_from_slice(&self.original_ttl.to_be_bytes());
        target.extend_from_slice(&self.expiration.to_be_bytes());
        target.extend_from_slice(&self.inception.to_be_bytes());
        target.extend_from_slice(&self.key_tag.to_be_bytes());
        compose_name(&self.signer, lower, target);
    }
}

impl fmt::Display for Rrsig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {} {} {}",
            self.type_covered,
            self.algorithm,
            self.labels,
            self.original_ttl,
            Timestamp(self.expiration),
            Timestamp(self.inception),
            self.key_tag,
            self.signer,
            BASE64.encode(&self.signature)
        )
    }
}

/// A signature timestamp, printed as `YYYYMMDDHHmmSS`.
struct Timestamp(u32);

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DateTime::from_timestamp(i64::from(self.0), 0) {
            Some(time) => write!(f, "{}", time.format("%Y%m%d%H%M%S")),
            None => write!(f, "{}", self.0),
        }
    }
}

//------------ Nsec ----------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nsec {
    pub next: Name,
    pub types: TypeBitmap,
}

impl Nsec {
    fn compose(&self, target: &mut Vec<u8>) {
        // The next owner name keeps its case, see RFC 6840, section 5.1.
        self.next.compose(target);
        self.types.compose(target);
    }
}

impl fmt::Display for Nsec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.next, self.types)
    }
}

//------------ Nsec3 ---------------------------------------------------------

/// The NSEC3 hash algorithm number for SHA-1.
pub const NSEC3_SHA1: u8 = 1;

/// The NSEC3 opt-out flag.
pub const NSEC3_OPT_OUT: u8 = 0x01;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nsec3 {
    pub hash_algorithm: u8,
    pub flags: u8,
    pub iterations: u16,
    pub salt: Vec<u8>,
    pub next_owner: Vec<u8>,
    pub types: TypeBitmap,
}

impl Nsec3 {
    fn compose(&self, target: &mut Vec<u8>) {
        target.push(self.hash_algorithm);
        target.push(self.flags);
        target.extend_from_slice(&self.iterations.to_be_bytes());
        target.push(self.salt.len() as u8);
        target.extend_from_slice(&self.salt);
        target.push(self.next_owner.len() as u8);
        target.extend_from_slice(&self.next_owner);
        self.types.compose(target);
    }

    pub fn opt_out(&self) -> bool {
        self.flags & NSEC3_OPT_OUT != 0
    }
}

impl fmt::Display for Nsec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.hash_algorithm,
            self.flags,
            self.iterations,
            Salt(&self.salt),
            base32hex(&self.next_owner)
        )?;
        if !self.types.is_empty() {
            write!(f, " {}", self.types)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nsec3param {
    pub hash_algorithm: u8,
    pub flags: u8,
    pub iterations: u16,
    pub salt: Vec<u8>,
}

impl Nsec3param {
    fn compose(&self, target: &mut Vec<u8>) {
        target.push(self.hash_algorithm);
        target.push(self.flags);
        target.extend_from_slice(&self.iterations.to_be_bytes());
        target.push(self.salt.len() as u8);
        target.extend_from_slice(&self.salt);
    }
}

impl fmt::Display for Nsec3param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.hash_algorithm,
            self.flags,
            self.iterations,
            Salt(&self.salt)
        )
    }
}

/// An NSEC3 salt in presentation format, `-` when empty.
pub struct Salt<'a>(pub &'a [u8]);

impl fmt::Display for Salt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("-")
        } else {
            f.write_str(&hex::encode_upper(self.0))
        }
    }
}

/// Encode as lowercase base32 with the extended hex alphabet, unpadded.
pub fn base32hex(data: &[u8]) -> String {
    base32::encode(base32::Alphabet::Rfc4648Hex { padding: false }, data).to_ascii_lowercase()
}

//------------ Zonemd --------------------------------------------------------

/// The ZONEMD SIMPLE scheme.
pub const ZONEMD_SCHEME_SIMPLE: u8 = 1;

/// The ZONEMD hash algorithm number for SHA-384.
pub const ZONEMD_SHA384: u8 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Zonemd {
    pub serial: u32,
    pub scheme: u8,
    pub hash_algorithm: u8,
    pub digest: Vec<u8>,
}

impl Zonemd {
    fn compose(&self, target: &mut Vec<u8>) {
        target.extend_from_slice(&self.serial.to_be_bytes());
        target.push(self.scheme);
        target.push(self.hash_algorithm);
        target.extend_from_slice(&self.digest);
    }
}

impl fmt::Display for Zonemd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.serial,
            self.scheme,
            self.hash_algorithm,
            hex::encode_upper(&self.digest)
        )
    }
}

//------------ Txt -----------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Txt {
    pub strings: Vec<Vec<u8>>,
}

impl Txt {
    /// A TXT record from text, split into strings of at most 255 octets.
    ///
    /// Empty text becomes a single empty string.
    pub fn from_text(text: &str) -> Self {
        let mut strings: Vec<_> = text.as_bytes().chunks(255).map(<[u8]>::to_vec).collect();
        if strings.is_empty() {
            strings.push(Vec::new());
        }
        Self { strings }
    }

    fn compose(&self, target: &mut Vec<u8>) {
        for s in &self.strings {
            target.push(s.len() as u8);
            target.extend_from_slice(s);
        }
    }
}

impl fmt::Display for Txt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for s in &self.strings {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write_char_string(f, s)?;
        }
        Ok(())
    }
}

//------------ Generic -------------------------------------------------------

/// The kind of a single rdata field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    U16,
    Ipv4,
    Ipv6,
    Name,
    /// A length-prefixed character string.
    CharStr,
    /// A length-prefixed string printed without quotes.
    Tag,
    /// The remaining octets as a quoted string.
    Text,
    /// The remaining octets in hex.
    Hex,
    /// The remaining octets in base64.
    Base64,
}

/// The field layout of the types without their own struct.
pub fn schema(rtype: Rtype) -> Option<&'static [FieldKind]> {
    use FieldKind::*;

    Some(match rtype {
        Rtype::A => &[Ipv4],
        Rtype::AAAA => &[Ipv6],
        Rtype::NS | Rtype::CNAME | Rtype::PTR | Rtype::DNAME => &[Name],
        Rtype::MX => &[U16, Name],
        Rtype::SRV => &[U16, U16, U16, Name],
        Rtype::HINFO => &[CharStr, CharStr],
        Rtype::DS | Rtype::CDS => &[U16, U8, U8, Hex],
        Rtype::SSHFP => &[U8, U8, Hex],
        Rtype::TLSA => &[U8, U8, U8, Hex],
        Rtype::CAA => &[U8, Tag, Text],
        _ => return None,
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Field {
    U8(u8),
    U16(u16),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Name(Name),
    CharStr(Vec<u8>),
    Tag(Vec<u8>),
    Text(Vec<u8>),
    Hex(Vec<u8>),
    Base64(Vec<u8>),
}

/// Record data laid out according to [`schema`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Generic {
    pub fields: Vec<Field>,
}

impl Generic {
    /// The first embedded domain name, if any.
    pub fn name(&self) -> Option<&Name> {
        self.fields.iter().find_map(|field| match field {
            Field::Name(name) => Some(name),
            _ => None,
        })
    }

    fn compose(&self, lower: bool, target: &mut Vec<u8>) {
        for field in &self.fields {
            match field {
                Field::U8(v) => target.push(*v),
                Field::U16(v) => target.extend_from_slice(&v.to_be_bytes()),
                Field::Ipv4(addr) => target.extend_from_slice(&addr.octets()),
                Field::Ipv6(addr) => target.extend_from_slice(&addr.octets()),
                Field::Name(name) => compose_name(name, lower, target),
                Field::CharStr(s) | Field::Tag(s) => {
                    target.push(s.len() as u8);
                    target.extend_from_slice(s);
                }
                Field::Text(s) | Field::Hex(s) | Field::Base64(s) => target.extend_from_slice(s),
            }
        }
    }
}

impl fmt::Display for Generic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for field in &self.fields {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            match field {
                Field::U8(v) => write!(f, "{v}")?,
                Field::U16(v) => write!(f, "{v}")?,
                Field::Ipv4(addr) => write!(f, "{addr}")?,
                Field::Ipv6(addr) => write!(f, "{addr}")?,
                Field::Name(name) => write!(f, "{name}")?,
                Field::CharStr(s) | Field::Text(s) => write_char_string(f, s)?,
                Field::Tag(s) => f.write_str(&String::from_utf8_lossy(s))?,
                Field::Hex(s) => f.write_str(&hex::encode_upper(s))?,
                Field::Base64(s) => f.write_str(&BASE64.encode(s))?,
            }
        }
        Ok(())
    }
}

//------------ Helpers -------------------------------------------------------

fn compose_name(name: &Name, lower: bool, target: &mut Vec<u8>) {
    if lower {
        name.compose_canonical(target)
    } else {
        name.compose(target)
    }
}

/// Write a quoted character string, escaping what needs escaping.
fn write_char_string(f: &mut fmt::Formatter<'_>, s: &[u8]) -> fmt::Result {
    f.write_str("\"")?;
    for &octet in s {
        match octet {
            b'"' | b'\\' => write!(f, "\\{}", octet as char)?,
            0x20..=0x7e => write!(f, "{}", octet as char)?,
            _ => write!(f, "\\{octet:03}")?,
        }
    }
    f.write_str("\"")
}
