//! Record data from uncompressed wire format.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::{Error, Result};

use super::bitmap::TypeBitmap;
use super::name::Name;
use super::rdata::{
    schema, Dnskey, Field, FieldKind, Generic, Nsec, Nsec3, Nsec3param, RecordData, Rrsig, Soa,
    Txt, Zonemd,
};
use super::rtype::Rtype;

impl RecordData {
    /// Decode the record data of a record of type `rtype`.
    ///
    /// Types with their own struct or a field schema are decoded into it
    /// and must use up all of `data`. Other types stay opaque.
    pub fn from_wire(rtype: Rtype, data: &[u8]) -> Result<Self> {
        let mut parser = Parser::new(rtype, data);
        let res = match rtype {
            Rtype::SOA => RecordData::Soa(Soa {
                mname: parser.name()?,
                rname: parser.name()?,
                serial: parser.u32()?,
                refresh: parser.u32()?,
                retry: parser.u32()?,
                expire: parser.u32()?,
                minimum: parser.u32()?,
            }),
            Rtype::DNSKEY | Rtype::CDNSKEY => RecordData::Dnskey(Dnskey {
                flags: parser.u16()?,
                protocol: parser.u8()?,
                algorithm: parser.u8()?,
                public_key: parser.rest().to_vec().into(),
            }),
            Rtype::RRSIG => RecordData::Rrsig(Rrsig {
                type_covered: Rtype(parser.u16()?),
                algorithm: parser.u8()?,
                labels: parser.u8()?,
                original_ttl: parser.u32()?,
                expiration: parser.u32()?,
                inception: parser.u32()?,
                key_tag: parser.u16()?,
                signer: parser.name()?,
                signature: parser.rest().to_vec().into(),
            }),
            Rtype::NSEC => RecordData::Nsec(Nsec {
                next: parser.name()?,
                types: TypeBitmap::from_wire(parser.rest())?,
            }),
            Rtype::NSEC3 => RecordData::Nsec3(Nsec3 {
                hash_algorithm: parser.u8()?,
                flags: parser.u8()?,
                iterations: parser.u16()?,
                salt: parser.char_string()?,
                next_owner: parser.char_string()?,
                types: TypeBitmap::from_wire(parser.rest())?,
            }),
            Rtype::NSEC3PARAM => RecordData::Nsec3param(Nsec3param {
                hash_algorithm: parser.u8()?,
                flags: parser.u8()?,
                iterations: parser.u16()?,
                salt: parser.char_string()?,
            }),
            Rtype::ZONEMD => RecordData::Zonemd(Zonemd {
                serial: parser.u32()?,
                scheme: parser.u8()?,
                hash_algorithm: parser.u8()?,
                digest: parser.rest().to_vec(),
            }),
            Rtype::TXT => {
                let mut strings = Vec::new();
                while !parser.is_done() {
                    strings.push(parser.char_string()?);
                }
                if strings.is_empty() {
                    return Err(Error::parse("TXT record without strings"));
                }
                RecordData::Txt(Txt { strings })
            }
            _ => match schema(rtype) {
                Some(kinds) => RecordData::Generic(parser.generic(kinds)?),
                None => RecordData::Unknown(parser.rest().to_vec()),
            },
        };
        if !parser.is_done() {
            return Err(Error::parse(format!("trailing data in {rtype} record")));
        }
        Ok(res)
    }
}

//------------ Parser --------------------------------------------------------

struct Parser<'a> {
    rtype: Rtype,
    data: &'a [u8],
}

impl<'a> Parser<'a> {
    fn new(rtype: Rtype, data: &'a [u8]) -> Self {
        Self { rtype, data }
    }

    fn is_done(&self) -> bool {
        self.data.is_empty()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.data.len() < len {
            return Err(Error::parse(format!(
                "short record data in {} record",
                self.rtype
            )));
        }
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        Ok(head)
    }

    fn rest(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.data)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let mut buf = [0; 2];
        buf.copy_from_slice(self.take(2)?);
        Ok(u16::from_be_bytes(buf))
    }

    fn u32(&mut self) -> Result<u32> {
        let mut buf = [0; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(buf))
    }

    fn char_string(&mut self) -> Result<Vec<u8>> {
        let len = self.u8()?;
        Ok(self.take(usize::from(len))?.to_vec())
    }

    /// An uncompressed domain name.
    fn name(&mut self) -> Result<Name> {
        let mut labels = Vec::new();
        loop {
            match self.u8()? {
                0 => break,
                len @ 1..=63 => labels.push(self.take(usize::from(len))?),
                _ => {
                    return Err(Error::parse(format!(
                        "compressed name in {} record",
                        self.rtype
                    )))
                }
            }
        }
        Name::from_labels(labels)
    }

    fn generic(&mut self, kinds: &[FieldKind]) -> Result<Generic> {
        let mut fields = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let field = match kind {
                FieldKind::U8 => Field::U8(self.u8()?),
                FieldKind::U16 => Field::U16(self.u16()?),
                FieldKind::Ipv4 => {
                    let mut octets = [0; 4];
                    octets.copy_from_slice(self.take(4)?);
                    Field::Ipv4(Ipv4Addr::from(octets))
                }
                FieldKind::Ipv6 => {
                    let mut octets = [0; 16];
                    octets.copy_from_slice(self.take(16)?);
                    Field::Ipv6(Ipv6Addr::from(octets))
                }
                FieldKind::Name => Field::Name(self.name()?),
                FieldKind::CharStr => Field::CharStr(self.char_string()?),
                FieldKind::Tag => Field::Tag(self.char_string()?),
                FieldKind::Text => Field::Text(self.rest().to_vec()),
                FieldKind::Hex => Field::Hex(self.rest().to_vec()),
                FieldKind::Base64 => Field::Base64(self.rest().to_vec()),
            };
            fields.push(field);
        }
        Ok(Generic { fields })
    }
}

//============ Tests =========================================================
