//! Record types and classes.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

//------------ Rtype ---------------------------------------------------------

/// A resource record type.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rtype(pub u16);

macro_rules! rtypes {
    ( $( $name:ident = $value:expr ),* $(,)? ) => {
        impl Rtype {
            $( pub const $name: Rtype = Rtype($value); )*

            /// The mnemonic for this type, if it has one.
            pub fn mnemonic(self) -> Option<&'static str> {
                match self.0 {
                    $( $value => Some(stringify!($name)), )*
                    _ => None,
                }
            }

            fn from_mnemonic(s: &str) -> Option<Self> {
                $(
                    if s.eq_ignore_ascii_case(stringify!($name)) {
                        return Some(Rtype::$name);
                    }
                )*
                None
            }
        }
    };
}

rtypes! {
    A = 1,
    NS = 2,
    CNAME = 5,
    SOA = 6,
    PTR = 12,
    HINFO = 13,
    MX = 15,
    TXT = 16,
    AAAA = 28,
    SRV = 33,
    DNAME = 39,
    DS = 43,
    SSHFP = 44,
    RRSIG = 46,
    NSEC = 47,
    DNSKEY = 48,
    NSEC3 = 50,
    NSEC3PARAM = 51,
    TLSA = 52,
    CDS = 59,
    CDNSKEY = 60,
    ZONEMD = 63,
    CAA = 257,
}

impl Rtype {
    /// Whether records of this type embed domain names that are lowercased
    /// in canonical form.
    ///
    /// RFC 4034 section 6.2 as updated by RFC 6840 section 5.1, limited to
    /// the types this crate knows the layout of.
    pub fn has_canonical_names(self) -> bool {
        matches!(
            self,
            Rtype::NS
                | Rtype::CNAME
                | Rtype::SOA
                | Rtype::PTR
                | Rtype::MX
                | Rtype::DNAME
                | Rtype::SRV
                | Rtype::RRSIG
        )
    }

    /// Whether this is a type maintained by the signer itself.
    pub fn is_dnssec_generated(self) -> bool {
        matches!(
            self,
            Rtype::RRSIG | Rtype::NSEC | Rtype::NSEC3 | Rtype::NSEC3PARAM
        )
    }
}

impl FromStr for Rtype {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rtype) = Self::from_mnemonic(s) {
            return Ok(rtype);
        }
        s.get(..4)
            .filter(|prefix| prefix.eq_ignore_ascii_case("TYPE"))
            .and_then(|_| s[4..].parse().ok())
            .map(Rtype)
            .ok_or_else(|| Error::parse(format!("unknown record type '{s}'")))
    }
}

impl fmt::Display for Rtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mnemonic() {
            Some(m) => f.write_str(m),
            None => write!(f, "TYPE{}", self.0),
        }
    }
}

impl fmt::Debug for Rtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rtype({self})")
    }
}

//------------ Class ---------------------------------------------------------

/// A resource record class.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Class(pub u16);

impl Class {
    pub const IN: Class = Class(1);
    pub const CH: Class = Class(3);
    pub const HS: Class = Class(4);

    pub fn mnemonic(self) -> Option<&'static str> {
        match self {
            Class::IN => Some("IN"),
            Class::CH => Some("CH"),
            Class::HS => Some("HS"),
            _ => None,
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mnemonic() {
            Some(m) => f.write_str(m),
            None => write!(f, "CLASS{}", self.0),
        }
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class({self})")
    }
}
