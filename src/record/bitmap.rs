//! NSEC and NSEC3 type bitmaps.

use std::collections::BTreeSet;
use std::fmt;

use super::rtype::Rtype;
use crate::error::{Error, Result};

/// The set of record types present at a name.
///
/// Encoded in the window block format of RFC 4034, section 4.1.2.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TypeBitmap {
    types: BTreeSet<Rtype>,
}

impl TypeBitmap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rtype: Rtype) {
        self.types.insert(rtype);
    }

    pub fn contains(&self, rtype: Rtype) -> bool {
        self.types.contains(&rtype)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Rtype> + '_ {
        self.types.iter().copied()
    }

    /// Decode the window blocks of a bitmap.
    pub fn from_wire(mut data: &[u8]) -> Result<Self> {
        let mut res = Self::new();
        let mut last_block = None;
        while !data.is_empty() {
            let (block, len) = match data {
                [block, len, ..] => (*block, usize::from(*len)),
                _ => return Err(Error::parse("truncated type bitmap")),
            };
            if !(1..=32).contains(&len) || data.len() < len + 2 {
                return Err(Error::parse("invalid type bitmap window"));
            }
            if last_block.is_some_and(|last| last >= block) {
                return Err(Error::parse("type bitmap windows out of order"));
            }
            last_block = Some(block);
            for (i, octet) in data[2..len + 2].iter().enumerate() {
                for bit in 0..8 {
                    if octet & (0x80 >> bit) != 0 {
                        let low = (i * 8 + bit) as u16;
                        res.insert(Rtype(u16::from(block) << 8 | low));
                    }
                }
            }
            data = &data[len + 2..];
        }
        Ok(res)
    }

    /// Append the wire format.
    pub fn compose(&self, target: &mut Vec<u8>) {
        let mut window: Option<(u8, [u8; 32], usize)> = None;
        for rtype in &self.types {
            let [block, low] = rtype.0.to_be_bytes();
            if window.as_ref().map(|(current, _, _)| *current) != Some(block) {
                if let Some(done) = window.take() {
                    push_window(target, done);
                }
                window = Some((block, [0; 32], 0));
            }
            if let Some((_, bits, len)) = &mut window {
                let octet = usize::from(low / 8);
                bits[octet] |= 0x80 >> (low % 8);
                *len = (*len).max(octet + 1);
            }
        }
        if let Some(done) = window {
            push_window(target, done);
        }
    }
}

fn push_window(target: &mut Vec<u8>, (block, bits, len): (u8, [u8; 32], usize)) {
    target.push(block);
    target.push(len as u8);
    target.extend_from_slice(&bits[..len]);
}

impl FromIterator<Rtype> for TypeBitmap {
    fn from_iter<T: IntoIterator<Item = Rtype>>(iter: T) -> Self {
        Self {
            types: iter.into_iter().collect(),
        }
    }
}

impl Extend<Rtype> for TypeBitmap {
    fn extend<T: IntoIterator<Item = Rtype>>(&mut self, iter: T) {
        self.types.extend(iter)
    }
}

impl fmt::Display for TypeBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for rtype in &self.types {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{rtype}")?;
        }
        Ok(())
    }
}
