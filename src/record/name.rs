//! Absolute domain names.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::Error;

/// Maximum length of a single label.
pub const MAX_LABEL_LEN: usize = 63;

/// Maximum length of a name in wire format, including the root label.
pub const MAX_NAME_LEN: usize = 255;

//------------ Name ----------------------------------------------------------

/// An absolute domain name.
///
/// The labels are kept with the case they were written in so the zone can
/// be printed back faithfully. Comparison, hashing and ordering are case
/// insensitive, and [`Ord`] is the DNSSEC canonical order of RFC 4034,
/// section 6.1: names are compared label by label starting at the root,
/// each label as a lowercased octet string, and a name sorts before all of
/// its subdomains.
#[derive(Clone, Default)]
pub struct Name {
    /// The labels from leftmost to rightmost, without the root label.
    labels: Vec<Box<[u8]>>,
}

impl Name {
    /// The root name.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a name in presentation format.
    ///
    /// `@` stands for the origin and names without a trailing dot are taken
    /// relative to it. Without an origin, relative names are rejected.
    pub fn parse(text: &str, origin: Option<&Name>) -> Result<Self, Error> {
        Self::parse_bytes(text.as_bytes(), origin)
    }

    /// Parse a name in presentation format given as raw bytes.
    pub fn parse_bytes(text: &[u8], origin: Option<&Name>) -> Result<Self, Error> {
        if text == b"@" {
            return origin
                .cloned()
                .ok_or_else(|| Error::parse("'@' used without an origin"));
        }
        if text == b"." {
            return Ok(Self::root());
        }
        if text.is_empty() {
            return Err(Error::parse("empty domain name"));
        }

        let mut labels = Vec::new();
        let mut label = Vec::new();
        let mut absolute = false;
        let mut pos = 0;
        while pos < text.len() {
            match text[pos] {
                b'.' => {
                    if label.is_empty() {
                        return Err(Error::parse(format!(
                            "empty label in '{}'",
                            String::from_utf8_lossy(text)
                        )));
                    }
                    labels.push(std::mem::take(&mut label).into_boxed_slice());
                    if pos + 1 == text.len() {
                        absolute = true;
                    }
                    pos += 1;
                }
                b'\\' => {
                    let (octet, used) = unescape_at(text, pos)?;
                    label.push(octet);
                    pos += used;
                }
                octet => {
                    label.push(octet);
                    pos += 1;
                }
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(Error::parse(format!(
                    "label longer than {MAX_LABEL_LEN} octets in '{}'",
                    String::from_utf8_lossy(text)
                )));
            }
        }
        if !label.is_empty() {
            labels.push(label.into_boxed_slice());
        }

        if !absolute {
            match origin {
                Some(origin) => labels.extend(origin.labels.iter().cloned()),
                None => {
                    return Err(Error::parse(format!(
                        "relative name '{}' without an origin",
                        String::from_utf8_lossy(text)
                    )))
                }
            }
        }

        let name = Self { labels };
        if name.wire_len() > MAX_NAME_LEN {
            return Err(Error::parse(format!(
                "name '{name}' is longer than {MAX_NAME_LEN} octets"
            )));
        }
        Ok(name)
    }

    /// Build a name from raw labels, leftmost first.
    pub fn from_labels<I, L>(labels: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[u8]>,
    {
        let mut name = Self::root();
        for label in labels {
            let label = label.as_ref();
            if label.is_empty() || label.len() > MAX_LABEL_LEN {
                return Err(Error::parse("invalid label length"));
            }
            name.labels.push(label.into());
        }
        if name.wire_len() > MAX_NAME_LEN {
            return Err(Error::parse(format!(
                "name '{name}' is longer than {MAX_NAME_LEN} octets"
            )));
        }
        Ok(name)
    }

    /// Returns a new name with `label` prepended.
    pub fn prepend(&self, label: &[u8]) -> Result<Self, Error> {
        Self::from_labels(std::iter::once(label).chain(self.labels.iter().map(AsRef::as_ref)))
    }

    /// The labels from leftmost to rightmost, excluding the root.
    pub fn labels(&self) -> impl DoubleEndedIterator<Item = &[u8]> + ExactSizeIterator {
        self.labels.iter().map(AsRef::as_ref)
    }

    /// The number of labels, not counting the root.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Whether the leftmost label is `*`.
    pub fn is_wildcard(&self) -> bool {
        self.labels.first().is_some_and(|label| &**label == b"*")
    }

    /// The value of the RRSIG labels field for this owner name.
    ///
    /// RFC 4034, section 3.1.3: the root and a leading wildcard label are
    /// not counted.
    pub fn rrsig_label_count(&self) -> u8 {
        let count = self.labels.len() - usize::from(self.is_wildcard());
        // A name has at most 127 labels.
        count as u8
    }

    /// The immediate parent, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.labels.is_empty() {
            None
        } else {
            Some(Self {
                labels: self.labels[1..].to_vec(),
            })
        }
    }

    /// Whether `self` equals `other` or lies below it.
    pub fn ends_with(&self, other: &Name) -> bool {
        if other.labels.len() > self.labels.len() {
            return false;
        }
        self.labels
            .iter()
            .rev()
            .zip(other.labels.iter().rev())
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    /// Whether `self` lies strictly below `other`.
    pub fn is_below(&self, other: &Name) -> bool {
        self.labels.len() > other.labels.len() && self.ends_with(other)
    }

    /// The length of the name in wire format.
    pub fn wire_len(&self) -> usize {
        self.labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1
    }

    /// Append the uncompressed wire format, preserving case.
    pub fn compose(&self, target: &mut Vec<u8>) {
        for label in &self.labels {
            target.push(label.len() as u8);
            target.extend_from_slice(label);
        }
        target.push(0);
    }

    /// Append the canonical wire format: uncompressed and lowercased.
    pub fn compose_canonical(&self, target: &mut Vec<u8>) {
        for label in &self.labels {
            target.push(label.len() as u8);
            target.extend(label.iter().map(u8::to_ascii_lowercase));
        }
        target.push(0);
    }

    /// The canonical wire format as a new vector.
    pub fn to_canonical_wire(&self) -> Vec<u8> {
        let mut wire = Vec::with_capacity(self.wire_len());
        self.compose_canonical(&mut wire);
        wire
    }

    /// The labels root first and lowercased.
    ///
    /// Comparing these keys lexicographically gives the canonical order, so
    /// they can be computed once when sorting many records.
    pub fn canonical_key(&self) -> Vec<Box<[u8]>> {
        self.labels
            .iter()
            .rev()
            .map(|l| l.to_ascii_lowercase().into_boxed_slice())
            .collect()
    }
}

/// Decode the escape sequence starting at `text[pos]`, which is a backslash.
///
/// Returns the octet and the number of input bytes used.
fn unescape_at(text: &[u8], pos: usize) -> Result<(u8, usize), Error> {
    match text.get(pos + 1) {
        Some(d) if d.is_ascii_digit() => {
            let digits = text
                .get(pos + 1..pos + 4)
                .filter(|digits| digits.iter().all(u8::is_ascii_digit))
                .ok_or_else(|| Error::parse("incomplete \\DDD escape"))?;
            let value = digits
                .iter()
                .fold(0u32, |acc, d| acc * 10 + u32::from(d - b'0'));
            let octet = u8::try_from(value)
                .map_err(|_| Error::parse(format!("escape \\{value} out of range")))?;
            Ok((octet, 4))
        }
        Some(&octet) => Ok((octet, 2)),
        None => Err(Error::parse("trailing backslash")),
    }
}

//--- FromStr

impl FromStr for Name {
    type Err = Error;

    /// Parses an absolute name; a missing trailing dot is implied.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.ends_with('.') {
            Self::parse(s, None)
        } else {
            Self::parse(s, Some(&Self::root()))
        }
    }
}

//--- PartialEq, Eq, Hash

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.labels.len() == other.labels.len()
            && self
                .labels
                .iter()
                .zip(&other.labels)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for label in &self.labels {
            state.write_u8(label.len() as u8);
            for octet in label.iter() {
                state.write_u8(octet.to_ascii_lowercase());
            }
        }
    }
}

//--- PartialOrd, Ord

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.labels.iter().rev().zip(other.labels.iter().rev()) {
            let ord = a
                .iter()
                .map(u8::to_ascii_lowercase)
                .cmp(b.iter().map(u8::to_ascii_lowercase));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.labels.len().cmp(&other.labels.len())
    }
}

//--- Display, Debug

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            return f.write_str(".");
        }
        for label in &self.labels {
            for &octet in label.iter() {
                match octet {
                    b'.' | b';' | b'(' | b')' | b'"' | b'\\' | b'@' | b'$' => {
                        write!(f, "\\{}", octet as char)?
                    }
                    0x21..=0x7e => write!(f, "{}", octet as char)?,
                    _ => write!(f, "\\{octet:03}")?,
                }
            }
            f.write_str(".")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({self})")
    }
}

//============ Tests =========================================================
