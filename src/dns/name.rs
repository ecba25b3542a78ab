//! Domain names for zone apexes and TSIG key names.
//!
//! Equality, ordering and hashing are case-insensitive. Ordering is the
//! canonical DNS order: labels are compared starting from the rightmost one,
//! so a zone tree keyed by `DomainName` groups names under their parents.

use crate::error::{DnsError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Longest label allowed on the wire
pub const MAX_LABEL_LEN: usize = 63;

/// Longest name allowed on the wire, root label included
pub const MAX_NAME_LEN: usize = 255;

#[derive(Clone, Default)]
pub struct DomainName {
    /// Labels leftmost first, without the root label.
    labels: Vec<Box<[u8]>>,
}

impl DomainName {
    /// The root name `.`
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a name in presentation format.
    ///
    /// A trailing dot is optional; every name is taken as absolute. `\X`
    /// escapes a single character and `\DDD` a decimal byte value.
    pub fn parse(text: &str) -> Result<Self> {
        if text == "." {
            return Ok(Self::root());
        }
        if text.is_empty() {
            return Err(DnsError::EmptyLabel);
        }

        let bytes = text.as_bytes();
        let mut labels = Vec::new();
        let mut current = Vec::new();
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'.' => {
                    if current.is_empty() {
                        return Err(DnsError::EmptyLabel);
                    }
                    Self::push_label(&mut labels, &mut current)?;
                    i += 1;
                }
                b'\\' => match &bytes[i + 1..] {
                    [a, b, c, ..]
                        if a.is_ascii_digit() && b.is_ascii_digit() && c.is_ascii_digit() =>
                    {
                        let value = u16::from(a - b'0') * 100
                            + u16::from(b - b'0') * 10
                            + u16::from(c - b'0');
                        let value = u8::try_from(value)
                            .map_err(|_| DnsError::InvalidEscape(text.to_string()))?;
                        current.push(value);
                        i += 4;
                    }
                    [a, ..] if !a.is_ascii_digit() => {
                        current.push(*a);
                        i += 2;
                    }
                    _ => return Err(DnsError::InvalidEscape(text.to_string())),
                },
                b => {
                    current.push(b);
                    i += 1;
                }
            }
        }
        if !current.is_empty() {
            Self::push_label(&mut labels, &mut current)?;
        }

        let name = Self { labels };
        if name.wire_len() > MAX_NAME_LEN {
            return Err(DnsError::NameTooLong);
        }
        Ok(name)
    }

    fn push_label(labels: &mut Vec<Box<[u8]>>, current: &mut Vec<u8>) -> Result<()> {
        if current.len() > MAX_LABEL_LEN {
            return Err(DnsError::InvalidLabelLength(current.len()));
        }
        labels.push(std::mem::take(current).into_boxed_slice());
        Ok(())
    }

    /// Read a possibly compressed name from `msg` starting at `start`.
    ///
    /// Returns the name and the offset of the first byte after it in the
    /// uncompressed stream.
    pub fn from_wire(msg: &[u8], start: usize) -> Result<(Self, usize)> {
        let mut labels = Vec::new();
        let mut pos = start;
        let mut end = None;
        let mut wire_len = 1;

        loop {
            let len = usize::from(*msg.get(pos).ok_or(DnsError::BufferTooSmall {
                need: pos + 1,
                have: msg.len(),
            })?);

            match len & 0xC0 {
                0x00 if len == 0 => {
                    pos += 1;
                    break;
                }
                0x00 => {
                    let label = msg
                        .get(pos + 1..pos + 1 + len)
                        .ok_or(DnsError::BufferTooSmall {
                            need: pos + 1 + len,
                            have: msg.len(),
                        })?;
                    wire_len += len + 1;
                    if wire_len > MAX_NAME_LEN {
                        return Err(DnsError::NameTooLong);
                    }
                    labels.push(Box::from(label));
                    pos += 1 + len;
                }
                0xC0 => {
                    let low = usize::from(*msg.get(pos + 1).ok_or(DnsError::BufferTooSmall {
                        need: pos + 2,
                        have: msg.len(),
                    })?);
                    let target = ((len & 0x3F) << 8) | low;
                    if end.is_none() {
                        end = Some(pos + 2);
                    }
                    // Pointers only go backwards; any loop has to pass
                    // through labels and trips the length limit.
                    if target >= pos {
                        return Err(DnsError::BadCompressionPointer(pos));
                    }
                    pos = target;
                }
                _ => return Err(DnsError::InvalidLabelLength(len)),
            }
        }

        Ok((Self { labels }, end.unwrap_or(pos)))
    }

    /// Append the uncompressed wire form, preserving case.
    pub fn compose(&self, buf: &mut Vec<u8>) {
        for label in &self.labels {
            buf.push(label.len() as u8);
            buf.extend_from_slice(label);
        }
        buf.push(0);
    }

    /// Append the canonical wire form: uncompressed, all lowercase.
    pub fn compose_canonical(&self, buf: &mut Vec<u8>) {
        for label in &self.labels {
            buf.push(label.len() as u8);
            buf.extend(label.iter().map(u8::to_ascii_lowercase));
        }
        buf.push(0);
    }

    /// Length of the uncompressed wire form
    pub fn wire_len(&self) -> usize {
        self.labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &[u8]> {
        self.labels.iter().map(|l| &l[..])
    }
}

fn cmp_label(a: &[u8], b: &[u8]) -> Ordering {
    a.iter()
        .map(u8::to_ascii_lowercase)
        .cmp(b.iter().map(u8::to_ascii_lowercase))
}

impl Ord for DomainName {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.labels.iter().rev().zip(other.labels.iter().rev()) {
            match cmp_label(a, b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.labels.len().cmp(&other.labels.len())
    }
}

impl PartialOrd for DomainName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for DomainName {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DomainName {}

impl Hash for DomainName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.labels.len());
        for label in &self.labels {
            state.write_usize(label.len());
            for byte in label.iter() {
                state.write_u8(byte.to_ascii_lowercase());
            }
        }
    }
}

impl FromStr for DomainName {
    type Err = DnsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            return f.write_str(".");
        }
        for label in &self.labels {
            for &byte in label.iter() {
                match byte {
                    b'.' | b'\\' => write!(f, "\\{}", byte as char)?,
                    0x21..=0x7E => write!(f, "{}", byte as char)?,
                    _ => write!(f, "\\{:03}", byte)?,
                }
            }
            f.write_str(".")?;
        }
        Ok(())
    }
}

impl fmt::Debug for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DomainName({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_parse_and_display() {
        let name = DomainName::parse("www.Example.com").unwrap();
        assert_eq!(name.label_count(), 3);
        assert_eq!(name.to_string(), "www.Example.com.");
        assert_eq!(name, DomainName::parse("WWW.example.COM.").unwrap());

        assert!(DomainName::parse(".").unwrap().is_root());
        assert_eq!(DomainName::root().to_string(), ".");
    }

    #[test]
    fn test_parse_escapes() {
        let name = DomainName::parse("a\\.b.example").unwrap();
        assert_eq!(name.label_count(), 2);
        assert_eq!(name.labels().next().unwrap(), b"a.b");
        assert_eq!(name.to_string(), "a\\.b.example.");

        let name = DomainName::parse("\\065bc.example").unwrap();
        assert_eq!(name.labels().next().unwrap(), b"Abc");

        assert!(DomainName::parse("bad\\999.example").is_err());
        assert!(DomainName::parse("bad\\1").is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(DomainName::parse(""), Err(DnsError::EmptyLabel));
        assert_eq!(DomainName::parse("a..b"), Err(DnsError::EmptyLabel));
        let long_label = "x".repeat(64);
        assert_eq!(
            DomainName::parse(&long_label),
            Err(DnsError::InvalidLabelLength(64))
        );
        let long_name = vec!["abcdefghij"; 30].join(".");
        assert_eq!(DomainName::parse(&long_name), Err(DnsError::NameTooLong));
    }

    #[test]
    fn test_canonical_ordering() {
        let names: BTreeSet<DomainName> = ["z.example.", "example.", "a.example.", "example.org.", "B.example."]
            .iter()
            .map(|n| DomainName::parse(n).unwrap())
            .collect();
        let ordered: Vec<String> = names.iter().map(|n| n.to_string().to_lowercase()).collect();
        assert_eq!(
            ordered,
            vec!["example.", "a.example.", "b.example.", "z.example.", "example.org."]
        );
    }

    #[test]
    fn test_wire_with_compression() {
        // "example.com" at offset 0, then "www" + pointer to offset 0
        let mut msg = Vec::new();
        DomainName::parse("example.com").unwrap().compose(&mut msg);
        let second = msg.len();
        msg.extend_from_slice(&[3, b'w', b'w', b'w', 0xC0, 0x00]);

        let (name, end) = DomainName::from_wire(&msg, second).unwrap();
        assert_eq!(name, DomainName::parse("www.example.com").unwrap());
        assert_eq!(end, msg.len());

        let (name, end) = DomainName::from_wire(&msg, 0).unwrap();
        assert_eq!(name.to_string(), "example.com.");
        assert_eq!(end, second);
    }

    #[test]
    fn test_wire_rejects_forward_pointer() {
        let msg = [0xC0, 0x00];
        assert_eq!(
            DomainName::from_wire(&msg, 0),
            Err(DnsError::BadCompressionPointer(0))
        );
        assert!(DomainName::from_wire(&[3, b'a'], 0).is_err());
    }

    #[test]
    fn test_canonical_wire_is_lowercase() {
        let name = DomainName::parse("Key.EXAMPLE").unwrap();
        let mut buf = Vec::new();
        name.compose_canonical(&mut buf);
        assert_eq!(buf, b"\x03key\x07example\x00");
        assert_eq!(buf.len(), name.wire_len());
    }
}
