//! Section walker for received messages.
//!
//! Only record boundaries are located; record data is not interpreted. This
//! is enough to find the TSIG record, which must be the last record of the
//! additional section.

use super::header::{DnsHeader, HEADER_LEN};
use super::name::DomainName;
use crate::error::{DnsError, Result};
use std::ops::Range;

/// Resource record type TSIG (RFC 8945)
pub const TYPE_TSIG: u16 = 250;

/// Class ANY, required for TSIG records
pub const CLASS_ANY: u16 = 255;

/// Where one resource record sits inside a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPosition {
    /// Offset of the record's owner name
    pub start: usize,
    pub rtype: u16,
    pub rclass: u16,
    pub ttl: u32,
    pub rdata: Range<usize>,
}

pub(crate) fn read_u16(msg: &[u8], pos: usize) -> Result<u16> {
    msg.get(pos..pos + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(DnsError::BufferTooSmall {
            need: pos + 2,
            have: msg.len(),
        })
}

pub(crate) fn read_u32(msg: &[u8], pos: usize) -> Result<u32> {
    msg.get(pos..pos + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(DnsError::BufferTooSmall {
            need: pos + 4,
            have: msg.len(),
        })
}

fn skip_question(msg: &[u8], pos: usize) -> Result<usize> {
    let (_, end) = DomainName::from_wire(msg, pos)?;
    if end + 4 > msg.len() {
        return Err(DnsError::BufferTooSmall {
            need: end + 4,
            have: msg.len(),
        });
    }
    Ok(end + 4)
}

/// Locate the record starting at `start`.
pub fn read_record(msg: &[u8], start: usize) -> Result<RecordPosition> {
    let (_, pos) = DomainName::from_wire(msg, start)?;
    let rtype = read_u16(msg, pos)?;
    let rclass = read_u16(msg, pos + 2)?;
    let ttl = read_u32(msg, pos + 4)?;
    let rdlength = usize::from(read_u16(msg, pos + 8)?);
    let rdata = pos + 10..pos + 10 + rdlength;
    if rdata.end > msg.len() {
        return Err(DnsError::BufferTooSmall {
            need: rdata.end,
            have: msg.len(),
        });
    }
    Ok(RecordPosition {
        start,
        rtype,
        rclass,
        ttl,
        rdata,
    })
}

/// Locate the last record of the additional section, if there is one.
pub fn last_additional(msg: &[u8]) -> Result<Option<RecordPosition>> {
    let header = DnsHeader::parse(msg)?;
    if header.arcount == 0 {
        return Ok(None);
    }

    let mut pos = HEADER_LEN;
    for _ in 0..header.qdcount {
        pos = skip_question(msg, pos)?;
    }

    let preceding = u32::from(header.ancount) + u32::from(header.nscount) + u32::from(header.arcount) - 1;
    for _ in 0..preceding {
        pos = read_record(msg, pos)?.rdata.end;
    }

    read_record(msg, pos).map(Some)
}
