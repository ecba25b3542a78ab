use super::TsigAlgorithm;
use crate::dns::scan::{self, read_u16};
use crate::dns::{CLASS_ANY, DomainName, TYPE_TSIG};
use crate::error::{DnsError, Result};
use std::ops::Range;
use tracing::trace;

/// The TSIG record found at the end of a received message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsigRecord {
    /// Owner name of the record, naming the key
    pub key_name: DomainName,
    pub algorithm_name: DomainName,
    /// Seconds since the epoch, 48 bits on the wire
    pub time_signed: u64,
    pub fudge: u16,
    pub mac: Vec<u8>,
    pub original_id: u16,
    pub error: u16,
    pub other_data: Vec<u8>,
    /// Offset of the record within the message. The MAC covers everything
    /// before it.
    pub position: usize,
}

impl TsigRecord {
    /// Look for a TSIG record as the last record of the additional section.
    ///
    /// Returns `Ok(None)` if the message has no such record and an error if
    /// the message or the record is malformed.
    pub fn find(msg: &[u8]) -> Result<Option<Self>> {
        let Some(record) = scan::last_additional(msg)? else {
            return Ok(None);
        };
        if record.rtype != TYPE_TSIG {
            return Ok(None);
        }
        if record.rclass != CLASS_ANY {
            return Err(DnsError::InvalidTsig(format!(
                "class {} instead of ANY",
                record.rclass
            )));
        }
        if record.ttl != 0 {
            return Err(DnsError::InvalidTsig(format!("ttl {}", record.ttl)));
        }

        let (key_name, _) = DomainName::from_wire(msg, record.start)?;
        Self::parse_rdata(msg, record.rdata, key_name, record.start)
            .map(Some)
    }

    fn parse_rdata(
        msg: &[u8],
        rdata: Range<usize>,
        key_name: DomainName,
        position: usize,
    ) -> Result<Self> {
        // RDATA layout:
        // Algorithm Name (domain-name)
        // Time Signed (48-bit)
        // Fudge (16-bit)
        // MAC Size (16-bit)
        // MAC (variable)
        // Original ID (16-bit)
        // Error (16-bit)
        // Other Len (16-bit)
        // Other Data (variable)
        let data = &msg[..rdata.end];
        let (algorithm_name, mut pos) = DomainName::from_wire(data, rdata.start)?;

        let time = data.get(pos..pos + 6).ok_or_else(|| too_short("time signed"))?;
        let time_signed = u64::from_be_bytes([0, 0, time[0], time[1], time[2], time[3], time[4], time[5]]);
        pos += 6;

        let fudge = read_u16(data, pos).map_err(|_| too_short("fudge"))?;
        let mac_size = usize::from(read_u16(data, pos + 2).map_err(|_| too_short("mac size"))?);
        pos += 4;

        let mac = data
            .get(pos..pos + mac_size)
            .ok_or_else(|| too_short("mac"))?
            .to_vec();
        pos += mac_size;

        let original_id = read_u16(data, pos).map_err(|_| too_short("original id"))?;
        let error = read_u16(data, pos + 2).map_err(|_| too_short("error"))?;
        let other_len = usize::from(read_u16(data, pos + 4).map_err(|_| too_short("other len"))?);
        pos += 6;

        let other_data = data
            .get(pos..pos + other_len)
            .ok_or_else(|| too_short("other data"))?
            .to_vec();
        pos += other_len;

        if pos != rdata.end {
            return Err(DnsError::InvalidTsig(format!(
                "{} trailing bytes in RDATA",
                rdata.end - pos
            )));
        }

        trace!(
            "Parsed TSIG record: key={} algorithm={} mac_size={}",
            key_name, algorithm_name, mac_size
        );

        Ok(Self {
            key_name,
            algorithm_name,
            time_signed,
            fudge,
            mac,
            original_id,
            error,
            other_data,
            position,
        })
    }

    /// Algorithm named by the record, if it is one we know
    pub fn algorithm(&self) -> Option<TsigAlgorithm> {
        TsigAlgorithm::from_wire_name(&self.algorithm_name)
    }
}

fn too_short(field: &str) -> DnsError {
    DnsError::InvalidTsig(format!("RDATA too short for {}", field))
}

/// TSIG facts of one received query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TsigState {
    /// The message carries no TSIG record
    NotPresent,
    /// A well-formed TSIG record was found
    Present(TsigRecord),
    /// A TSIG record (or the message around it) could not be parsed
    Malformed(DnsError),
}

impl TsigState {
    pub fn from_message(msg: &[u8]) -> Self {
        match TsigRecord::find(msg) {
            Ok(Some(record)) => TsigState::Present(record),
            Ok(None) => TsigState::NotPresent,
            Err(e) => TsigState::Malformed(e),
        }
    }

    pub fn record(&self) -> Option<&TsigRecord> {
        match self {
            TsigState::Present(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, TsigState::Malformed(_))
    }
}
