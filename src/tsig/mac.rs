//! Request MAC computation
//!
//! The MAC of a request covers the message as received, truncated at the
//! TSIG record and with ARCOUNT decremented, followed by the TSIG variables
//! in canonical form.

use super::{TsigKey, TsigRecord};
use crate::dns::{CLASS_ANY, DnsHeader, DomainName, HEADER_LEN, TYPE_TSIG};
use crate::error::DnsError;
use ring::hmac;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MacError {
    #[error("TSIG message error: {0}")]
    Message(#[from] DnsError),

    #[error("TSIG signature verification failed")]
    VerificationFailed,
}

/// Seconds since the epoch, for signing
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn append_variables(
    data: &mut Vec<u8>,
    key_name: &DomainName,
    algorithm_name: &DomainName,
    time_signed: u64,
    fudge: u16,
    error: u16,
    other_data: &[u8],
) {
    key_name.compose_canonical(data);
    data.extend_from_slice(&CLASS_ANY.to_be_bytes());
    data.extend_from_slice(&0u32.to_be_bytes()); // TTL
    algorithm_name.compose_canonical(data);
    data.extend_from_slice(&time_signed.to_be_bytes()[2..]); // 48-bit
    data.extend_from_slice(&fudge.to_be_bytes());
    data.extend_from_slice(&error.to_be_bytes());
    data.extend_from_slice(&(other_data.len() as u16).to_be_bytes());
    data.extend_from_slice(other_data);
}

/// Rebuild the bytes a received request's MAC was computed over.
fn signed_data(msg: &[u8], record: &TsigRecord) -> Result<Vec<u8>, DnsError> {
    let mut header = DnsHeader::parse(msg)?;
    header.arcount = header
        .arcount
        .checked_sub(1)
        .ok_or_else(|| DnsError::InvalidTsig("ARCOUNT is zero".to_string()))?;

    let body = msg
        .get(HEADER_LEN..record.position)
        .ok_or_else(|| DnsError::InvalidTsig("record position outside message".to_string()))?;

    let mut data = Vec::with_capacity(record.position + 128);
    header.compose(&mut data)?;
    data.extend_from_slice(body);
    append_variables(
        &mut data,
        &record.key_name,
        &record.algorithm_name,
        record.time_signed,
        record.fudge,
        record.error,
        &record.other_data,
    );
    Ok(data)
}

/// Verify the MAC of a received request against `key`.
pub fn verify_mac(msg: &[u8], record: &TsigRecord, key: &TsigKey) -> Result<(), MacError> {
    let data = signed_data(msg, record)?;
    hmac::verify(key.hmac_key(), &data, &record.mac).map_err(|_| {
        debug!("TSIG MAC mismatch for key {}", key.name());
        MacError::VerificationFailed
    })
}

/// Sign a request with `key` by appending a TSIG record.
///
/// `msg` must be a complete message without a TSIG record. ARCOUNT is
/// incremented in place.
pub fn sign_message(
    msg: &mut Vec<u8>,
    key: &TsigKey,
    time_signed: u64,
    fudge: u16,
) -> Result<(), MacError> {
    let mut header = DnsHeader::parse(msg)?;
    let algorithm_name = DomainName::parse(key.algorithm().wire_name())?;

    let mut data = msg.clone();
    append_variables(
        &mut data,
        key.name(),
        &algorithm_name,
        time_signed,
        fudge,
        0,
        &[],
    );
    let tag = hmac::sign(key.hmac_key(), &data);
    let mac = tag.as_ref();

    let mut rdata = Vec::with_capacity(algorithm_name.wire_len() + 16 + mac.len());
    algorithm_name.compose(&mut rdata);
    rdata.extend_from_slice(&time_signed.to_be_bytes()[2..]);
    rdata.extend_from_slice(&fudge.to_be_bytes());
    rdata.extend_from_slice(&(mac.len() as u16).to_be_bytes());
    rdata.extend_from_slice(mac);
    rdata.extend_from_slice(&header.id.to_be_bytes());
    rdata.extend_from_slice(&0u16.to_be_bytes()); // Error
    rdata.extend_from_slice(&0u16.to_be_bytes()); // Other len

    key.name().compose(msg);
    msg.extend_from_slice(&TYPE_TSIG.to_be_bytes());
    msg.extend_from_slice(&CLASS_ANY.to_be_bytes());
    msg.extend_from_slice(&0u32.to_be_bytes());
    msg.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    msg.extend_from_slice(&rdata);

    header.arcount = header
        .arcount
        .checked_add(1)
        .ok_or_else(|| DnsError::InvalidTsig("ARCOUNT overflow".to_string()))?;
    header.write_over(msg)?;
    Ok(())
}
