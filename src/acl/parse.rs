//! Parsing of ACL statements: `"<address-spec> <key>"`
//!
//! Address spec forms:
//! - `ADDR` a single address
//! - `ADDR/BITS` a subnet
//! - `ADDR&MASK` an address under a mask
//! - `MIN-MAX` an inclusive address range
//!
//! Any of them may carry a `@PORT` suffix. An address containing `:` is
//! IPv6. The key is `NOKEY`, `BLOCKED` or the name of a configured key.

use super::{AclEntry, KeySpec, RangeType};
use crate::capabilities::Capabilities;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AclParseError {
    #[error("expected '<address> <key>', got '{0}'")]
    Syntax(String),

    #[error("Bad port in '{0}'")]
    BadPort(String),

    #[error("Bad ip4 address '{0}'")]
    BadIpv4(String),

    #[error("Bad ip6 address '{0}'")]
    BadIpv6(String),

    #[error("Bad mask '{0}'")]
    BadMask(String),

    #[error("Bad subnet '{0}'")]
    BadSubnet(String),

    #[error("subnet /{bits} wider than {max} bits")]
    SubnetTooWide { bits: u32, max: u32 },

    #[error("ip6 address '{0}' but IPv6 support is disabled")]
    Ipv6Disabled(String),
}

pub type Result<T> = std::result::Result<T, AclParseError>;

fn parse_addr(text: &str, v6: bool) -> Result<IpAddr> {
    if v6 {
        text.parse::<Ipv6Addr>()
            .map(IpAddr::V6)
            .map_err(|_| AclParseError::BadIpv6(text.to_string()))
    } else {
        text.parse::<Ipv4Addr>()
            .map(IpAddr::V4)
            .map_err(|_| AclParseError::BadIpv4(text.to_string()))
    }
}

/// Netmask with the top `bits` bits set
fn subnet_mask(bits_text: &str, v6: bool) -> Result<IpAddr> {
    let bits: u32 = bits_text
        .parse()
        .map_err(|_| AclParseError::BadSubnet(bits_text.to_string()))?;
    if v6 {
        if bits > 128 {
            return Err(AclParseError::SubnetTooWide { bits, max: 128 });
        }
        let mask = u128::MAX.checked_shl(128 - bits).unwrap_or(0);
        Ok(IpAddr::V6(Ipv6Addr::from(mask)))
    } else {
        if bits > 32 {
            return Err(AclParseError::SubnetTooWide { bits, max: 32 });
        }
        let mask = u32::MAX.checked_shl(32 - bits).unwrap_or(0);
        Ok(IpAddr::V4(Ipv4Addr::from(mask)))
    }
}

fn parse_key(key: &str) -> KeySpec {
    match key {
        "NOKEY" => KeySpec::NoKey,
        "BLOCKED" => KeySpec::Blocked,
        name => KeySpec::Named(name.to_string()),
    }
}

impl AclEntry {
    /// Build an entry from its address spec and key word.
    pub fn parse(address: &str, key: &str, caps: Capabilities) -> Result<Self> {
        let (spec, port) = match address.split_once('@') {
            Some((spec, port)) => match port.parse::<u16>() {
                Ok(port) if port != 0 => (spec, port),
                _ => return Err(AclParseError::BadPort(address.to_string())),
            },
            None => (address, 0),
        };

        let v6 = spec.contains(':');
        if v6 && !caps.ipv6 {
            return Err(AclParseError::Ipv6Disabled(address.to_string()));
        }

        let (range_type, addr, bound) = if let Some((addr, bits)) = spec.split_once('/') {
            (RangeType::Subnet, addr, Some(subnet_mask(bits, v6)?))
        } else if let Some((addr, mask)) = spec.split_once('&') {
            let mask = parse_addr(mask, v6).map_err(|_| AclParseError::BadMask(mask.to_string()))?;
            (RangeType::Mask, addr, Some(mask))
        } else if let Some((min, max)) = spec.split_once('-') {
            (RangeType::MinMax, min, Some(parse_addr(max, v6)?))
        } else {
            (RangeType::Single, spec, None)
        };

        let addr = parse_addr(addr, v6)?;
        let range_mask = bound.unwrap_or(match addr {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        });

        Ok(Self {
            ip_address_spec: address.to_string(),
            addr,
            range_mask,
            range_type,
            port,
            key: parse_key(key),
            key_ref: None,
        })
    }

    /// Parse a whole `"<address-spec> <key>"` statement.
    pub fn parse_statement(statement: &str, caps: Capabilities) -> Result<Self> {
        let mut words = statement.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (Some(address), Some(key), None) => Self::parse(address, key, caps),
            _ => Err(AclParseError::Syntax(statement.to_string())),
        }
    }
}
