//! Access control lists for notify and zone transfer requests
//!
//! A zone carries one ordered list of [`AclEntry`] per [`AclDirection`].
//! Entries are parsed from `"<address-spec> <key>"` statements, their key
//! names are resolved once after load, and [`check_incoming`] evaluates a
//! list against one received request.

pub mod address;
pub mod check;
pub mod key;
pub mod parse;

pub use address::addr_matches;
pub use check::{AclContext, AclVerdict, Denial, check_incoming};
pub use key::key_matches;
pub use parse::AclParseError;

use crate::config::KeyRef;
use std::fmt;
use std::net::IpAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }
}

/// How the stored address and the range bound describe a set of peers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeType {
    /// One address
    Single,
    /// `ADDR&MASK`
    Mask,
    /// `ADDR/BITS`, matched like a mask
    Subnet,
    /// `MIN-MAX`, both bounds inclusive
    MinMax,
}

/// Key requirement of an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySpec {
    /// `NOKEY`: the address alone grants access
    NoKey,
    /// `BLOCKED`: a matching peer is refused
    Blocked,
    /// Requests must be signed with the named key
    Named(String),
}

/// The four request kinds a zone keeps a list for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AclDirection {
    /// Who may send us NOTIFY for the zone
    AllowNotify,
    /// Masters we request transfers from
    RequestXfr,
    /// Slaves we send NOTIFY to
    Notify,
    /// Who may transfer the zone from us
    ProvideXfr,
}

impl AclDirection {
    pub const ALL: [AclDirection; 4] = [
        AclDirection::AllowNotify,
        AclDirection::RequestXfr,
        AclDirection::Notify,
        AclDirection::ProvideXfr,
    ];

    /// Option name in the configuration file
    pub fn as_str(&self) -> &'static str {
        match self {
            AclDirection::AllowNotify => "allow-notify",
            AclDirection::RequestXfr => "request-xfr",
            AclDirection::Notify => "notify",
            AclDirection::ProvideXfr => "provide-xfr",
        }
    }
}

impl fmt::Display for AclDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One element of an access control list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclEntry {
    /// The address spec as written, port included
    pub ip_address_spec: String,
    /// Single address, network address or lower bound
    pub addr: IpAddr,
    /// Mask or upper bound, same family as `addr`. Unused for `Single`.
    pub range_mask: IpAddr,
    pub range_type: RangeType,
    /// Required peer port, 0 for any
    pub port: u16,
    pub key: KeySpec,
    /// Definition the key name resolved to, set after load
    pub(crate) key_ref: Option<KeyRef>,
}

impl AclEntry {
    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.addr)
    }

    pub fn is_nokey(&self) -> bool {
        self.key == KeySpec::NoKey
    }

    pub fn is_blocked(&self) -> bool {
        self.key == KeySpec::Blocked
    }

    pub fn key_name(&self) -> Option<&str> {
        match &self.key {
            KeySpec::Named(name) => Some(name),
            _ => None,
        }
    }

    pub fn key_ref(&self) -> Option<KeyRef> {
        self.key_ref
    }

    /// Whether both entries describe the same set of peers.
    ///
    /// Keys are not compared. The range bound only counts for range types
    /// that use it.
    pub fn same_host(&self, other: &AclEntry) -> bool {
        self.family() == other.family()
            && self.port == other.port
            && self.range_type == other.range_type
            && self.addr == other.addr
            && (self.range_type == RangeType::Single || self.range_mask == other.range_mask)
    }
}

impl fmt::Display for AclEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            KeySpec::NoKey => write!(f, "{} NOKEY", self.ip_address_spec),
            KeySpec::Blocked => write!(f, "{} BLOCKED", self.ip_address_spec),
            KeySpec::Named(name) => write!(f, "{} {}", self.ip_address_spec, name),
        }
    }
}
