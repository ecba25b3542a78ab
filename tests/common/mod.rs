//! Common test utilities for the access-control tests

#![allow(dead_code)] // Not every test file uses every helper

use heimdall_acl::config::loader;
use heimdall_acl::dns::{DnsHeader, DomainName};
use heimdall_acl::tsig::sign_message;
use heimdall_acl::{Capabilities, Options, QueryFacts, TsigKey};
use std::net::SocketAddr;

pub const XFR_SECRET: &str = "K2tnaXZlbWVzb21lc2VjcmV0Ynl0ZXM=";
pub const OTHER_SECRET: &str = "b3RoZXItc2VjcmV0LW1hdGVyaWFs";

/// Fixed signing time so signed messages are reproducible
pub const TIME_SIGNED: u64 = 1_700_000_000;

/// An AXFR query for `zone`
pub fn axfr_query(id: u16, zone: &str) -> Vec<u8> {
    let header = DnsHeader {
        id,
        qdcount: 1,
        ..Default::default()
    };
    let mut msg = Vec::new();
    header.compose(&mut msg).unwrap();
    DomainName::parse(zone).unwrap().compose(&mut msg);
    msg.extend_from_slice(&252u16.to_be_bytes());
    msg.extend_from_slice(&1u16.to_be_bytes());
    msg
}

/// An AXFR query for `zone`, signed with `key`
pub fn signed_axfr(id: u16, zone: &str, key: &TsigKey) -> Vec<u8> {
    let mut msg = axfr_query(id, zone);
    sign_message(&mut msg, key, TIME_SIGNED, 300).unwrap();
    msg
}

pub fn addr(text: &str) -> SocketAddr {
    text.parse().unwrap()
}

pub fn unsigned(peer: &str) -> QueryFacts {
    QueryFacts::new(addr(peer), axfr_query(1, "example.com"))
}

/// Options loaded from TOML text with every capability enabled
pub fn load_options(toml: &str) -> Options {
    options_with(toml, Capabilities::ALL)
}

pub fn options_with(toml: &str, caps: Capabilities) -> Options {
    loader::load_str("test.toml", toml, caps).unwrap()
}

/// A zone `example.com` with the given provide-xfr statements and the two
/// standard keys `xfr.example.` and `other.example.`
pub fn provide_xfr_config(statements: &[&str]) -> String {
    let list = statements
        .iter()
        .map(|s| format!("\"{}\"", s))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"
[[key]]
name = "xfr.example."
algorithm = "hmac-sha256"
secret = "{XFR_SECRET}"

[[key]]
name = "other.example."
algorithm = "hmac-sha256"
secret = "{OTHER_SECRET}"

[[zone]]
name = "example.com"
zonefile = "example.com.zone"
provide-xfr = [{list}]
"#
    )
}

pub fn example_com() -> DomainName {
    DomainName::parse("example.com").unwrap()
}
