//! Peer address matching against a single ACL entry

use super::{AclEntry, AddressFamily, RangeType};
use crate::capabilities::Capabilities;
use std::net::{IpAddr, SocketAddr};

/// An address as big-endian 32-bit words, with the number of words used
fn words(addr: &IpAddr) -> ([u32; 4], usize) {
    match addr {
        IpAddr::V4(v4) => ([u32::from(*v4), 0, 0, 0], 1),
        IpAddr::V6(v6) => {
            let o = v6.octets();
            let mut w = [0u32; 4];
            for (i, chunk) in o.chunks_exact(4).enumerate() {
                w[i] = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            }
            (w, 4)
        }
    }
}

/// True if `a` and `b` agree on every bit set in `mask`.
pub fn match_mask(a: &[u32], b: &[u32], mask: &[u32]) -> bool {
    a.iter()
        .zip(b)
        .zip(mask)
        .all(|((a, b), m)| (a & m) == (b & m))
}

/// True if `min <= x <= max`, all read as one big-endian integer.
pub fn match_range(min: &[u32], x: &[u32], max: &[u32]) -> bool {
    let mut at_min = true;
    let mut at_max = true;
    for ((&lo, &v), &hi) in min.iter().zip(x).zip(max) {
        if at_min {
            if v < lo {
                return false;
            }
            if v > lo {
                at_min = false;
            }
        }
        if at_max {
            if v > hi {
                return false;
            }
            if v < hi {
                at_max = false;
            }
        }
        if !at_min && !at_max {
            return true;
        }
    }
    true
}

/// Whether the peer falls inside the address spec of `entry`.
pub fn addr_matches(entry: &AclEntry, peer: &SocketAddr, caps: Capabilities) -> bool {
    let family = entry.family();
    if family != AddressFamily::of(&peer.ip()) {
        return false;
    }
    if family == AddressFamily::V6 && !caps.ipv6 {
        return false;
    }
    if entry.port != 0 && entry.port != peer.port() {
        return false;
    }

    let (stored, n) = words(&entry.addr);
    let (bound, _) = words(&entry.range_mask);
    let (addr, _) = words(&peer.ip());
    let (stored, bound, addr) = (&stored[..n], &bound[..n], &addr[..n]);

    match entry.range_type {
        RangeType::Single => stored == addr,
        RangeType::Mask | RangeType::Subnet => match_mask(stored, addr, bound),
        RangeType::MinMax => match_range(stored, addr, bound),
    }
}
