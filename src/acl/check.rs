//! Evaluation of an ACL against one request

use super::{AclEntry, addr_matches, key_matches};
use crate::capabilities::Capabilities;
use crate::config::KeyOptions;
use crate::query::QueryFacts;
use crate::tsig::{AuthFailure, KeyRegistry, authenticate};
use thiserror::Error;
use tracing::{debug, info, warn};

/// What an evaluation needs besides the list: the key definitions entries
/// refer to, the runtime keys, and the enabled capabilities.
#[derive(Debug, Clone, Copy)]
pub struct AclContext<'a> {
    pub keys: &'a [KeyOptions],
    pub registry: &'a KeyRegistry,
    pub capabilities: Capabilities,
}

impl<'a> AclContext<'a> {
    /// Key definition a keyed entry resolved to
    pub fn definition(&self, entry: &AclEntry) -> Option<&'a KeyOptions> {
        entry.key_ref().and_then(|r| self.keys.get(r.index()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("bad tsig RR format")]
    BadTsigFormat,

    #[error("no acl entry matches")]
    NoMatch,

    #[error("peer is blocked")]
    Blocked,

    #[error(transparent)]
    Tsig(#[from] AuthFailure),
}

/// Outcome of [`check_incoming`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AclVerdict<'a> {
    /// Index of the last matching entry, if access is granted
    pub matched: Option<usize>,
    /// The entry that decided: the blocking entry, or the first match of an
    /// allowed request
    pub reason: Option<&'a AclEntry>,
    pub denial: Option<Denial>,
}

impl<'a> AclVerdict<'a> {
    fn allowed(index: usize, reason: &'a AclEntry) -> Self {
        Self {
            matched: Some(index),
            reason: Some(reason),
            denial: None,
        }
    }

    fn denied(reason: Option<&'a AclEntry>, denial: Denial) -> Self {
        Self {
            matched: None,
            reason,
            denial: Some(denial),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.matched.is_some()
    }

    /// The match index with -1 for a denial
    pub fn match_index(&self) -> isize {
        self.matched.map_or(-1, |i| i as isize)
    }
}

/// Decide whether `query` may do what `acl` guards.
///
/// Entries are tested in order. A matching `BLOCKED` entry denies at once.
/// Otherwise the verdict carries the index of the last matching entry,
/// while the TSIG signature is verified against the first matching entry.
pub fn check_incoming<'a>(
    acl: &'a [AclEntry],
    query: &QueryFacts,
    ctx: &AclContext<'_>,
) -> AclVerdict<'a> {
    if ctx.capabilities.tsig && query.tsig().is_malformed() {
        warn!("{} from {}", Denial::BadTsigFormat, query.peer());
        return AclVerdict::denied(None, Denial::BadTsigFormat);
    }

    let mut found_match = None;
    let mut first_match: Option<&'a AclEntry> = None;

    for (number, entry) in acl.iter().enumerate() {
        debug!("testing acl {}", entry);
        if addr_matches(entry, query.peer(), ctx.capabilities) && key_matches(entry, query, ctx) {
            let first = *first_match.get_or_insert(entry);
            if entry.is_blocked() {
                warn!("{} blocked by acl {}", query.peer(), entry);
                return AclVerdict::denied(Some(entry), Denial::Blocked);
            }
            debug!("acl {} matches, first match {}", entry, first);
            found_match = Some(number);
        }
    }

    let (Some(number), Some(first)) = (found_match, first_match) else {
        debug!("{} matches no acl entry", query.peer());
        return AclVerdict::denied(None, Denial::NoMatch);
    };

    if !first.is_nokey() && !first.is_blocked() {
        debug!("TSIG check for match {}", first);
        let result = match ctx.definition(first) {
            Some(definition) => authenticate(definition, query, ctx.registry),
            None => Err(AuthFailure::UnknownKey),
        };
        if let Err(failure) = result {
            warn!("{} from {}", failure, query.peer());
            return AclVerdict::denied(None, failure.into());
        }
        info!("query good tsig signature");
    }

    AclVerdict::allowed(number, first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyRef;
    use crate::dns::{DnsHeader, DomainName};
    use crate::tsig::{bind_keys, sign_message};

    fn acl(statements: &[&str]) -> Vec<AclEntry> {
        statements
            .iter()
            .map(|s| AclEntry::parse_statement(s, Capabilities::ALL).unwrap())
            .collect()
    }

    fn peer(addr: &str) -> QueryFacts {
        QueryFacts::unsigned(addr.parse().unwrap())
    }

    fn check<'a>(list: &'a [AclEntry], query: &QueryFacts) -> AclVerdict<'a> {
        let registry = KeyRegistry::new();
        let ctx = AclContext {
            keys: &[],
            registry: &registry,
            capabilities: Capabilities::ALL,
        };
        check_incoming(list, query, &ctx)
    }

    #[test]
    fn test_empty_list() {
        let verdict = check(&[], &peer("10.0.0.1:53"));
        assert_eq!(verdict.match_index(), -1);
        assert_eq!(verdict.reason, None);
        assert_eq!(verdict.denial, Some(Denial::NoMatch));
    }

    #[test]
    fn test_block_precedence() {
        let list = acl(&["10.0.0.1 NOKEY", "10.0.0.0/24 BLOCKED"]);
        let verdict = check(&list, &peer("10.0.0.1:53"));
        assert!(!verdict.is_allowed());
        assert_eq!(verdict.reason, Some(&list[1]));
        assert_eq!(verdict.denial, Some(Denial::Blocked));
    }

    #[test]
    fn test_last_allowed_first_match() {
        let list = acl(&["10.0.0.0/8 NOKEY", "10.0.0.1 NOKEY"]);
        let verdict = check(&list, &peer("10.0.0.1:53"));
        assert_eq!(verdict.match_index(), 1);
        assert_eq!(verdict.reason, Some(&list[0]));
        assert_eq!(verdict.denial, None);
    }

    #[test]
    fn test_no_match() {
        let list = acl(&["10.0.0.0/8 NOKEY"]);
        let verdict = check(&list, &peer("192.0.2.1:53"));
        assert_eq!(verdict, AclVerdict::denied(None, Denial::NoMatch));
    }

    #[test]
    fn test_malformed_tsig_denies_before_scan() {
        let mut msg = Vec::new();
        DnsHeader {
            arcount: 1,
            ..Default::default()
        }
        .compose(&mut msg)
        .unwrap();
        let query = QueryFacts::new("10.0.0.1:53".parse().unwrap(), msg);
        let list = acl(&["10.0.0.1 NOKEY"]);
        let verdict = check(&list, &query);
        assert_eq!(verdict, AclVerdict::denied(None, Denial::BadTsigFormat));
    }

    #[test]
    fn test_malformed_tsig_ignored_without_tsig_support() {
        let mut msg = Vec::new();
        DnsHeader {
            arcount: 1,
            ..Default::default()
        }
        .compose(&mut msg)
        .unwrap();
        let query = QueryFacts::new("10.0.0.1:53".parse().unwrap(), msg);
        let list = acl(&["10.0.0.1 NOKEY"]);
        let registry = KeyRegistry::new();
        let ctx = AclContext {
            keys: &[],
            registry: &registry,
            capabilities: Capabilities::ALL.without_tsig(),
        };
        assert_eq!(check_incoming(&list, &query, &ctx).match_index(), 0);
    }

    #[test]
    fn test_keyed_entry_signature() {
        let mut keys = vec![KeyOptions::new(
            "xfr.example.",
            "hmac-sha256",
            "c2VjcmV0LXNlY3JldC1zZWNyZXQ=",
        )];
        let registry = bind_keys(&mut keys);
        let mut list = acl(&["10.0.0.0/8 xfr.example."]);
        list[0].key_ref = Some(KeyRef::new(0));
        let ctx = AclContext {
            keys: &keys,
            registry: &registry,
            capabilities: Capabilities::ALL,
        };

        let mut msg = Vec::new();
        DnsHeader {
            id: 3,
            qdcount: 1,
            ..Default::default()
        }
        .compose(&mut msg)
        .unwrap();
        DomainName::parse("example.").unwrap().compose(&mut msg);
        msg.extend_from_slice(&[0, 252, 0, 1]);
        let unsigned = msg.clone();
        let key = keys[0].tsig_key.clone().unwrap();
        sign_message(&mut msg, &key, 1_700_000_000, 300).unwrap();

        let signed = QueryFacts::new("10.1.1.1:53".parse().unwrap(), msg.clone());
        assert_eq!(check_incoming(&list, &signed, &ctx).match_index(), 0);

        // Unsigned requests fail the key matcher and so match nothing
        let plain = QueryFacts::new("10.1.1.1:53".parse().unwrap(), unsigned);
        assert_eq!(
            check_incoming(&list, &plain, &ctx).denial,
            Some(Denial::NoMatch)
        );

        // Same key name, broken MAC: the first match fails authentication
        let last = msg.len() - 7;
        msg[last] ^= 0xFF;
        let forged = QueryFacts::new("10.1.1.1:53".parse().unwrap(), msg);
        let verdict = check_incoming(&list, &forged, &ctx);
        assert_eq!(verdict.denial, Some(Denial::Tsig(AuthFailure::BadSignature)));
        assert_eq!(verdict.reason, None);

        // Keyed entries never match without TSIG support
        let ctx = AclContext {
            capabilities: Capabilities::ALL.without_tsig(),
            ..ctx
        };
        assert_eq!(
            check_incoming(&list, &signed, &ctx).denial,
            Some(Denial::NoMatch)
        );
    }
}
