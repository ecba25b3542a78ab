use super::{KeyRegistry, verify_mac};
use crate::config::KeyOptions;
use crate::query::QueryFacts;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Why a signed request did not authenticate against a key definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("query has no tsig")]
    Missing,

    #[error("query tsig unknown key/algorithm")]
    UnknownKey,

    #[error("query tsig wrong key")]
    WrongKey,

    #[error("query tsig wrong algorithm")]
    WrongAlgorithm,

    #[error("query bad tsig signature")]
    BadSignature,
}

/// Check that `query` was signed with the key `definition` describes.
///
/// The key is looked up by the name and algorithm the request carries, and
/// must then be the very key bound to `definition`, under the algorithm
/// name the definition spells out.
pub fn authenticate(
    definition: &KeyOptions,
    query: &QueryFacts,
    registry: &KeyRegistry,
) -> Result<(), AuthFailure> {
    let Some(record) = query.tsig().record() else {
        debug!("{}", AuthFailure::Missing);
        return Err(AuthFailure::Missing);
    };

    let Some(key) = record
        .algorithm()
        .and_then(|algorithm| registry.get(&record.key_name, algorithm))
    else {
        debug!(
            "{}: {} {}",
            AuthFailure::UnknownKey,
            record.key_name,
            record.algorithm_name
        );
        return Err(AuthFailure::UnknownKey);
    };

    let bound = definition.tsig_key.as_ref();
    if !bound.is_some_and(|bound| Arc::ptr_eq(bound, key)) {
        debug!("{}: expected {}", AuthFailure::WrongKey, definition.name);
        return Err(AuthFailure::WrongKey);
    }

    if key.algorithm().short_name() != definition.algorithm {
        debug!(
            "{}: {} vs {}",
            AuthFailure::WrongAlgorithm,
            key.algorithm(),
            definition.algorithm
        );
        return Err(AuthFailure::WrongAlgorithm);
    }

    verify_mac(query.message(), record, key).map_err(|e| {
        debug!("{}: {}", AuthFailure::BadSignature, e);
        AuthFailure::BadSignature
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::{DnsHeader, DomainName};
    use crate::tsig::{bind_keys, sign_message};

    const SECRET: &str = "K2tnaXZlbWVzb21lc2VjcmV0Ynl0ZXM=";

    fn signed_query(key: &crate::tsig::TsigKey) -> Vec<u8> {
        let mut msg = Vec::new();
        DnsHeader {
            id: 99,
            qdcount: 1,
            ..Default::default()
        }
        .compose(&mut msg)
        .unwrap();
        DomainName::parse("example.org").unwrap().compose(&mut msg);
        msg.extend_from_slice(&[0, 252, 0, 1]);
        sign_message(&mut msg, key, 1_700_000_000, 300).unwrap();
        msg
    }

    fn peer() -> std::net::SocketAddr {
        "192.0.2.1:5353".parse().unwrap()
    }

    #[test]
    fn test_authenticate_success() {
        let mut defs = vec![KeyOptions::new("xfr.", "hmac-sha256", SECRET)];
        let registry = bind_keys(&mut defs);
        let key = defs[0].tsig_key.clone().unwrap();
        let query = QueryFacts::new(peer(), signed_query(&key));
        assert_eq!(authenticate(&defs[0], &query, &registry), Ok(()));
    }

    #[test]
    fn test_authenticate_missing() {
        let mut defs = vec![KeyOptions::new("xfr.", "hmac-sha256", SECRET)];
        let registry = bind_keys(&mut defs);
        let query = QueryFacts::unsigned(peer());
        assert_eq!(
            authenticate(&defs[0], &query, &registry),
            Err(AuthFailure::Missing)
        );
    }

    #[test]
    fn test_authenticate_unknown_key() {
        let mut defs = vec![KeyOptions::new("xfr.", "hmac-sha256", SECRET)];
        let registry = bind_keys(&mut defs);
        let stranger = crate::tsig::TsigKey::from_base64(
            DomainName::parse("stranger.").unwrap(),
            crate::tsig::TsigAlgorithm::HmacSha256,
            SECRET,
        )
        .unwrap();
        let query = QueryFacts::new(peer(), signed_query(&stranger));
        assert_eq!(
            authenticate(&defs[0], &query, &registry),
            Err(AuthFailure::UnknownKey)
        );
    }

    #[test]
    fn test_authenticate_wrong_key() {
        let mut defs = vec![
            KeyOptions::new("a.", "hmac-sha256", SECRET),
            KeyOptions::new("b.", "hmac-sha256", SECRET),
        ];
        let registry = bind_keys(&mut defs);
        let key_b = defs[1].tsig_key.clone().unwrap();
        let query = QueryFacts::new(peer(), signed_query(&key_b));
        assert_eq!(
            authenticate(&defs[0], &query, &registry),
            Err(AuthFailure::WrongKey)
        );
    }

    #[test]
    fn test_authenticate_algorithm_spelling_is_exact() {
        let mut defs = vec![KeyOptions::new("xfr.", "HMAC-SHA256", SECRET)];
        let registry = bind_keys(&mut defs);
        let key = defs[0].tsig_key.clone().unwrap();
        let query = QueryFacts::new(peer(), signed_query(&key));
        assert_eq!(
            authenticate(&defs[0], &query, &registry),
            Err(AuthFailure::WrongAlgorithm)
        );
    }

    #[test]
    fn test_authenticate_bad_signature() {
        let mut defs = vec![KeyOptions::new("xfr.", "hmac-sha256", SECRET)];
        let registry = bind_keys(&mut defs);
        let key = defs[0].tsig_key.clone().unwrap();
        let mut msg = signed_query(&key);
        msg[2] ^= 0x01; // RD flag
        let query = QueryFacts::new(peer(), msg);
        assert_eq!(
            authenticate(&defs[0], &query, &registry),
            Err(AuthFailure::BadSignature)
        );
    }
}
