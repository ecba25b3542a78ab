use super::{KeyError, TsigAlgorithm, TsigKey};
use crate::config::KeyOptions;
use crate::dns::DomainName;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Largest decoded secret accepted from a key definition
pub const MAX_SECRET_LEN: usize = 4000;

/// Decode a base64 secret blob, ignoring embedded whitespace.
pub fn decode_secret(blob: &str) -> Result<Vec<u8>, KeyError> {
    let compact: String = blob.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let secret = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| KeyError::Decode(e.to_string()))?;
    if secret.len() > MAX_SECRET_LEN {
        return Err(KeyError::SecretTooLarge {
            size: secret.len(),
            max: MAX_SECRET_LEN,
        });
    }
    Ok(secret)
}

/// Runtime keys, found by the name and algorithm a request carries
#[derive(Debug, Default)]
pub struct KeyRegistry {
    // Keys sharing a name differ by algorithm
    keys: FxHashMap<DomainName, Vec<Arc<TsigKey>>>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key, replacing any key with the same name and algorithm.
    pub fn insert(&mut self, key: Arc<TsigKey>) {
        let same_name = self.keys.entry(key.name().clone()).or_default();
        match same_name
            .iter_mut()
            .find(|k| k.algorithm() == key.algorithm())
        {
            Some(existing) => {
                debug!("Replaced tsig key with the same name and algorithm");
                *existing = key;
            }
            None => same_name.push(key),
        }
    }

    pub fn get(&self, name: &DomainName, algorithm: TsigAlgorithm) -> Option<&Arc<TsigKey>> {
        self.keys
            .get(name)?
            .iter()
            .find(|k| k.algorithm() == algorithm)
    }

    pub fn len(&self) -> usize {
        self.keys.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn bind_key(def: &KeyOptions) -> Result<TsigKey, KeyError> {
    let name = DomainName::parse(&def.name).map_err(|source| KeyError::InvalidName {
        name: def.name.clone(),
        source,
    })?;
    let algorithm = TsigAlgorithm::from_short_name(&def.algorithm)
        .ok_or_else(|| KeyError::UnknownAlgorithm(def.algorithm.clone()))?;
    TsigKey::from_base64(name, algorithm, &def.secret)
}

/// Turn key definitions into runtime keys.
///
/// Each definition that binds gets its `tsig_key` set and the key lands in
/// the returned registry. A definition that fails is logged and left
/// unbound; ACL entries naming it will never match.
pub fn bind_keys(defs: &mut [KeyOptions]) -> KeyRegistry {
    let mut registry = KeyRegistry::new();
    for def in defs.iter_mut() {
        match bind_key(def) {
            Ok(key) => {
                let key = Arc::new(key);
                registry.insert(Arc::clone(&key));
                def.tsig_key = Some(key);
                info!("tsig key '{}' added", def.name);
            }
            Err(e) => {
                def.tsig_key = None;
                error!("tsig key '{}' not added: {}", def.name, e);
            }
        }
    }
    registry
}
