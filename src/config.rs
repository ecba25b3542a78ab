//! Server options, key definitions and per-zone access lists
//!
//! One [`Options`] value holds a whole configuration generation. It is built
//! by the [`loader`], never mutated once published, and replaced as a whole
//! through [`OptionsHandle`] on reload.

pub mod diagnostics;
pub mod errors;
pub mod loader;
pub mod reload;

pub use diagnostics::{Diagnostic, ParseContext};
pub use errors::{ConfigError, LoadError};
pub use reload::OptionsHandle;

use crate::acl::{AclContext, AclDirection, AclEntry, AclVerdict, check_incoming};
use crate::capabilities::Capabilities;
use crate::dns::DomainName;
use crate::query::QueryFacts;
use crate::tsig::{self, KeyRegistry, TsigKey};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// The `[server]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ServerOptions {
    /// Addresses to listen on, all interfaces if empty
    pub ip_address: Vec<String>,
    pub ip4_only: bool,
    pub ip6_only: bool,
    pub debug_mode: bool,
    pub database: String,
    pub identity: String,
    pub logfile: Option<String>,
    pub server_count: u32,
    pub tcp_count: u32,
    pub pidfile: String,
    pub port: u16,
    /// Seconds between statistics dumps, 0 to disable
    pub statistics: u32,
    pub chroot: Option<String>,
    pub username: String,
    pub zonesdir: Option<String>,
    pub difffile: Option<String>,
    pub xfrdfile: Option<String>,
    /// Seconds
    pub xfrd_reload_timeout: u32,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            ip_address: Vec::new(),
            ip4_only: false,
            ip6_only: false,
            debug_mode: false,
            database: "/var/db/nsd/nsd.db".to_string(),
            identity: "unidentified server".to_string(),
            logfile: None,
            server_count: 1,
            tcp_count: 10,
            pidfile: "/var/run/nsd.pid".to_string(),
            port: 53,
            statistics: 0,
            chroot: None,
            username: "nsd".to_string(),
            zonesdir: None,
            difffile: None,
            xfrdfile: None,
            xfrd_reload_timeout: 10,
        }
    }
}

/// A `[[key]]` definition and the runtime key bound from it
#[derive(Clone)]
pub struct KeyOptions {
    pub name: String,
    pub algorithm: String,
    /// Base64 secret as written
    pub secret: String,
    /// Set by key binding; `None` if the definition did not bind
    pub tsig_key: Option<Arc<TsigKey>>,
}

impl KeyOptions {
    pub fn new(
        name: impl Into<String>,
        algorithm: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            algorithm: algorithm.into(),
            secret: secret.into(),
            tsig_key: None,
        }
    }
}

impl fmt::Debug for KeyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyOptions")
            .field("name", &self.name)
            .field("algorithm", &self.algorithm)
            .field("bound", &self.tsig_key.is_some())
            .finish_non_exhaustive()
    }
}

/// Index of a key definition within its [`Options`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyRef(usize);

impl KeyRef {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// A `[[zone]]` section
#[derive(Debug, Clone)]
pub struct ZoneOptions {
    /// Zone name as written
    pub name: String,
    pub apex: DomainName,
    pub zonefile: String,
    pub allow_notify: Vec<AclEntry>,
    pub request_xfr: Vec<AclEntry>,
    pub notify: Vec<AclEntry>,
    pub provide_xfr: Vec<AclEntry>,
    /// False if any keyed entry failed to resolve
    pub zone_is_ok: bool,
}

impl ZoneOptions {
    pub fn new(name: impl Into<String>, zonefile: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        let apex = DomainName::parse(&name).map_err(|source| ConfigError::InvalidZoneName {
            name: name.clone(),
            source,
        })?;
        Ok(Self {
            name,
            apex,
            zonefile: zonefile.into(),
            allow_notify: Vec::new(),
            request_xfr: Vec::new(),
            notify: Vec::new(),
            provide_xfr: Vec::new(),
            zone_is_ok: true,
        })
    }

    pub fn acl(&self, direction: AclDirection) -> &[AclEntry] {
        match direction {
            AclDirection::AllowNotify => &self.allow_notify,
            AclDirection::RequestXfr => &self.request_xfr,
            AclDirection::Notify => &self.notify,
            AclDirection::ProvideXfr => &self.provide_xfr,
        }
    }

    pub fn acl_mut(&mut self, direction: AclDirection) -> &mut Vec<AclEntry> {
        match direction {
            AclDirection::AllowNotify => &mut self.allow_notify,
            AclDirection::RequestXfr => &mut self.request_xfr,
            AclDirection::Notify => &mut self.notify,
            AclDirection::ProvideXfr => &mut self.provide_xfr,
        }
    }

    /// A zone we transfer in from masters
    pub fn is_slave(&self) -> bool {
        !self.request_xfr.is_empty()
    }
}

/// One configuration generation
#[derive(Debug)]
pub struct Options {
    pub server: ServerOptions,
    zones: BTreeMap<DomainName, ZoneOptions>,
    keys: Vec<KeyOptions>,
    registry: KeyRegistry,
    capabilities: Capabilities,
}

impl Options {
    pub fn new(server: ServerOptions, capabilities: Capabilities) -> Self {
        Self {
            server,
            zones: BTreeMap::new(),
            keys: Vec::new(),
            registry: KeyRegistry::new(),
            capabilities,
        }
    }

    /// Read and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        loader::load_file(path.as_ref(), Capabilities::default())
    }

    /// Add a zone. Fails if a zone with the same apex exists.
    pub fn insert_zone(&mut self, zone: ZoneOptions) -> Result<(), ConfigError> {
        if self.zones.contains_key(&zone.apex) {
            return Err(ConfigError::DuplicateZone(zone.name));
        }
        self.zones.insert(zone.apex.clone(), zone);
        Ok(())
    }

    pub fn find_zone(&self, apex: &DomainName) -> Option<&ZoneOptions> {
        self.zones.get(apex)
    }

    /// Zones in canonical name order
    pub fn zones(&self) -> impl Iterator<Item = &ZoneOptions> {
        self.zones.values()
    }

    /// Add a key definition. Fails if one with the same name exists.
    pub fn add_key(&mut self, key: KeyOptions) -> Result<(), ConfigError> {
        if self.find_key(&key.name).is_some() {
            return Err(ConfigError::DuplicateKey(key.name));
        }
        self.keys.push(key);
        Ok(())
    }

    pub fn find_key(&self, name: &str) -> Option<&KeyOptions> {
        self.keys.iter().find(|k| k.name == name)
    }

    pub fn keys(&self) -> &[KeyOptions] {
        &self.keys
    }

    /// Bind every key definition to a runtime key.
    pub fn bind_keys(&mut self) {
        if !self.capabilities.tsig {
            info!("tsig support disabled, {} keys not bound", self.keys.len());
            self.registry = KeyRegistry::new();
            return;
        }
        self.registry = tsig::bind_keys(&mut self.keys);
    }

    /// Point every keyed ACL entry at its key definition.
    ///
    /// Names must match a definition exactly. Returns one error per entry
    /// that names an unknown key; those entries stay unresolved and their
    /// zone is marked not ok.
    pub fn resolve_acl_keys(&mut self) -> Vec<ConfigError> {
        let keys = &self.keys;
        let mut errors = Vec::new();

        for zone in self.zones.values_mut() {
            let zone_name = zone.name.clone();
            let mut zone_ok = true;
            for direction in AclDirection::ALL {
                for entry in zone.acl_mut(direction).iter_mut() {
                    let Some(name) = entry.key_name() else {
                        continue;
                    };
                    match keys.iter().position(|k| k.name == name) {
                        Some(index) => entry.key_ref = Some(KeyRef::new(index)),
                        None => {
                            errors.push(ConfigError::UnknownKey {
                                key: name.to_string(),
                                zone: zone_name.clone(),
                            });
                            zone_ok = false;
                        }
                    }
                }
            }
            zone.zone_is_ok = zone_ok;
        }
        errors
    }

    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn acl_context(&self) -> AclContext<'_> {
        AclContext {
            keys: &self.keys,
            registry: &self.registry,
            capabilities: self.capabilities,
        }
    }

    /// Evaluate one of a zone's lists for a request.
    ///
    /// Returns `None` if the zone is not configured.
    pub fn check_incoming(
        &self,
        apex: &DomainName,
        direction: AclDirection,
        query: &QueryFacts,
    ) -> Option<AclVerdict<'_>> {
        let Some(zone) = self.find_zone(apex) else {
            debug!("no zone {} configured", apex);
            return None;
        };
        Some(check_incoming(zone.acl(direction), query, &self.acl_context()))
    }
}
