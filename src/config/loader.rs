//! TOML configuration front end
//!
//! ```toml
//! [server]
//! identity = "ns1"
//!
//! [[key]]
//! name = "xfr.example."
//! algorithm = "hmac-sha256"
//! secret = "K2tnaXZlbWVzb21lc2VjcmV0Ynl0ZXM="
//!
//! [[zone]]
//! name = "example.com"
//! zonefile = "example.com.zone"
//! provide-xfr = ["192.0.2.0/24 xfr.example.", "192.0.2.66 BLOCKED"]
//! ```
//!
//! Every problem is recorded in a [`ParseContext`] with its line; a file
//! with any problem is rejected as a whole.

use super::{
    ConfigError, KeyOptions, LoadError, Options, ParseContext, ServerOptions, ZoneOptions,
};
use crate::acl::{AclDirection, AclEntry};
use crate::capabilities::Capabilities;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use toml::Spanned;
use tracing::{debug, info};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    server: ServerOptions,
    key: Vec<Spanned<RawKey>>,
    zone: Vec<Spanned<RawZone>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawKey {
    name: Option<String>,
    algorithm: Option<String>,
    secret: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawZone {
    name: Option<Spanned<String>>,
    zonefile: Option<String>,
    #[serde(default)]
    allow_notify: Vec<Spanned<String>>,
    #[serde(default)]
    request_xfr: Vec<Spanned<String>>,
    #[serde(default)]
    notify: Vec<Spanned<String>>,
    #[serde(default)]
    provide_xfr: Vec<Spanned<String>>,
}

impl RawZone {
    fn statements(&self, direction: AclDirection) -> &[Spanned<String>] {
        match direction {
            AclDirection::AllowNotify => &self.allow_notify,
            AclDirection::RequestXfr => &self.request_xfr,
            AclDirection::Notify => &self.notify,
            AclDirection::ProvideXfr => &self.provide_xfr,
        }
    }
}

/// Read and validate a configuration file.
pub fn load_file(path: &Path, caps: Capabilities) -> Result<Options, LoadError> {
    let file = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        file: file.clone(),
        source,
    })?;
    load_str(&file, &content, caps)
}

/// Validate configuration text. `filename` is only used in diagnostics.
pub fn load_str(filename: &str, content: &str, caps: Capabilities) -> Result<Options, LoadError> {
    let mut ctx = ParseContext::new(filename, content);

    let raw: RawConfig = match toml::from_str(content) {
        Ok(raw) => raw,
        Err(e) => {
            ctx.error_at(e.span().map(|span| span.start), e.message());
            return Err(ctx.into_error());
        }
    };

    if raw.server.ip4_only && raw.server.ip6_only {
        ctx.error_at(None, "ip4-only and ip6-only cannot both be set");
    }

    let mut options = Options::new(raw.server, caps);

    for spanned in raw.key {
        let offset = Some(spanned.span().start);
        add_key(&mut ctx, &mut options, offset, spanned.into_inner());
    }

    let mut zone_offsets = FxHashMap::default();
    for spanned in raw.zone {
        let offset = spanned.span().start;
        if let Some(name) = add_zone(&mut ctx, &mut options, offset, spanned.get_ref(), caps) {
            zone_offsets.insert(name, offset);
        }
    }

    for error in options.resolve_acl_keys() {
        let offset = match &error {
            ConfigError::UnknownKey { zone, .. } => zone_offsets.get(zone).copied(),
            _ => None,
        };
        ctx.error_at(offset, error.to_string());
    }

    ctx.finish()?;

    options.bind_keys();
    info!(
        "read {}: {} zones, {} keys",
        filename,
        options.zones().count(),
        options.keys().len()
    );
    Ok(options)
}

fn add_key(
    ctx: &mut ParseContext<'_>,
    options: &mut Options,
    offset: Option<usize>,
    raw: RawKey,
) {
    let Some(name) = raw.name else {
        ctx.error_at(offset, "key has no name");
        return;
    };
    let Some(algorithm) = raw.algorithm else {
        ctx.error_at(offset, format!("key {} has no algorithm", name));
        return;
    };
    let Some(secret) = raw.secret else {
        ctx.error_at(offset, format!("key {} has no secret blob", name));
        return;
    };
    if let Err(e) = options.add_key(KeyOptions::new(name, algorithm, secret)) {
        ctx.error_at(offset, e.to_string());
    }
}

/// Returns the zone name if the zone was inserted
fn add_zone(
    ctx: &mut ParseContext<'_>,
    options: &mut Options,
    offset: usize,
    raw: &RawZone,
    caps: Capabilities,
) -> Option<String> {
    let Some(name) = &raw.name else {
        ctx.error_at(Some(offset), "zone has no name");
        return None;
    };
    let name_offset = Some(name.span().start);
    let name = name.get_ref();

    let zonefile = raw.zonefile.clone().unwrap_or_default();
    let mut zone = match ZoneOptions::new(name.as_str(), zonefile) {
        Ok(zone) => zone,
        Err(e) => {
            ctx.error_at(name_offset, e.to_string());
            return None;
        }
    };
    if raw.zonefile.is_none() {
        ctx.error_at(Some(offset), format!("zone {} has no zonefile", name));
    }

    for direction in AclDirection::ALL {
        for statement in raw.statements(direction) {
            match AclEntry::parse_statement(statement.get_ref(), caps) {
                Ok(entry) => zone.acl_mut(direction).push(entry),
                Err(e) => ctx.error_at(
                    Some(statement.span().start),
                    format!("{} {}: {}", direction, statement.get_ref(), ConfigError::from(e)),
                ),
            }
        }
    }

    let entries: usize = AclDirection::ALL.iter().map(|d| zone.acl(*d).len()).sum();
    debug!("zone {} with {} acl entries", name, entries);
    match options.insert_zone(zone) {
        Ok(()) => Some(name.clone()),
        Err(e) => {
            ctx.error_at(Some(offset), e.to_string());
            None
        }
    }
}
