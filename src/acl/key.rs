use super::{AclContext, AclEntry};
use crate::query::QueryFacts;
use tracing::debug;

/// Cheap key test run before any cryptography.
///
/// `NOKEY` and `BLOCKED` entries always pass. A keyed entry needs a TSIG
/// record in the request naming the key bound to the entry's definition.
/// The algorithm is checked later, by the authenticator.
pub fn key_matches(entry: &AclEntry, query: &QueryFacts, ctx: &AclContext<'_>) -> bool {
    if entry.is_nokey() || entry.is_blocked() {
        return true;
    }
    if !ctx.capabilities.tsig {
        debug!("keymatch fail tsig support disabled");
        return false;
    }

    let Some(record) = query.tsig().record() else {
        debug!("keymatch fail query has no TSIG");
        return false;
    };

    let Some(tsig_key) = ctx.definition(entry).and_then(|def| def.tsig_key.as_ref()) else {
        debug!("keymatch fail no config");
        return false;
    };

    if record.key_name != *tsig_key.name() {
        debug!("keymatch fail wrong key name");
        return false;
    }
    true
}
