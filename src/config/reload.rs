use super::{LoadError, Options, loader};
use crate::capabilities::Capabilities;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Publishes the current configuration generation.
///
/// Readers take an `Arc` to one generation and evaluate against it without
/// further locking. A reload builds the next generation off to the side and
/// swaps it in only if the file loaded cleanly.
#[derive(Debug)]
pub struct OptionsHandle {
    current: RwLock<Arc<Options>>,
    path: PathBuf,
    capabilities: Capabilities,
}

impl OptionsHandle {
    /// Load the first generation from `path`.
    pub fn open(path: impl Into<PathBuf>, capabilities: Capabilities) -> Result<Self, LoadError> {
        let path = path.into();
        let options = loader::load_file(&path, capabilities)?;
        Ok(Self {
            current: RwLock::new(Arc::new(options)),
            path,
            capabilities,
        })
    }

    pub fn current(&self) -> Arc<Options> {
        Arc::clone(&self.current.read())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file. On failure the current generation stays in place.
    pub fn reload(&self) -> Result<Arc<Options>, LoadError> {
        let next = match loader::load_file(&self.path, self.capabilities) {
            Ok(options) => Arc::new(options),
            Err(e) => {
                error!("Failed to reload configuration, keeping current: {}", e);
                for diagnostic in e.diagnostics() {
                    error!("{}", diagnostic);
                }
                return Err(e);
            }
        };

        let previous = {
            let mut current = self.current.write();
            std::mem::replace(&mut *current, Arc::clone(&next))
        };
        log_changes(&previous, &next);
        info!("Configuration reloaded from file: {}", self.path.display());
        Ok(next)
    }
}

fn log_changes(old: &Options, new: &Options) {
    for zone in new.zones() {
        if old.find_zone(&zone.apex).is_none() {
            info!("zone {} added", zone.name);
        }
    }
    for zone in old.zones() {
        if new.find_zone(&zone.apex).is_none() {
            info!("zone {} removed", zone.name);
        }
    }
}
