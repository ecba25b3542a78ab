use super::Diagnostic;
use crate::acl::AclParseError;
use crate::error::DnsError;
use std::io;
use thiserror::Error;

/// A single problem found while assembling a configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("duplicate zone {0}")]
    DuplicateZone(String),

    #[error("invalid zone name {name}: {source}")]
    InvalidZoneName {
        name: String,
        #[source]
        source: DnsError,
    },

    #[error("duplicate key {0}")]
    DuplicateKey(String),

    #[error("key {key} in zone {zone} could not be found")]
    UnknownKey { key: String, zone: String },

    #[error(transparent)]
    Acl(#[from] AclParseError),
}

/// Why a configuration file was not loaded
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not open {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: io::Error,
    },

    #[error("read {file} failed: {} errors in configuration file", diagnostics.len())]
    Invalid {
        file: String,
        diagnostics: Vec<Diagnostic>,
    },
}

impl LoadError {
    /// Diagnostics of a rejected file, empty for I/O failures
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            LoadError::Invalid { diagnostics, .. } => diagnostics,
            LoadError::Io { .. } => &[],
        }
    }
}
