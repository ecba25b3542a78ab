//! TSIG (Transaction Signature) authentication for zone transfer and notify
//! requests
//!
//! Implements the request side of RFC 8945 (formerly RFC 2845): locating the
//! TSIG record of a received message, keeping the runtime keys of a loaded
//! configuration, and verifying a request MAC against one of them.

pub mod authenticate;
pub mod mac;
pub mod record;
pub mod registry;

pub use authenticate::{AuthFailure, authenticate};
pub use mac::{MacError, sign_message, unix_now, verify_mac};
pub use record::{TsigRecord, TsigState};
pub use registry::{KeyRegistry, MAX_SECRET_LEN, bind_keys, decode_secret};

use crate::dns::DomainName;
use crate::error::DnsError;
use ring::hmac;
use std::fmt;
use thiserror::Error;

/// TSIG algorithm types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TsigAlgorithm {
    HmacMd5,
    HmacSha1,
    HmacSha256,
    HmacSha384,
    HmacSha512,
}

impl TsigAlgorithm {
    pub const ALL: [TsigAlgorithm; 5] = [
        TsigAlgorithm::HmacMd5,
        TsigAlgorithm::HmacSha1,
        TsigAlgorithm::HmacSha256,
        TsigAlgorithm::HmacSha384,
        TsigAlgorithm::HmacSha512,
    ];

    /// Name used in configuration files
    pub fn short_name(&self) -> &'static str {
        match self {
            TsigAlgorithm::HmacMd5 => "hmac-md5",
            TsigAlgorithm::HmacSha1 => "hmac-sha1",
            TsigAlgorithm::HmacSha256 => "hmac-sha256",
            TsigAlgorithm::HmacSha384 => "hmac-sha384",
            TsigAlgorithm::HmacSha512 => "hmac-sha512",
        }
    }

    /// Name carried in the algorithm field of the TSIG record
    pub fn wire_name(&self) -> &'static str {
        match self {
            TsigAlgorithm::HmacMd5 => "hmac-md5.sig-alg.reg.int.",
            TsigAlgorithm::HmacSha1 => "hmac-sha1.",
            TsigAlgorithm::HmacSha256 => "hmac-sha256.",
            TsigAlgorithm::HmacSha384 => "hmac-sha384.",
            TsigAlgorithm::HmacSha512 => "hmac-sha512.",
        }
    }

    /// HMAC implementation, if this build has one
    fn hmac_algorithm(&self) -> Option<&'static hmac::Algorithm> {
        match self {
            TsigAlgorithm::HmacMd5 => None,
            TsigAlgorithm::HmacSha1 => Some(&hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY),
            TsigAlgorithm::HmacSha256 => Some(&hmac::HMAC_SHA256),
            TsigAlgorithm::HmacSha384 => Some(&hmac::HMAC_SHA384),
            TsigAlgorithm::HmacSha512 => Some(&hmac::HMAC_SHA512),
        }
    }

    /// Parse algorithm from its configuration name
    pub fn from_short_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        let name = name.trim_end_matches('.');
        Self::ALL.into_iter().find(|alg| alg.short_name() == name)
    }

    /// Identify the algorithm named in a TSIG record
    pub fn from_wire_name(name: &DomainName) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| {
            let expected = alg.wire_name().trim_end_matches('.').split('.');
            name.label_count() == expected.clone().count()
                && name
                    .labels()
                    .zip(expected)
                    .all(|(label, want)| label.eq_ignore_ascii_case(want.as_bytes()))
        })
    }
}

impl fmt::Display for TsigAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Errors turning a key definition into a runtime key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("Failed to parse tsig key name {name}: {source}")]
    InvalidName {
        name: String,
        #[source]
        source: DnsError,
    },

    #[error("Unknown TSIG algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("TSIG algorithm {0} is not supported by this build")]
    UnsupportedAlgorithm(TsigAlgorithm),

    #[error("Failed to parse tsig key data: {0}")]
    Decode(String),

    #[error("TSIG secret of {size} bytes exceeds the maximum of {max}")]
    SecretTooLarge { size: usize, max: usize },
}

/// Decoded secret material, ready for MAC computation
pub struct TsigKey {
    name: DomainName,
    algorithm: TsigAlgorithm,
    secret: Box<[u8]>,
    key: hmac::Key,
}

impl TsigKey {
    /// Create a new TSIG key from raw secret bytes
    pub fn new(
        name: DomainName,
        algorithm: TsigAlgorithm,
        secret: Vec<u8>,
    ) -> Result<Self, KeyError> {
        let hmac_algorithm = algorithm
            .hmac_algorithm()
            .ok_or(KeyError::UnsupportedAlgorithm(algorithm))?;
        let key = hmac::Key::new(*hmac_algorithm, &secret);
        Ok(Self {
            name,
            algorithm,
            secret: secret.into_boxed_slice(),
            key,
        })
    }

    /// Create a key from a base64 encoded secret
    pub fn from_base64(
        name: DomainName,
        algorithm: TsigAlgorithm,
        secret: &str,
    ) -> Result<Self, KeyError> {
        Self::new(name, algorithm, decode_secret(secret)?)
    }

    pub fn name(&self) -> &DomainName {
        &self.name
    }

    pub fn algorithm(&self) -> TsigAlgorithm {
        self.algorithm
    }

    /// Length of the decoded secret in bytes
    pub fn size(&self) -> usize {
        self.secret.len()
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub(crate) fn hmac_key(&self) -> &hmac::Key {
        &self.key
    }
}

impl fmt::Debug for TsigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TsigKey")
            .field("name", &self.name)
            .field("algorithm", &self.algorithm)
            .field("size", &self.secret.len())
            .finish_non_exhaustive()
    }
}
