pub mod acl;
pub mod capabilities;
pub mod config;
pub mod dns;
pub mod error;
pub mod query;
pub mod tsig;

pub use acl::{AclDirection, AclEntry, AclVerdict, Denial, check_incoming};
pub use capabilities::Capabilities;
pub use config::{KeyOptions, LoadError, Options, OptionsHandle, ZoneOptions};
pub use dns::DomainName;
pub use error::DnsError;
pub use query::QueryFacts;
pub use tsig::{TsigAlgorithm, TsigKey};
