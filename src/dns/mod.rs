//! The small slice of the DNS wire format the access layer needs: names,
//! the message header, and a walker that finds record boundaries.

pub mod header;
pub mod name;
pub mod scan;

pub use header::{DnsHeader, HEADER_LEN};
pub use name::DomainName;
pub use scan::{CLASS_ANY, RecordPosition, TYPE_TSIG};
