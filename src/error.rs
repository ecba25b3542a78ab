use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Buffer too small: need {need} bytes, have {have} bytes")]
    BufferTooSmall { need: usize, have: usize },

    #[error("Invalid label length: {0}")]
    InvalidLabelLength(usize),

    #[error("Empty label in DNS name")]
    EmptyLabel,

    #[error("DNS name too long")]
    NameTooLong,

    #[error("Invalid escape sequence in DNS name: {0}")]
    InvalidEscape(String),

    #[error("Bad compression pointer at offset {0}")]
    BadCompressionPointer(usize),

    #[error("Invalid DNS header")]
    InvalidHeader,

    #[error("Invalid TSIG record: {0}")]
    InvalidTsig(String),
}

impl From<std::io::Error> for DnsError {
    fn from(err: std::io::Error) -> Self {
        DnsError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DnsError>;
