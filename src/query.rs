use crate::tsig::TsigState;
use bytes::Bytes;
use std::net::SocketAddr;

/// What the access layer knows about one received request: who sent it,
/// the raw message, and the TSIG record found in it.
#[derive(Debug, Clone)]
pub struct QueryFacts {
    peer: SocketAddr,
    message: Bytes,
    tsig: TsigState,
}

impl QueryFacts {
    /// Take in a received message and look for its TSIG record.
    pub fn new(peer: SocketAddr, message: impl Into<Bytes>) -> Self {
        let message = message.into();
        let tsig = TsigState::from_message(&message);
        Self {
            peer,
            message,
            tsig,
        }
    }

    /// A request without a message body, and so without TSIG
    pub fn unsigned(peer: SocketAddr) -> Self {
        Self {
            peer,
            message: Bytes::new(),
            tsig: TsigState::NotPresent,
        }
    }

    pub fn peer(&self) -> &SocketAddr {
        &self.peer
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }

    pub fn tsig(&self) -> &TsigState {
        &self.tsig
    }
}
