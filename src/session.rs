//! ClientSession - Per-connection state
//!
//! Each accepted connection gets one session. It owns the buffer that
//! accumulates the current request payload and a few counters used in the
//! disconnect log line.

use std::net::SocketAddr;

/// Unique identifier for a client connection
pub type ClientId = usize;

pub struct ClientSession {
    pub id: ClientId,
    pub peer: SocketAddr,
    /// Payload of the request being read or handled.
    pub packets: Vec<u8>,
    /// Requests answered.
    pub answered: u64,
    /// Requests dropped without a response (malformed, empty, refused).
    pub dropped: u64,
}

impl ClientSession {
    pub fn new(id: ClientId, peer: SocketAddr) -> Self {
        Self {
            id,
            peer,
            packets: Vec::new(),
            answered: 0,
            dropped: 0,
        }
    }

    pub fn record_answered(&mut self) {
        self.answered += 1;
    }

    pub fn record_dropped(&mut self) {
        self.dropped += 1;
    }

    /// Forget any partially accumulated request.
    ///
    /// Called when the connection ends, cleanly or not.
    pub fn interrupt(&mut self) {
        self.packets.clear();
    }
}
