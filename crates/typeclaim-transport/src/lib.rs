//! Client connections for typeclaim.
//!
//! Each player is one duplex socket carrying JSON text frames. The server
//! accepts sockets through [`Transport`], then reads, writes and pings
//! each one through [`Connection`]. Liveness is tracked here: every
//! inbound frame, control frames included, resets the idle clock that
//! [`Connection::idle_for`] reports, and [`Connection::ping`] asks the
//! peer to prove it is still there.
//!
//! # Feature Flags
//!
//! - `websocket` (default): the `tokio-tungstenite` implementation

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::time::Duration;

/// Process-unique number given to each accepted socket. Player ids are
/// derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Source of new client sockets.
pub trait Transport: Send + 'static {
    type Connection: Connection;

    /// Resolves once a client has connected and finished its handshake.
    async fn accept(&mut self) -> Result<Self::Connection, TransportError>;
}

/// One client socket.
///
/// Reading and writing happen from different tasks at the same time; a
/// parked [`recv`](Self::recv) must never delay a [`send`](Self::send).
pub trait Connection: Send + Sync + 'static {
    fn id(&self) -> ConnectionId;

    async fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Next data frame. `Ok(None)` means the peer closed the socket.
    /// Control frames are consumed here and only refresh the idle clock.
    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Sends a keepalive ping. A live peer answers without involving
    /// the application.
    async fn ping(&self) -> Result<(), TransportError>;

    /// Time since the peer last sent anything at all.
    fn idle_for(&self) -> Duration;

    async fn close(&self) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_round_trips_raw_value() {
        assert_eq!(ConnectionId::new(42).into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display_prefix() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }
}
