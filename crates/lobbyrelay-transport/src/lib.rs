//! Transport layer for lobbyrelay.
//!
//! The relay core never touches sockets. It sees connections through the
//! [`Transport`], [`PendingConnection`] and [`Connection`] traits: something
//! that accepts raw streams, the handshake that turns one into a
//! message-framed duplex channel, and the channel itself.
//!
//! Accepting and upgrading are separate steps so the accept loop never
//! waits on a client's handshake; callers run
//! [`handshake`](PendingConnection::handshake) in the connection's own task.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{PendingWebSocket, WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Opaque handle for one accepted connection.
///
/// The relay stores this on each peer instead of the connection itself, so
/// the transport stays the only owner of the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// An accepted stream that has not completed its handshake yet.
    type Pending: PendingConnection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next incoming stream. Returns as soon as it is
    /// accepted, before any protocol handshake.
    async fn accept(&mut self) -> Result<Self::Pending, Self::Error>;
}

/// An accepted stream waiting for its protocol handshake.
pub trait PendingConnection: Send + 'static {
    /// The connection produced by a successful handshake.
    type Connection: Connection;
    /// The error type for handshake failures.
    type Error: std::error::Error + Send + Sync;

    /// Completes the handshake. A client that never finishes it keeps this
    /// future pending, so callers bound it with a timeout.
    async fn handshake(self) -> Result<Self::Connection, Self::Error>;

    /// The identifier the connection will keep after the handshake.
    fn id(&self) -> ConnectionId;
}

/// A single message-framed connection.
///
/// Sending and receiving are independent: a task blocked in
/// [`recv`](Connection::recv) must not hold up another task calling
/// [`send`](Connection::send).
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame to the remote side.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote side.
    ///
    /// Returns `Ok(None)` once the connection is closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the identifier assigned when the connection was accepted.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_orders_by_value() {
        let mut ids = vec![ConnectionId::new(3), ConnectionId::new(1)];
        ids.sort();
        assert_eq!(ids, vec![ConnectionId::new(1), ConnectionId::new(3)]);
    }
}
