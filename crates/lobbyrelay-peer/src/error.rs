//! Error types for the peer registry.

use lobbyrelay_protocol::PeerId;
use lobbyrelay_transport::ConnectionId;

/// Errors raised by [`PeerRegistry`](crate::PeerRegistry) lookups.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// No peer with this id is registered.
    #[error("{0} not found")]
    NotFound(PeerId),

    /// The connection was never registered, or its peer is already gone.
    #[error("no peer registered for {0}")]
    UnknownConnection(ConnectionId),
}
