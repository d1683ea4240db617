//! The record kept for one connected client.

use lobbyrelay_protocol::{PeerId, PeerInfo};
use lobbyrelay_transport::ConnectionId;

/// One connected client.
///
/// Created when the transport accepts a connection and dropped by the
/// sweeper once the connection has closed and the peer has left its lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub id: PeerId,
    /// Empty until the client sends `UserInfo`.
    pub username: String,
    /// True iff this peer is `members[0]` of the lobby it belongs to.
    pub is_host: bool,
    pub connection: ConnectionId,
}

impl Peer {
    pub fn new(id: PeerId, connection: ConnectionId) -> Self {
        Self {
            id,
            username: String::new(),
            is_host: false,
            connection,
        }
    }

    /// The `{id, username}` form other clients see.
    pub fn info(&self) -> PeerInfo {
        PeerInfo {
            id: self.id,
            username: self.username.clone(),
        }
    }
}
