//! Unified error type for the relay.

use lobbyrelay_lobby::LobbyError;
use lobbyrelay_peer::PeerError;
use lobbyrelay_protocol::ProtocolError;
use lobbyrelay_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// Only binding the listener is fatal to the process; the other variants
/// surface through this type when callers drive the sub-crates directly.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// Reading the bound address or another socket-level query failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use lobbyrelay_protocol::{LobbyCode, PeerId};
    use lobbyrelay_transport::ConnectionId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::NotText;
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Transport(_)));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::MissingField("id");
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Protocol(_)));
        assert!(relay_err.to_string().contains("`id`"));
    }

    #[test]
    fn test_from_peer_error() {
        let err = PeerError::UnknownConnection(ConnectionId::new(3));
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Peer(_)));
        assert!(relay_err.to_string().contains("conn-3"));
    }

    #[test]
    fn test_from_lobby_error() {
        let err = LobbyError::AlreadyInLobby(PeerId(1), LobbyCode::from("ABCDE"));
        let relay_err: RelayError = err.into();
        assert!(matches!(relay_err, RelayError::Lobby(_)));
        assert_eq!(relay_err.to_string(), "peer-1 is already in lobby ABCDE");
    }
}
