//! Error types for the lobby layer.

use lobbyrelay_protocol::{LobbyCode, PeerId};

/// Errors that can occur during lobby operations.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// No lobby with this code exists.
    #[error("lobby {0} not found")]
    NotFound(LobbyCode),

    /// A lobby with this code already exists.
    #[error("lobby code {0} is already in use")]
    DuplicateLobbyCode(LobbyCode),

    /// The peer already belongs to a lobby; a peer is in at most one.
    #[error("{0} is already in lobby {1}")]
    AlreadyInLobby(PeerId, LobbyCode),

    /// The peer is not a member of this lobby.
    #[error("{0} is not in lobby {1}")]
    NotInLobby(PeerId, LobbyCode),

    /// Every draw produced a code that was issued before.
    #[error("no unused lobby code found after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },

    /// The configuration cannot produce codes at all.
    #[error("invalid lobby configuration: {0}")]
    InvalidConfig(String),
}
