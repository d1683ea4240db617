//! Identity types and small records shared by several packets.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Relay-assigned identifier of one connected client.
///
/// Always within the non-negative `i32` range so clients with signed 32-bit
/// integers can hold it. Serialized as a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub u32);

impl PeerId {
    /// Largest id the relay will hand out (`i32::MAX`).
    pub const MAX: u32 = i32::MAX as u32;
}

impl PeerId {
    /// Interprets a wire integer as a peer id. `None` when it is outside
    /// `0..=PeerId::MAX` and so cannot name any peer.
    pub fn from_wire(raw: i64) -> Option<Self> {
        u32::try_from(raw)
            .ok()
            .filter(|&id| id <= Self::MAX)
            .map(Self)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

impl From<PeerId> for i64 {
    fn from(id: PeerId) -> Self {
        i64::from(id.0)
    }
}

/// Code that names a lobby, e.g. `"QXTRB"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LobbyCode(String);

impl LobbyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LobbyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LobbyCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

// ---------------------------------------------------------------------------
// Records embedded in packets
// ---------------------------------------------------------------------------

/// How a peer is rendered to other clients: `{"id": 7, "username": "ada"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub id: PeerId,
    pub username: String,
}

/// One row of a lobby listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbySummary {
    pub code: LobbyCode,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// MessageKind: the `message` tag
// ---------------------------------------------------------------------------

/// The integer tag carried in every packet's `message` field.
///
/// The numbering is part of the wire format. Tag 6 belonged to a game-start
/// message that clients never send any more; it stays reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    UserInfo,
    LobbyList,
    CreateLobby,
    JoinLobby,
    LeaveLobby,
    LobbyMessage,
    Offer,
    Answer,
    IceCandidate,
    StartSession,
    Host,
    LobbyDescription,
}

impl MessageKind {
    /// Every kind, in tag order.
    pub const ALL: [MessageKind; 12] = [
        Self::UserInfo,
        Self::LobbyList,
        Self::CreateLobby,
        Self::JoinLobby,
        Self::LeaveLobby,
        Self::LobbyMessage,
        Self::Offer,
        Self::Answer,
        Self::IceCandidate,
        Self::StartSession,
        Self::Host,
        Self::LobbyDescription,
    ];

    /// The wire tag for this kind.
    pub fn tag(self) -> u8 {
        match self {
            Self::UserInfo => 0,
            Self::LobbyList => 1,
            Self::CreateLobby => 2,
            Self::JoinLobby => 3,
            Self::LeaveLobby => 4,
            Self::LobbyMessage => 5,
            Self::Offer => 7,
            Self::Answer => 8,
            Self::IceCandidate => 9,
            Self::StartSession => 10,
            Self::Host => 11,
            Self::LobbyDescription => 12,
        }
    }

    /// Looks up the kind for a wire tag.
    pub fn from_tag(tag: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| u64::from(kind.tag()) == tag)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UserInfo => "UserInfo",
            Self::LobbyList => "LobbyList",
            Self::CreateLobby => "CreateLobby",
            Self::JoinLobby => "JoinLobby",
            Self::LeaveLobby => "LeaveLobby",
            Self::LobbyMessage => "LobbyMessage",
            Self::Offer => "Offer",
            Self::Answer => "Answer",
            Self::IceCandidate => "IceCandidate",
            Self::StartSession => "StartSession",
            Self::Host => "Host",
            Self::LobbyDescription => "LobbyDescription",
        };
        f.write_str(name)
    }
}

impl Serialize for MessageKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.tag())
    }
}
