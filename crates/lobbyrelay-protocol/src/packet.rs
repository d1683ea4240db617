//! Packets: the closed set of messages exchanged with clients.
//!
//! Every packet on the wire is one flat JSON object:
//!
//! ```text
//! { "message": 3, "id": 17, "lobby_code": "QXTRB" }
//!   └─ tag ─┘  └ correlation ┘ └── variant fields ──┘
//! ```
//!
//! Decoding reads the `message` tag first and only then parses the fields
//! of the matching variant, so an unknown tag is reported as such instead
//! of as a confusing field error. Client→relay and relay→client packets are
//! separate sum types ([`ClientPacket`], [`ServerPacket`]) because the same
//! tag carries different fields in each direction.

use serde::de::{self, DeserializeOwned};
use serde::ser::{self, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{LobbyCode, LobbySummary, MessageKind, PeerId, PeerInfo, ProtocolError};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A packet body that knows its tag and how to lay its fields out flat.
pub trait WirePacket: Sized {
    /// The tag written to the `message` field.
    fn kind(&self) -> MessageKind;

    /// The variant-specific fields (everything except `message` and `id`).
    fn to_fields(&self) -> Result<Map<String, Value>, serde_json::Error>;

    /// Parses the variant-specific fields for an already-decoded tag.
    fn from_fields(kind: MessageKind, fields: Value) -> Result<Self, ProtocolError>;
}

/// A packet plus its correlation id.
///
/// `id` is chosen by the client for requests and echoed in the reply. The
/// relay uses 0 for notifications it originates, and the sender's peer id
/// when it forwards signaling data.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<P> {
    pub id: i64,
    pub packet: P,
}

impl<P: WirePacket> Envelope<P> {
    pub fn new(id: i64, packet: P) -> Self {
        Self { id, packet }
    }

    pub fn kind(&self) -> MessageKind {
        self.packet.kind()
    }

    /// Builds the flat JSON object for this packet.
    pub fn to_value(&self) -> Result<Value, ProtocolError> {
        let mut fields = self.packet.to_fields().map_err(ProtocolError::Encode)?;
        fields.insert("message".into(), Value::from(self.packet.kind().tag()));
        fields.insert("id".into(), Value::from(self.id));
        Ok(Value::Object(fields))
    }

    /// Parses a flat JSON object, tag first.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let Value::Object(mut fields) = value else {
            return Err(ProtocolError::InvalidMessage(
                "packet must be a JSON object".into(),
            ));
        };

        let tag = fields
            .remove("message")
            .ok_or(ProtocolError::MissingField("message"))?;
        let kind = parse_tag(&tag)?;

        let id = fields.remove("id").ok_or(ProtocolError::MissingField("id"))?;
        let id = id.as_i64().ok_or_else(|| {
            ProtocolError::InvalidMessage(format!("id must be an integer, got {id}"))
        })?;

        let packet = P::from_fields(kind, Value::Object(fields))?;
        Ok(Self { id, packet })
    }
}

impl<P: WirePacket> Serialize for Envelope<P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value()
            .map_err(ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de, P: WirePacket> Deserialize<'de> for Envelope<P> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(de::Error::custom)
    }
}

/// Accepts the tag as an integer or as a numeric string (`3` or `"3"`).
fn parse_tag(tag: &Value) -> Result<MessageKind, ProtocolError> {
    let number = match tag {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    number
        .and_then(MessageKind::from_tag)
        .ok_or_else(|| ProtocolError::UnknownMessage(tag.to_string()))
}

fn object<T: Serialize>(body: &T) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(body)? {
        Value::Object(map) => Ok(map),
        other => Err(serde_json::Error::custom(format!(
            "packet body must be an object, got {other}"
        ))),
    }
}

fn fields<T: DeserializeOwned>(kind: MessageKind, value: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(|source| ProtocolError::Fields { kind, source })
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreateLobby {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lobby_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinLobby {
    pub lobby_code: LobbyCode,
}

/// Without a code the relay uses the lobby the sender is currently in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LeaveLobby {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lobby_code: Option<LobbyCode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyText {
    pub lobby_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyDescription {
    pub lobby_description: String,
}

// ---------------------------------------------------------------------------
// Signaling bodies (same shape in both directions)
// ---------------------------------------------------------------------------

/// A WebRTC session-description offer. Unknown fields ride along in `extra`
/// so the relay forwards the payload untouched.
///
/// `target_id` is kept as the raw wire integer: a value outside the peer id
/// range is still a well-formed request, just one naming no peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtcOffer {
    pub offer_type: String,
    pub sdp: String,
    pub target_id: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtcAnswer {
    pub answer_type: String,
    pub sdp: String,
    pub target_id: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtcIceCandidate {
    pub media: String,
    pub index: i64,
    pub name: String,
    pub target_id: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Response / notification bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyListing {
    pub lobby_list: Vec<LobbySummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyCreated {
    pub lobby_code: LobbyCode,
}

/// `JoiningUser` goes to the peer that joined, `ExistingUser` to everyone
/// already in the lobby. The `type` field tells them apart on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JoinLobbyReply {
    JoiningUser {
        lobby_code: LobbyCode,
        lobby_peers: Vec<PeerInfo>,
    },
    ExistingUser {
        lobby_code: LobbyCode,
        joining_peer: PeerInfo,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyLeft {
    pub leaving_peer: PeerInfo,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyChat {
    pub lobby_message: String,
    pub peer_sender: PeerInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStart {
    pub start_peers: Vec<PeerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostChange {
    pub host_peer: PeerInfo,
}

// ---------------------------------------------------------------------------
// ClientPacket
// ---------------------------------------------------------------------------

/// Everything a client may send to the relay.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientPacket {
    UserInfo(UserInfo),
    LobbyList,
    CreateLobby(CreateLobby),
    JoinLobby(JoinLobby),
    LeaveLobby(LeaveLobby),
    LobbyMessage(LobbyText),
    LobbyDescription(LobbyDescription),
    StartSession,
    Offer(RtcOffer),
    Answer(RtcAnswer),
    IceCandidate(RtcIceCandidate),
}

impl WirePacket for ClientPacket {
    fn kind(&self) -> MessageKind {
        match self {
            Self::UserInfo(_) => MessageKind::UserInfo,
            Self::LobbyList => MessageKind::LobbyList,
            Self::CreateLobby(_) => MessageKind::CreateLobby,
            Self::JoinLobby(_) => MessageKind::JoinLobby,
            Self::LeaveLobby(_) => MessageKind::LeaveLobby,
            Self::LobbyMessage(_) => MessageKind::LobbyMessage,
            Self::LobbyDescription(_) => MessageKind::LobbyDescription,
            Self::StartSession => MessageKind::StartSession,
            Self::Offer(_) => MessageKind::Offer,
            Self::Answer(_) => MessageKind::Answer,
            Self::IceCandidate(_) => MessageKind::IceCandidate,
        }
    }

    fn to_fields(&self) -> Result<Map<String, Value>, serde_json::Error> {
        match self {
            Self::UserInfo(body) => object(body),
            Self::LobbyList | Self::StartSession => Ok(Map::new()),
            Self::CreateLobby(body) => object(body),
            Self::JoinLobby(body) => object(body),
            Self::LeaveLobby(body) => object(body),
            Self::LobbyMessage(body) => object(body),
            Self::LobbyDescription(body) => object(body),
            Self::Offer(body) => object(body),
            Self::Answer(body) => object(body),
            Self::IceCandidate(body) => object(body),
        }
    }

    fn from_fields(kind: MessageKind, value: Value) -> Result<Self, ProtocolError> {
        match kind {
            MessageKind::UserInfo => fields(kind, value).map(Self::UserInfo),
            MessageKind::LobbyList => Ok(Self::LobbyList),
            MessageKind::CreateLobby => fields(kind, value).map(Self::CreateLobby),
            MessageKind::JoinLobby => fields(kind, value).map(Self::JoinLobby),
            MessageKind::LeaveLobby => fields(kind, value).map(Self::LeaveLobby),
            MessageKind::LobbyMessage => fields(kind, value).map(Self::LobbyMessage),
            MessageKind::LobbyDescription => fields(kind, value).map(Self::LobbyDescription),
            MessageKind::StartSession => Ok(Self::StartSession),
            MessageKind::Offer => fields(kind, value).map(Self::Offer),
            MessageKind::Answer => fields(kind, value).map(Self::Answer),
            MessageKind::IceCandidate => fields(kind, value).map(Self::IceCandidate),
            MessageKind::Host => Err(ProtocolError::UnexpectedMessage(kind)),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerPacket
// ---------------------------------------------------------------------------

/// Everything the relay sends to clients.
///
/// Replies and notifications carry `"success": true`; [`Failure`] carries
/// `"success": false` plus a readable `error` under the tag of the request
/// that failed. Forwarded signaling and lobby chat carry no success flag.
///
/// [`Failure`]: ServerPacket::Failure
#[derive(Debug, Clone, PartialEq)]
pub enum ServerPacket {
    UserInfo(Ack),
    LobbyList(LobbyListing),
    CreateLobby(LobbyCreated),
    JoinLobby(JoinLobbyReply),
    LeaveLobby(LobbyLeft),
    LobbyMessage(LobbyChat),
    LobbyDescription(Ack),
    StartSession(SessionStart),
    Offer(RtcOffer),
    Answer(RtcAnswer),
    IceCandidate(RtcIceCandidate),
    Host(HostChange),
    Failure { kind: MessageKind, error: String },
}

impl ServerPacket {
    pub fn failure(kind: MessageKind, error: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            error: error.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    fn carries_success(&self) -> bool {
        !matches!(
            self,
            Self::LobbyMessage(_) | Self::Offer(_) | Self::Answer(_) | Self::IceCandidate(_)
        )
    }
}

impl WirePacket for ServerPacket {
    fn kind(&self) -> MessageKind {
        match self {
            Self::UserInfo(_) => MessageKind::UserInfo,
            Self::LobbyList(_) => MessageKind::LobbyList,
            Self::CreateLobby(_) => MessageKind::CreateLobby,
            Self::JoinLobby(_) => MessageKind::JoinLobby,
            Self::LeaveLobby(_) => MessageKind::LeaveLobby,
            Self::LobbyMessage(_) => MessageKind::LobbyMessage,
            Self::LobbyDescription(_) => MessageKind::LobbyDescription,
            Self::StartSession(_) => MessageKind::StartSession,
            Self::Offer(_) => MessageKind::Offer,
            Self::Answer(_) => MessageKind::Answer,
            Self::IceCandidate(_) => MessageKind::IceCandidate,
            Self::Host(_) => MessageKind::Host,
            Self::Failure { kind, .. } => *kind,
        }
    }

    fn to_fields(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let mut map = match self {
            Self::UserInfo(body) | Self::LobbyDescription(body) => object(body)?,
            Self::LobbyList(body) => object(body)?,
            Self::CreateLobby(body) => object(body)?,
            Self::JoinLobby(body) => object(body)?,
            Self::LeaveLobby(body) => object(body)?,
            Self::LobbyMessage(body) => object(body)?,
            Self::StartSession(body) => object(body)?,
            Self::Offer(body) => object(body)?,
            Self::Answer(body) => object(body)?,
            Self::IceCandidate(body) => object(body)?,
            Self::Host(body) => object(body)?,
            Self::Failure { error, .. } => {
                let mut map = Map::new();
                map.insert("success".into(), Value::Bool(false));
                map.insert("error".into(), Value::String(error.clone()));
                return Ok(map);
            }
        };
        if self.carries_success() {
            map.insert("success".into(), Value::Bool(true));
        }
        Ok(map)
    }

    fn from_fields(kind: MessageKind, value: Value) -> Result<Self, ProtocolError> {
        if value.get("success") == Some(&Value::Bool(false)) {
            let error = value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Ok(Self::Failure { kind, error });
        }

        match kind {
            MessageKind::UserInfo => fields(kind, value).map(Self::UserInfo),
            MessageKind::LobbyList => fields(kind, value).map(Self::LobbyList),
            MessageKind::CreateLobby => fields(kind, value).map(Self::CreateLobby),
            MessageKind::JoinLobby => fields(kind, value).map(Self::JoinLobby),
            MessageKind::LeaveLobby => fields(kind, value).map(Self::LeaveLobby),
            MessageKind::LobbyMessage => fields(kind, value).map(Self::LobbyMessage),
            MessageKind::LobbyDescription => fields(kind, value).map(Self::LobbyDescription),
            MessageKind::StartSession => fields(kind, value).map(Self::StartSession),
            MessageKind::Offer => fields(kind, value).map(Self::Offer),
            MessageKind::Answer => fields(kind, value).map(Self::Answer),
            MessageKind::IceCandidate => fields(kind, value).map(Self::IceCandidate),
            MessageKind::Host => fields(kind, value).map(Self::Host),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
