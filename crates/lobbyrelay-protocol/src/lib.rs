//! Wire protocol for the lobbyrelay signaling server.
//!
//! Clients exchange flat JSON objects with the relay. Each object carries an
//! integer `message` tag, a correlation `id`, and the fields of one packet
//! variant. This crate defines those packets and the codec that turns them
//! into frame bytes; it knows nothing about sockets or lobbies.
//!
//! # Modules
//!
//! - [`types`]: identifiers and records embedded in packets ([`PeerId`],
//!   [`LobbyCode`], [`MessageKind`], ...).
//! - [`packet`]: [`Envelope`], [`ClientPacket`] and [`ServerPacket`].
//! - [`codec`]: the [`Codec`] trait and [`JsonCodec`].
//! - [`error`]: [`ProtocolError`].
//!
//! # Example
//!
//! ```rust
//! use lobbyrelay_protocol::{
//!     Codec, Envelope, JsonCodec, LobbyCreated, ServerPacket,
//! };
//!
//! let reply = Envelope::new(
//!     4,
//!     ServerPacket::CreateLobby(LobbyCreated { lobby_code: "QXTRB".into() }),
//! );
//! let bytes = JsonCodec.encode(&reply).unwrap();
//! let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
//!
//! assert_eq!(json["message"], 2);
//! assert_eq!(json["success"], true);
//! ```

pub mod codec;
pub mod error;
pub mod packet;
pub mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use packet::{
    Ack, ClientPacket, CreateLobby, Envelope, HostChange, JoinLobby, JoinLobbyReply, LeaveLobby,
    LobbyChat, LobbyCreated, LobbyDescription, LobbyLeft, LobbyListing, LobbyText, RtcAnswer,
    RtcIceCandidate, RtcOffer, ServerPacket, SessionStart, UserInfo, WirePacket,
};
pub use types::{LobbyCode, LobbySummary, MessageKind, PeerId, PeerInfo};
