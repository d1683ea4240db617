//! Peer registry for lobbyrelay.
//!
//! Every accepted connection becomes a [`Peer`] with a relay-assigned
//! [`PeerId`](lobbyrelay_protocol::PeerId). The [`PeerRegistry`] is the only
//! owner of peer records; lobbies refer to peers by id and resolve them
//! through the registry.
//!
//! The registry is a plain single-owner structure. It is held by the relay
//! task and never shared across threads, so it takes `&mut self` instead of
//! locking.

pub mod error;
pub mod peer;
pub mod registry;

pub use error::PeerError;
pub use peer::Peer;
pub use registry::PeerRegistry;
