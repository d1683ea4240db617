//! # lobbyrelay
//!
//! A lobby matchmaking and WebRTC signaling relay for multiplayer games.
//!
//! Clients connect over WebSocket, pick a display name, create or join a
//! lobby identified by a short code, chat, and then exchange WebRTC offers,
//! answers and ICE candidates through the relay until they can talk to each
//! other directly. The relay never carries game traffic.
//!
//! ## Layout
//!
//! - [`RelayServer`] binds the listener and spawns one task per connection.
//! - Connection tasks feed a [`RelayEvent`] inbox.
//! - A single [`Relay`] task drains the inbox once per tick, runs
//!   [`dispatch`] for each request and [`sweep`] for closed connections,
//!   and writes the resulting frames to per-peer links.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lobbyrelay::prelude::*;
//!
//! # async fn start() -> Result<(), RelayError> {
//! let server = RelayServer::builder().bind("0.0.0.0:4556").build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod connection;
mod error;
mod relay;
mod server;
mod state;

pub mod dispatch;
pub mod sweep;

pub use config::RelayConfig;
pub use dispatch::dispatch;
pub use error::RelayError;
pub use relay::{Link, Relay, RelayEvent, TickReport};
pub use server::{RelayServer, RelayServerBuilder};
pub use state::{Outbound, RelayState};
pub use sweep::sweep;

pub use lobbyrelay_lobby::LobbyConfig;
pub use lobbyrelay_protocol as protocol;

/// Convenience re-exports for common usage.
///
/// ```rust
/// use lobbyrelay::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        LobbyConfig, Outbound, Relay, RelayConfig, RelayError, RelayEvent, RelayServer,
        RelayServerBuilder, RelayState,
    };
    pub use lobbyrelay_protocol::{
        ClientPacket, Codec, Envelope, JsonCodec, LobbyCode, MessageKind, PeerId, PeerInfo,
        ServerPacket,
    };
    pub use lobbyrelay_transport::ConnectionId;
}
