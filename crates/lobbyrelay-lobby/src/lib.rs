//! Lobby management for lobbyrelay.
//!
//! A [`Lobby`] is a named group of peers that will start a WebRTC session
//! together. The [`LobbyRegistry`] owns every lobby, generates their codes,
//! and enforces the two membership rules:
//!
//! - a peer belongs to at most one lobby;
//! - a lobby's first member is its host, and a lobby never stays empty
//!   (callers remove it once the last member leaves).
//!
//! Lobby codes come from [`LobbyConfig`] (five uppercase letters by default)
//! and are never handed out twice in the life of the process.

pub mod config;
pub mod error;
pub mod lobby;
pub mod registry;

pub use config::LobbyConfig;
pub use error::LobbyError;
pub use lobby::Lobby;
pub use registry::LobbyRegistry;
