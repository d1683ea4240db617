//! The lobby registry: all open lobbies, in creation order.
//!
//! Lobbies are few (one per group of players waiting to start) so they live
//! in a `Vec` and lookups scan it. That keeps `LobbyList` replies in creation
//! order without a second index.

use std::collections::HashSet;

use lobbyrelay_protocol::{LobbyCode, LobbySummary, PeerId};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

use crate::{Lobby, LobbyConfig, LobbyError};

/// Owns every lobby and the set of codes ever issued.
pub struct LobbyRegistry {
    lobbies: Vec<Lobby>,
    /// Every code handed out since startup, including those of lobbies that
    /// no longer exist.
    issued: HashSet<LobbyCode>,
    alphabet: Vec<char>,
    config: LobbyConfig,
    rng: StdRng,
}

impl LobbyRegistry {
    pub fn new(config: LobbyConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Creates a registry whose code sequence is reproducible.
    pub fn with_seed(config: LobbyConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: LobbyConfig, rng: StdRng) -> Self {
        Self {
            lobbies: Vec::new(),
            issued: HashSet::new(),
            alphabet: config.code_alphabet.chars().collect(),
            config,
            rng,
        }
    }

    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    /// Draws a code that has never been issued and records it as issued.
    ///
    /// # Errors
    /// - [`LobbyError::InvalidConfig`] if the alphabet is empty or the code
    ///   length is zero.
    /// - [`LobbyError::CodeSpaceExhausted`] if `max_code_attempts` draws
    ///   all hit previously issued codes.
    pub fn generate_code(&mut self) -> Result<LobbyCode, LobbyError> {
        if self.alphabet.is_empty() || self.config.code_length == 0 {
            return Err(LobbyError::InvalidConfig(
                "lobby codes need a non-empty alphabet and length".into(),
            ));
        }

        let length = self.config.code_length;
        for _ in 0..self.config.max_code_attempts {
            let rng = &mut self.rng;
            let code: String = (0..length)
                .filter_map(|_| self.alphabet.choose(rng))
                .collect();
            let code = LobbyCode::new(code);
            if self.issued.insert(code.clone()) {
                return Ok(code);
            }
        }

        tracing::error!(
            attempts = self.config.max_code_attempts,
            issued = self.issued.len(),
            "lobby code space exhausted"
        );
        Err(LobbyError::CodeSpaceExhausted {
            attempts: self.config.max_code_attempts,
        })
    }

    /// Creates an empty lobby under `code`.
    ///
    /// The caller adds the creator as first member right away; a lobby must
    /// not be left empty.
    ///
    /// # Errors
    /// Returns [`LobbyError::DuplicateLobbyCode`] if a lobby with `code` is
    /// already open.
    pub fn create(
        &mut self,
        code: LobbyCode,
        description: Option<String>,
    ) -> Result<&mut Lobby, LobbyError> {
        if self.find_by_code(&code).is_some() {
            return Err(LobbyError::DuplicateLobbyCode(code));
        }
        self.issued.insert(code.clone());

        tracing::info!(lobby = %code, "lobby created");
        self.lobbies.push(Lobby::new(code, description));
        let index = self.lobbies.len() - 1;
        Ok(&mut self.lobbies[index])
    }

    /// Adds `peer` to the lobby named `code`.
    ///
    /// # Errors
    /// - [`LobbyError::NotFound`] if no such lobby is open.
    /// - [`LobbyError::AlreadyInLobby`] if the peer is in any lobby.
    pub fn join(&mut self, code: &LobbyCode, peer: PeerId) -> Result<&Lobby, LobbyError> {
        if let Some(current) = self.find_by_peer(peer) {
            return Err(LobbyError::AlreadyInLobby(peer, current.code().clone()));
        }
        let lobby = self
            .find_by_code_mut(code)
            .ok_or_else(|| LobbyError::NotFound(code.clone()))?;
        lobby.add_member(peer);
        tracing::info!(lobby = %code, peer_id = %peer, "peer joined lobby");
        Ok(&*lobby)
    }

    pub fn find_by_code(&self, code: &LobbyCode) -> Option<&Lobby> {
        self.lobbies.iter().find(|lobby| lobby.code() == code)
    }

    pub fn find_by_code_mut(&mut self, code: &LobbyCode) -> Option<&mut Lobby> {
        self.lobbies.iter_mut().find(|lobby| lobby.code() == code)
    }

    /// The lobby `peer` belongs to, if any.
    pub fn find_by_peer(&self, peer: PeerId) -> Option<&Lobby> {
        self.lobbies.iter().find(|lobby| lobby.contains(peer))
    }

    pub fn find_by_peer_mut(&mut self, peer: PeerId) -> Option<&mut Lobby> {
        self.lobbies.iter_mut().find(|lobby| lobby.contains(peer))
    }

    /// Removes a lobby. Its code stays in the issued set.
    ///
    /// # Errors
    /// Returns [`LobbyError::NotFound`] if no such lobby is open.
    pub fn remove(&mut self, code: &LobbyCode) -> Result<Lobby, LobbyError> {
        let index = self
            .lobbies
            .iter()
            .position(|lobby| lobby.code() == code)
            .ok_or_else(|| LobbyError::NotFound(code.clone()))?;
        tracing::info!(lobby = %code, "lobby removed");
        Ok(self.lobbies.remove(index))
    }

    /// Lobbies in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Lobby> {
        self.lobbies.iter()
    }

    /// Codes of all open lobbies, in creation order.
    pub fn codes(&self) -> Vec<LobbyCode> {
        self.lobbies.iter().map(|lobby| lobby.code().clone()).collect()
    }

    /// The `LobbyList` payload.
    pub fn summaries(&self) -> Vec<LobbySummary> {
        self.lobbies.iter().map(Lobby::summary).collect()
    }

    pub fn was_issued(&self, code: &LobbyCode) -> bool {
        self.issued.contains(code)
    }

    pub fn len(&self) -> usize {
        self.lobbies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lobbies.is_empty()
    }
}

impl Default for LobbyRegistry {
    fn default() -> Self {
        Self::new(LobbyConfig::default())
    }
}
