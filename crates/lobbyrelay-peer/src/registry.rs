//! The peer registry: every connected client, keyed by relay-assigned id.
//!
//! Besides the id → peer map the registry keeps a connection → id index, so
//! transport events (which only know the [`ConnectionId`]) resolve to a peer
//! in O(1). Both maps are updated together.
//!
//! Removal is two-phase. When the transport reports a close the peer is only
//! *flagged*; the sweeper later calls [`PeerRegistry::remove_flagged`] and
//! reconciles lobby membership against what is left.

use std::collections::{HashMap, HashSet};

use lobbyrelay_protocol::PeerId;
use lobbyrelay_transport::ConnectionId;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Peer, PeerError};

/// All connected peers.
pub struct PeerRegistry {
    peers: HashMap<PeerId, Peer>,
    connections: HashMap<ConnectionId, PeerId>,
    /// Peers whose connection closed, waiting for the next sweep.
    flagged: HashSet<PeerId>,
    rng: StdRng,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Creates a registry whose id sequence is reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            peers: HashMap::new(),
            connections: HashMap::new(),
            flagged: HashSet::new(),
            rng,
        }
    }

    /// Registers a new peer for `connection` and returns its id.
    ///
    /// Ids are drawn uniformly from `0..=PeerId::MAX`; a draw that collides
    /// with a live peer is thrown away and drawn again. Registering a
    /// connection that already has a peer returns the existing id.
    pub fn register(&mut self, connection: ConnectionId) -> PeerId {
        if let Some(&existing) = self.connections.get(&connection) {
            tracing::warn!(%connection, peer_id = %existing, "connection registered twice");
            return existing;
        }

        let id = loop {
            let candidate = PeerId(self.rng.random_range(0..=PeerId::MAX));
            if !self.peers.contains_key(&candidate) {
                break candidate;
            }
            tracing::debug!(peer_id = %candidate, "peer id collision, drawing again");
        };

        self.peers.insert(id, Peer::new(id, connection));
        self.connections.insert(connection, id);
        tracing::info!(peer_id = %id, %connection, "peer registered");
        id
    }

    pub fn get(&self, id: PeerId) -> Option<&Peer> {
        self.peers.get(&id)
    }

    pub fn get_mut(&mut self, id: PeerId) -> Option<&mut Peer> {
        self.peers.get_mut(&id)
    }

    pub fn contains(&self, id: PeerId) -> bool {
        self.peers.contains_key(&id)
    }

    /// Resolves a transport connection to its peer.
    pub fn by_connection(&self, connection: ConnectionId) -> Option<PeerId> {
        self.connections.get(&connection).copied()
    }

    /// Removes a peer without touching lobby membership.
    ///
    /// # Errors
    /// Returns [`PeerError::NotFound`] if the id is not registered.
    pub fn remove(&mut self, id: PeerId) -> Result<Peer, PeerError> {
        let peer = self.peers.remove(&id).ok_or(PeerError::NotFound(id))?;
        self.connections.remove(&peer.connection);
        self.flagged.remove(&id);
        tracing::info!(peer_id = %id, "peer removed");
        Ok(peer)
    }

    /// Iterates over every registered peer, in no particular order.
    pub fn all(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }

    /// Sets the display name chosen by the client.
    ///
    /// # Errors
    /// Returns [`PeerError::NotFound`] if the id is not registered.
    pub fn set_username(&mut self, id: PeerId, username: impl Into<String>) -> Result<(), PeerError> {
        let peer = self.peers.get_mut(&id).ok_or(PeerError::NotFound(id))?;
        peer.username = username.into();
        Ok(())
    }

    /// Marks the peer on `connection` for removal at the next sweep.
    ///
    /// # Errors
    /// Returns [`PeerError::UnknownConnection`] if no peer owns the
    /// connection.
    pub fn flag_closed(&mut self, connection: ConnectionId) -> Result<PeerId, PeerError> {
        let id = self
            .by_connection(connection)
            .ok_or(PeerError::UnknownConnection(connection))?;
        self.flagged.insert(id);
        tracing::debug!(peer_id = %id, %connection, "peer flagged for removal");
        Ok(id)
    }

    pub fn is_flagged(&self, id: PeerId) -> bool {
        self.flagged.contains(&id)
    }

    /// Removes every flagged peer and returns them.
    ///
    /// A flagged id that is already gone is logged and skipped.
    pub fn remove_flagged(&mut self) -> Vec<Peer> {
        let mut flagged: Vec<PeerId> = self.flagged.drain().collect();
        flagged.sort();

        let mut removed = Vec::with_capacity(flagged.len());
        for id in flagged {
            match self.remove(id) {
                Ok(peer) => removed.push(peer),
                Err(error) => tracing::warn!(%error, "flagged peer already removed"),
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
