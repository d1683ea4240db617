//! A single lobby: its code, description and ordered member list.

use lobbyrelay_protocol::{LobbyCode, LobbySummary, PeerId};

/// A matchmaking room.
///
/// `members[0]` is the host. Members are stored as ids only; the peer
/// registry owns the peer records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lobby {
    code: LobbyCode,
    pub description: Option<String>,
    members: Vec<PeerId>,
}

impl Lobby {
    pub(crate) fn new(code: LobbyCode, description: Option<String>) -> Self {
        Self {
            code,
            description,
            members: Vec::new(),
        }
    }

    pub fn code(&self) -> &LobbyCode {
        &self.code
    }

    /// Members in join order. The first one is the host.
    pub fn members(&self) -> &[PeerId] {
        &self.members
    }

    pub fn host(&self) -> Option<PeerId> {
        self.members.first().copied()
    }

    pub fn is_host(&self, peer: PeerId) -> bool {
        self.host() == Some(peer)
    }

    pub fn contains(&self, peer: PeerId) -> bool {
        self.members.contains(&peer)
    }

    /// Appends a member. Returns `false` if it was already present.
    pub fn add_member(&mut self, peer: PeerId) -> bool {
        if self.contains(peer) {
            return false;
        }
        self.members.push(peer);
        true
    }

    /// Removes a member, keeping the order of the rest. Returns `false` if
    /// the peer was not a member.
    pub fn remove_member(&mut self, peer: PeerId) -> bool {
        match self.members.iter().position(|&m| m == peer) {
            Some(index) => {
                self.members.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn summary(&self) -> LobbySummary {
        LobbySummary {
            code: self.code.clone(),
            description: self.description.clone(),
        }
    }
}
