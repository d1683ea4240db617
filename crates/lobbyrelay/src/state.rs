//! Relay state: the two registries plus the membership operations that
//! touch both of them.
//!
//! `RelayState` is owned by the relay task and passed by `&mut` to the
//! dispatcher and the sweeper. Nothing else holds a reference to it, so no
//! locking is needed.

use lobbyrelay_lobby::{LobbyConfig, LobbyRegistry};
use lobbyrelay_peer::PeerRegistry;
use lobbyrelay_protocol::{
    Envelope, HostChange, LobbyCode, LobbyLeft, PeerId, PeerInfo, ServerPacket,
};

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A packet addressed to one peer.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: PeerId,
    pub envelope: Envelope<ServerPacket>,
}

impl Outbound {
    pub fn new(to: PeerId, id: i64, packet: ServerPacket) -> Self {
        Self {
            to,
            envelope: Envelope::new(id, packet),
        }
    }

    /// A relay-originated notification (`id` 0).
    pub fn notify(to: PeerId, packet: ServerPacket) -> Self {
        Self::new(to, 0, packet)
    }
}

// ---------------------------------------------------------------------------
// RelayState
// ---------------------------------------------------------------------------

/// Every piece of mutable relay state.
pub struct RelayState {
    pub peers: PeerRegistry,
    pub lobbies: LobbyRegistry,
}

impl RelayState {
    pub fn new(config: LobbyConfig) -> Self {
        Self {
            peers: PeerRegistry::new(),
            lobbies: LobbyRegistry::new(config),
        }
    }

    /// State with reproducible peer ids and lobby codes.
    pub fn with_seed(config: LobbyConfig, seed: u64) -> Self {
        Self {
            peers: PeerRegistry::with_seed(seed),
            lobbies: LobbyRegistry::with_seed(config, seed.wrapping_add(1)),
        }
    }

    /// The `{id, username}` rendering of a registered peer.
    pub fn peer_info(&self, id: PeerId) -> Option<PeerInfo> {
        self.peers.get(id).map(|peer| peer.info())
    }

    /// Renders `ids` in order, skipping any that are no longer registered.
    pub fn peer_infos(&self, ids: &[PeerId]) -> Vec<PeerInfo> {
        ids.iter().filter_map(|&id| self.peer_info(id)).collect()
    }

    pub(crate) fn set_host_flag(&mut self, id: PeerId, is_host: bool) {
        if let Some(peer) = self.peers.get_mut(id) {
            peer.is_host = is_host;
        }
    }

    /// Takes `leaving` out of lobby `code` and returns the notifications for
    /// the members that remain.
    ///
    /// Remaining members each get a `LeaveLobby` naming the leaver. If the
    /// leaver was host, the new `members[0]` is flagged host and a `Host`
    /// packet goes to everyone left. An emptied lobby is *not* removed here;
    /// the caller decides when.
    pub(crate) fn depart_lobby(&mut self, code: &LobbyCode, leaving: &PeerInfo) -> Vec<Outbound> {
        let Some(lobby) = self.lobbies.find_by_code_mut(code) else {
            tracing::error!(lobby = %code, peer_id = %leaving.id, "departure from unknown lobby");
            return Vec::new();
        };

        let was_host = lobby.is_host(leaving.id);
        if !lobby.remove_member(leaving.id) {
            tracing::error!(lobby = %code, peer_id = %leaving.id, "departing peer was not a member");
            return Vec::new();
        }
        let new_host = if was_host { lobby.host() } else { None };
        let remaining: Vec<PeerId> = lobby
            .members()
            .iter()
            .copied()
            .filter(|&member| self.peers.contains(member))
            .collect();

        self.set_host_flag(leaving.id, false);
        tracing::info!(lobby = %code, peer_id = %leaving.id, remaining = remaining.len(), "peer left lobby");

        let mut out = Vec::new();
        let notice = ServerPacket::LeaveLobby(LobbyLeft {
            leaving_peer: leaving.clone(),
            success_message: format!("{} left lobby {code}", display_name(leaving)),
        });
        for &member in &remaining {
            out.push(Outbound::notify(member, notice.clone()));
        }

        // A successor that is itself gone is skipped here; its own departure
        // in the same sweep promotes the next member.
        if let Some(host_peer) = new_host.and_then(|host| self.peer_info(host)) {
            self.set_host_flag(host_peer.id, true);
            tracing::info!(lobby = %code, peer_id = %host_peer.id, "host promoted");
            let packet = ServerPacket::Host(HostChange { host_peer });
            for &member in &remaining {
                out.push(Outbound::notify(member, packet.clone()));
            }
        }

        out
    }

    /// Checks the host and membership invariants and describes every
    /// violation found. Empty means the state is consistent.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for lobby in self.lobbies.iter() {
            if lobby.is_empty() {
                violations.push(format!("lobby {} is empty", lobby.code()));
                continue;
            }
            for (index, &member) in lobby.members().iter().enumerate() {
                match self.peers.get(member) {
                    None => violations.push(format!(
                        "lobby {} lists unregistered {member}",
                        lobby.code()
                    )),
                    Some(peer) if peer.is_host != (index == 0) => violations.push(format!(
                        "lobby {}: {member} at position {index} has is_host={}",
                        lobby.code(),
                        peer.is_host
                    )),
                    Some(_) => {}
                }
            }
        }

        for peer in self.peers.all() {
            let lobbies = self.lobbies.iter().filter(|l| l.contains(peer.id)).count();
            if lobbies > 1 {
                violations.push(format!("{} is in {lobbies} lobbies", peer.id));
            }
            if lobbies == 0 && peer.is_host {
                violations.push(format!("{} is host outside any lobby", peer.id));
            }
        }

        violations
    }
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new(LobbyConfig::default())
    }
}

fn display_name(peer: &PeerInfo) -> String {
    if peer.username.is_empty() {
        peer.id.to_string()
    } else {
        peer.username.clone()
    }
}
