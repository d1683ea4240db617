//! Lifecycle sweep: reconciles lobbies with closed connections.
//!
//! Runs once per tick after the inbox is drained. Peers whose connection
//! closed were only flagged by the relay; here they are removed from the
//! peer registry and then from whatever lobby still lists them.

use lobbyrelay_protocol::{LobbyCode, PeerInfo};

use crate::state::{Outbound, RelayState};

/// Removes flagged peers, performs their implicit lobby departures, and
/// drops lobbies left empty. Returns the notifications for the peers that
/// remain.
pub fn sweep(state: &mut RelayState) -> Vec<Outbound> {
    let removed = state.peers.remove_flagged();
    for peer in removed.iter().filter(|peer| state.lobbies.find_by_peer(peer.id).is_none()) {
        if peer.is_host {
            // Hosts are always members[0] of some lobby.
            tracing::warn!(peer_id = %peer.id, "closed host found in no lobby");
        } else {
            tracing::debug!(peer_id = %peer.id, "closed peer was not in a lobby");
        }
    }

    let mut out = Vec::new();
    let mut emptied: Vec<LobbyCode> = Vec::new();

    for code in state.lobbies.codes() {
        let dangling: Vec<PeerInfo> = match state.lobbies.find_by_code(&code) {
            Some(lobby) => lobby
                .members()
                .iter()
                .filter(|&&member| !state.peers.contains(member))
                .map(|&member| {
                    removed
                        .iter()
                        .find(|peer| peer.id == member)
                        .map(|peer| peer.info())
                        .unwrap_or(PeerInfo {
                            id: member,
                            username: String::new(),
                        })
                })
                .collect(),
            None => continue,
        };

        for leaving in &dangling {
            out.extend(state.depart_lobby(&code, leaving));
        }

        if state.lobbies.find_by_code(&code).is_some_and(|lobby| lobby.is_empty()) {
            emptied.push(code);
        }
    }

    for code in emptied {
        if let Err(error) = state.lobbies.remove(&code) {
            tracing::error!(%error, "failed to remove empty lobby");
        }
    }

    for violation in state.invariant_violations() {
        tracing::error!(%violation, "relay state invariant violated");
    }

    if !removed.is_empty() {
        tracing::debug!(removed = removed.len(), notices = out.len(), "sweep complete");
    }
    out
}
