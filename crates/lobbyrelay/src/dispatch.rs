//! Protocol dispatcher: one decoded request in, addressed packets out.
//!
//! The dispatcher holds no state of its own. Each handler validates the
//! request against [`RelayState`] first and only then mutates it, so a
//! rejected request leaves the registries untouched and produces a single
//! failure reply to the sender.

use lobbyrelay_lobby::LobbyError;
use lobbyrelay_protocol::{
    Ack, ClientPacket, CreateLobby, Envelope, HostChange, JoinLobby, JoinLobbyReply, LeaveLobby,
    LobbyChat, LobbyCreated, LobbyDescription, LobbyLeft, LobbyListing, LobbyText, PeerId,
    ServerPacket, SessionStart, UserInfo, WirePacket,
};

use crate::state::{Outbound, RelayState};

/// Why a request was refused. The display text is sent to the client.
#[derive(Debug, thiserror::Error)]
enum Rejection {
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    #[error("{0} is not in a lobby")]
    NotInLobby(PeerId),

    #[error("target peer {0} not found")]
    TargetNotFound(i64),

    #[error("only the lobby host can change the description")]
    NotHost,
}

/// Handles one request from `sender`.
///
/// Replies echo the request `id`; relay-originated notifications use 0 and
/// forwarded signaling carries the sender's peer id.
pub fn dispatch(state: &mut RelayState, sender: PeerId, request: Envelope<ClientPacket>) -> Vec<Outbound> {
    if !state.peers.contains(sender) {
        tracing::warn!(peer_id = %sender, "request from unregistered peer dropped");
        return Vec::new();
    }

    let Envelope { id, packet } = request;
    let kind = packet.kind();
    tracing::debug!(peer_id = %sender, %kind, id, "dispatching request");

    let mut out = Vec::new();
    let result = match packet {
        ClientPacket::UserInfo(body) => user_info(state, sender, body, &mut out),
        ClientPacket::LobbyList => {
            lobby_list(state, sender, id, &mut out);
            Ok(())
        }
        ClientPacket::CreateLobby(body) => create_lobby(state, sender, id, body, &mut out),
        ClientPacket::JoinLobby(body) => join_lobby(state, sender, id, body, &mut out),
        ClientPacket::LeaveLobby(body) => leave_lobby(state, sender, id, body, &mut out),
        ClientPacket::LobbyMessage(body) => lobby_message(state, sender, body, &mut out),
        ClientPacket::LobbyDescription(body) => lobby_description(state, sender, id, body, &mut out),
        ClientPacket::StartSession => start_session(state, sender, &mut out),
        ClientPacket::Offer(body) => {
            let target = body.target_id;
            forward(state, sender, target, ServerPacket::Offer(body), &mut out)
        }
        ClientPacket::Answer(body) => {
            let target = body.target_id;
            forward(state, sender, target, ServerPacket::Answer(body), &mut out)
        }
        ClientPacket::IceCandidate(body) => {
            let target = body.target_id;
            forward(state, sender, target, ServerPacket::IceCandidate(body), &mut out)
        }
    };

    if let Err(rejection) = result {
        tracing::info!(peer_id = %sender, %kind, reason = %rejection, "request rejected");
        out.push(Outbound::new(sender, id, ServerPacket::failure(kind, rejection.to_string())));
    }
    out
}

fn user_info(
    state: &mut RelayState,
    sender: PeerId,
    body: UserInfo,
    out: &mut Vec<Outbound>,
) -> Result<(), Rejection> {
    let success_message = format!("username set to {}", body.username);
    if let Some(peer) = state.peers.get_mut(sender) {
        peer.username = body.username;
    }
    // The reply id is the sender's peer id: this is how a client learns it.
    out.push(Outbound::new(
        sender,
        i64::from(sender),
        ServerPacket::UserInfo(Ack { success_message }),
    ));
    Ok(())
}

fn lobby_list(state: &RelayState, sender: PeerId, id: i64, out: &mut Vec<Outbound>) {
    let lobby_list = state.lobbies.summaries();
    out.push(Outbound::new(
        sender,
        id,
        ServerPacket::LobbyList(LobbyListing { lobby_list }),
    ));
}

fn create_lobby(
    state: &mut RelayState,
    sender: PeerId,
    id: i64,
    body: CreateLobby,
    out: &mut Vec<Outbound>,
) -> Result<(), Rejection> {
    if let Some(current) = state.lobbies.find_by_peer(sender) {
        return Err(LobbyError::AlreadyInLobby(sender, current.code().clone()).into());
    }

    let code = state.lobbies.generate_code()?;
    let lobby = state.lobbies.create(code.clone(), body.lobby_description)?;
    lobby.add_member(sender);
    state.set_host_flag(sender, true);

    out.push(Outbound::new(
        sender,
        id,
        ServerPacket::CreateLobby(LobbyCreated { lobby_code: code }),
    ));
    Ok(())
}

fn join_lobby(
    state: &mut RelayState,
    sender: PeerId,
    id: i64,
    body: JoinLobby,
    out: &mut Vec<Outbound>,
) -> Result<(), Rejection> {
    let code = body.lobby_code;
    let lobby = state
        .lobbies
        .find_by_code(&code)
        .ok_or_else(|| LobbyError::NotFound(code.clone()))?;
    if let Some(current) = state.lobbies.find_by_peer(sender) {
        return Err(LobbyError::AlreadyInLobby(sender, current.code().clone()).into());
    }

    let existing = lobby.members().to_vec();
    let host = lobby.host();
    let lobby_peers = state.peer_infos(&existing);
    let Some(joining_peer) = state.peer_info(sender) else {
        return Ok(());
    };

    if let Some(host_peer) = host.and_then(|h| state.peer_info(h)) {
        out.push(Outbound::notify(sender, ServerPacket::Host(HostChange { host_peer })));
    }
    out.push(Outbound::new(
        sender,
        id,
        ServerPacket::JoinLobby(JoinLobbyReply::JoiningUser {
            lobby_code: code.clone(),
            lobby_peers,
        }),
    ));
    let notice = ServerPacket::JoinLobby(JoinLobbyReply::ExistingUser {
        lobby_code: code.clone(),
        joining_peer,
    });
    for member in existing {
        out.push(Outbound::notify(member, notice.clone()));
    }

    state.lobbies.join(&code, sender)?;
    Ok(())
}

fn leave_lobby(
    state: &mut RelayState,
    sender: PeerId,
    id: i64,
    body: LeaveLobby,
    out: &mut Vec<Outbound>,
) -> Result<(), Rejection> {
    let code = match body.lobby_code {
        Some(code) => code,
        None => state
            .lobbies
            .find_by_peer(sender)
            .map(|lobby| lobby.code().clone())
            .ok_or(Rejection::NotInLobby(sender))?,
    };
    let lobby = state
        .lobbies
        .find_by_code(&code)
        .ok_or_else(|| LobbyError::NotFound(code.clone()))?;
    if !lobby.contains(sender) {
        return Err(LobbyError::NotInLobby(sender, code).into());
    }
    let Some(leaving_peer) = state.peer_info(sender) else {
        return Ok(());
    };

    out.extend(state.depart_lobby(&code, &leaving_peer));
    if state.lobbies.find_by_code(&code).is_some_and(|lobby| lobby.is_empty()) {
        state.lobbies.remove(&code)?;
    }

    out.push(Outbound::new(
        sender,
        id,
        ServerPacket::LeaveLobby(LobbyLeft {
            leaving_peer,
            success_message: format!("left lobby {code}"),
        }),
    ));
    Ok(())
}

fn lobby_message(
    state: &RelayState,
    sender: PeerId,
    body: LobbyText,
    out: &mut Vec<Outbound>,
) -> Result<(), Rejection> {
    let lobby = state
        .lobbies
        .find_by_peer(sender)
        .ok_or(Rejection::NotInLobby(sender))?;
    let Some(peer_sender) = state.peer_info(sender) else {
        return Ok(());
    };

    let packet = ServerPacket::LobbyMessage(LobbyChat {
        lobby_message: body.lobby_message,
        peer_sender,
    });
    for &member in lobby.members() {
        out.push(Outbound::notify(member, packet.clone()));
    }
    Ok(())
}

fn lobby_description(
    state: &mut RelayState,
    sender: PeerId,
    id: i64,
    body: LobbyDescription,
    out: &mut Vec<Outbound>,
) -> Result<(), Rejection> {
    let lobby = state
        .lobbies
        .find_by_peer_mut(sender)
        .ok_or(Rejection::NotInLobby(sender))?;
    if !lobby.is_host(sender) {
        return Err(Rejection::NotHost);
    }
    lobby.description = Some(body.lobby_description);
    tracing::info!(lobby = %lobby.code(), "lobby description updated");

    out.push(Outbound::new(
        sender,
        id,
        ServerPacket::LobbyDescription(Ack {
            success_message: format!("description of lobby {} updated", lobby.code()),
        }),
    ));
    Ok(())
}

fn start_session(state: &RelayState, sender: PeerId, out: &mut Vec<Outbound>) -> Result<(), Rejection> {
    let lobby = state
        .lobbies
        .find_by_peer(sender)
        .ok_or(Rejection::NotInLobby(sender))?;
    tracing::info!(lobby = %lobby.code(), peer_id = %sender, members = lobby.len(), "session starting");

    let packet = ServerPacket::StartSession(SessionStart {
        start_peers: lobby.members().to_vec(),
    });
    for &member in lobby.members() {
        out.push(Outbound::notify(member, packet.clone()));
    }
    Ok(())
}

/// Relays a signaling payload untouched, re-stamping `id` with the sender.
fn forward(
    state: &RelayState,
    sender: PeerId,
    target_id: i64,
    packet: ServerPacket,
    out: &mut Vec<Outbound>,
) -> Result<(), Rejection> {
    let target = PeerId::from_wire(target_id)
        .filter(|&target| state.peers.contains(target))
        .ok_or(Rejection::TargetNotFound(target_id))?;
    tracing::trace!(from = %sender, to = %target, kind = %packet.kind(), "forwarding signaling");
    out.push(Outbound::new(target, i64::from(sender), packet));
    Ok(())
}

// =========================================================================
// Tests
// =========================================================================
