//! Integration tests for the relay core, driven without sockets.
//!
//! Each simulated client is a `ConnectionId` plus the receiving end of its
//! outbound link. Requests go through the same inbox the connection tasks
//! use, and `Relay::tick` runs the drain-then-sweep cycle by hand.

use lobbyrelay::prelude::*;
use serde_json::{Value, json};
use tokio::sync::mpsc;

// =========================================================================
// Harness
// =========================================================================

struct Client {
    conn: ConnectionId,
    frames: mpsc::UnboundedReceiver<Vec<u8>>,
    peer_id: i64,
}

impl Client {
    /// Every frame delivered since the last call, decoded as JSON.
    fn drain(&mut self) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(frame) = self.frames.try_recv() {
            out.push(serde_json::from_slice(&frame).expect("relay sends JSON"));
        }
        out
    }
}

struct Harness {
    relay: Relay,
    inbox_tx: mpsc::UnboundedSender<RelayEvent>,
    inbox_rx: mpsc::UnboundedReceiver<RelayEvent>,
    next_conn: u64,
}

impl Harness {
    fn new() -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            relay: Relay::new(RelayState::with_seed(LobbyConfig::default(), 2024)),
            inbox_tx,
            inbox_rx,
            next_conn: 1,
        }
    }

    fn tick(&mut self) -> lobbyrelay::TickReport {
        self.relay.tick(&mut self.inbox_rx)
    }

    /// Opens a connection and names the peer; returns the client with its
    /// peer id learned from the `UserInfo` reply.
    fn join(&mut self, username: &str) -> Client {
        let conn = ConnectionId::new(self.next_conn);
        self.next_conn += 1;
        let (outbound, frames) = mpsc::unbounded_channel();
        self.inbox_tx
            .send(RelayEvent::Opened {
                connection: conn,
                outbound,
            })
            .unwrap();

        let mut client = Client {
            conn,
            frames,
            peer_id: -1,
        };
        self.send(&client, json!({"message": 0, "id": 1, "username": username}));
        self.tick();
        let reply = client.drain().pop().expect("UserInfo reply");
        assert_eq!(reply["success"], true);
        client.peer_id = reply["id"].as_i64().unwrap();
        client
    }

    fn send(&self, client: &Client, packet: Value) {
        self.inbox_tx
            .send(RelayEvent::Frame {
                connection: client.conn,
                data: serde_json::to_vec(&packet).unwrap(),
            })
            .unwrap();
    }

    fn send_raw(&self, client: &Client, data: &[u8]) {
        self.inbox_tx
            .send(RelayEvent::Frame {
                connection: client.conn,
                data: data.to_vec(),
            })
            .unwrap();
    }

    fn close(&self, client: &Client) {
        self.inbox_tx
            .send(RelayEvent::Closed {
                connection: client.conn,
            })
            .unwrap();
    }

    /// Sends a request and runs one tick.
    fn request(&mut self, client: &Client, packet: Value) {
        self.send(client, packet);
        self.tick();
    }

    fn create_lobby(&mut self, host: &mut Client) -> String {
        self.request(host, json!({"message": 2, "id": 10}));
        let reply = host.drain().pop().expect("CreateLobby reply");
        assert_eq!(reply["message"], 2);
        assert_eq!(reply["success"], true);
        reply["lobby_code"].as_str().unwrap().to_string()
    }

    fn join_lobby(&mut self, client: &mut Client, code: &str) {
        self.request(client, json!({"message": 3, "id": 11, "lobby_code": code}));
    }
}

fn lobby_members(h: &Harness, code: &str) -> Vec<i64> {
    h.relay
        .state()
        .lobbies
        .find_by_code(&LobbyCode::from(code))
        .map(|lobby| lobby.members().iter().map(|&id| i64::from(id)).collect())
        .unwrap_or_default()
}

fn is_host(h: &Harness, client: &Client) -> bool {
    h.relay
        .state()
        .peers
        .get(PeerId(client.peer_id as u32))
        .is_some_and(|peer| peer.is_host)
}

// =========================================================================
// Scenario 1: create and join
// =========================================================================

#[test]
fn test_create_then_join_notifies_both_sides() {
    let mut h = Harness::new();
    let mut alice = h.join("alice");
    let mut bob = h.join("bob");

    let code = h.create_lobby(&mut alice);
    assert_eq!(code.len(), 5);
    assert!(code.chars().all(|c| c.is_ascii_uppercase()));

    h.join_lobby(&mut bob, &code);

    let to_bob = bob.drain();
    assert_eq!(to_bob.len(), 2);
    assert_eq!(to_bob[0]["message"], 11, "Host comes first");
    assert_eq!(to_bob[0]["host_peer"]["id"], alice.peer_id);
    assert_eq!(to_bob[0]["host_peer"]["username"], "alice");
    assert_eq!(to_bob[1]["message"], 3);
    assert_eq!(to_bob[1]["id"], 11);
    assert_eq!(to_bob[1]["type"], "JoiningUser");
    assert_eq!(to_bob[1]["lobby_code"], code.as_str());
    assert_eq!(
        to_bob[1]["lobby_peers"],
        json!([{"id": alice.peer_id, "username": "alice"}])
    );

    let to_alice = alice.drain();
    assert_eq!(to_alice.len(), 1);
    assert_eq!(to_alice[0]["type"], "ExistingUser");
    assert_eq!(to_alice[0]["joining_peer"]["id"], bob.peer_id);

    assert_eq!(lobby_members(&h, &code), vec![alice.peer_id, bob.peer_id]);
    assert!(is_host(&h, &alice));
    assert!(!is_host(&h, &bob));
}

#[test]
fn test_lobby_list_shows_created_lobby() {
    let mut h = Harness::new();
    let mut alice = h.join("alice");
    let mut bob = h.join("bob");
    h.request(&alice, json!({"message": 2, "id": 1, "lobby_description": "4p casual"}));
    let code = alice.drain()[0]["lobby_code"].clone();

    h.request(&bob, json!({"message": 1, "id": 42}));

    let reply = bob.drain().pop().unwrap();
    assert_eq!(reply["id"], 42);
    assert_eq!(
        reply["lobby_list"],
        json!([{"code": code, "description": "4p casual"}])
    );
}

// =========================================================================
// Scenario 2: host disconnect
// =========================================================================

#[test]
fn test_host_disconnect_promotes_next_member() {
    let mut h = Harness::new();
    let mut alice = h.join("alice");
    let mut bob = h.join("bob");
    let mut carol = h.join("carol");
    let code = h.create_lobby(&mut alice);
    h.join_lobby(&mut bob, &code);
    h.join_lobby(&mut carol, &code);
    bob.drain();
    carol.drain();

    h.close(&alice);
    h.tick();

    let (alice_id, bob_id) = (alice.peer_id, bob.peer_id);
    for client in [&mut bob, &mut carol] {
        let frames = client.drain();
        assert_eq!(frames.len(), 2, "{frames:?}");
        assert_eq!(frames[0]["message"], 4);
        assert_eq!(frames[0]["leaving_peer"]["id"], alice_id);
        assert_eq!(frames[1]["message"], 11);
        assert_eq!(frames[1]["host_peer"]["id"], bob_id);
    }
    assert_eq!(lobby_members(&h, &code), vec![bob.peer_id, carol.peer_id]);
    assert!(is_host(&h, &bob));
    assert!(h.relay.state().invariant_violations().is_empty());
}

#[test]
fn test_last_member_disconnect_removes_lobby() {
    let mut h = Harness::new();
    let mut alice = h.join("alice");
    let code = h.create_lobby(&mut alice);

    h.close(&alice);
    h.tick();

    assert!(h.relay.state().lobbies.is_empty());
    assert!(h.relay.state().peers.is_empty());
    assert!(
        h.relay
            .state()
            .lobbies
            .was_issued(&LobbyCode::from(code.as_str()))
    );
}

#[test]
fn test_voluntary_host_leave_promotes_and_acks() {
    let mut h = Harness::new();
    let mut alice = h.join("alice");
    let mut bob = h.join("bob");
    let code = h.create_lobby(&mut alice);
    h.join_lobby(&mut bob, &code);
    alice.drain();
    bob.drain();

    h.request(&alice, json!({"message": 4, "id": 77, "lobby_code": code}));

    let to_alice = alice.drain();
    assert_eq!(to_alice.len(), 1);
    assert_eq!(to_alice[0]["id"], 77);
    assert_eq!(to_alice[0]["success"], true);

    let to_bob = bob.drain();
    assert_eq!(to_bob[0]["leaving_peer"]["username"], "alice");
    assert_eq!(to_bob[1]["host_peer"]["id"], bob.peer_id);
    assert!(is_host(&h, &bob));
    assert!(!is_host(&h, &alice));
}

// =========================================================================
// Scenario 3: offer to an unknown target
// =========================================================================

#[test]
fn test_offer_to_unknown_target_fails_and_forwards_nothing() {
    let mut h = Harness::new();
    let mut alice = h.join("alice");
    let mut bob = h.join("bob");
    let ghost = (alice.peer_id + bob.peer_id + 1) % i64::from(i32::MAX);

    h.request(
        &alice,
        json!({"message": 7, "id": 5, "offer_type": "offer", "sdp": "v=0", "target_id": ghost}),
    );

    let to_alice = alice.drain();
    assert_eq!(to_alice.len(), 1);
    assert_eq!(to_alice[0]["message"], 7);
    assert_eq!(to_alice[0]["id"], 5);
    assert_eq!(to_alice[0]["success"], false);
    assert!(to_alice[0]["error"].as_str().unwrap().contains("not found"));
    assert!(bob.drain().is_empty());
}

#[test]
fn test_signaling_with_negative_target_gets_failure_reply() {
    let mut h = Harness::new();
    let mut alice = h.join("alice");

    h.request(
        &alice,
        json!({"message": 7, "id": 6, "offer_type": "offer", "sdp": "v=0", "target_id": -1}),
    );
    h.request(
        &alice,
        json!({"message": 9, "id": 7, "media": "0", "index": 0, "name": "c", "target_id": 4294967296u64}),
    );

    let replies = alice.drain();
    assert_eq!(replies.len(), 2, "{replies:?}");
    assert_eq!(replies[0]["message"], 7);
    assert_eq!(replies[0]["id"], 6);
    assert_eq!(replies[0]["success"], false);
    assert_eq!(replies[1]["message"], 9);
    assert_eq!(replies[1]["success"], false);
}

// =========================================================================
// Scenario 4: lobby chat
// =========================================================================

#[test]
fn test_lobby_message_reaches_every_member_including_sender() {
    let mut h = Harness::new();
    let mut alice = h.join("alice");
    let mut bob = h.join("bob");
    let mut carol = h.join("carol");
    let mut outsider = h.join("dave");
    let code = h.create_lobby(&mut alice);
    h.join_lobby(&mut bob, &code);
    h.join_lobby(&mut carol, &code);
    for c in [&mut alice, &mut bob, &mut carol] {
        c.drain();
    }

    h.request(&bob, json!({"message": 5, "id": 3, "lobby_message": "ready?"}));

    let bob_id = bob.peer_id;
    for client in [&mut alice, &mut bob, &mut carol] {
        let frames = client.drain();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["lobby_message"], "ready?");
        assert_eq!(frames[0]["peer_sender"]["id"], bob_id);
        assert_eq!(frames[0]["peer_sender"]["username"], "bob");
    }
    assert!(outsider.drain().is_empty());
}

// =========================================================================
// Signaling and session start
// =========================================================================

#[test]
fn test_signaling_round_trip_keeps_payload_and_stamps_sender() {
    let mut h = Harness::new();
    let mut alice = h.join("alice");
    let mut bob = h.join("bob");

    h.request(
        &alice,
        json!({
            "message": 7, "id": 1234,
            "offer_type": "offer", "sdp": "v=0\r\no=- 1 2 IN IP4 0.0.0.0",
            "target_id": bob.peer_id, "mid": "0"
        }),
    );
    let offer = bob.drain().pop().unwrap();
    assert_eq!(
        offer,
        json!({
            "message": 7, "id": alice.peer_id,
            "offer_type": "offer", "sdp": "v=0\r\no=- 1 2 IN IP4 0.0.0.0",
            "target_id": bob.peer_id, "mid": "0"
        })
    );

    h.request(
        &bob,
        json!({"message": 8, "id": 0, "answer_type": "answer", "sdp": "v=0", "target_id": alice.peer_id}),
    );
    let answer = alice.drain().pop().unwrap();
    assert_eq!(answer["id"], bob.peer_id);
    assert_eq!(answer["answer_type"], "answer");

    h.request(
        &alice,
        json!({"message": 9, "id": 0, "media": "0", "index": 0, "name": "candidate:1", "target_id": bob.peer_id}),
    );
    let ice = bob.drain().pop().unwrap();
    assert_eq!(ice["id"], alice.peer_id);
    assert_eq!(ice["name"], "candidate:1");
}

#[test]
fn test_start_session_lists_members_in_join_order() {
    let mut h = Harness::new();
    let mut alice = h.join("alice");
    let mut bob = h.join("bob");
    let code = h.create_lobby(&mut alice);
    h.join_lobby(&mut bob, &code);
    alice.drain();
    bob.drain();

    h.request(&alice, json!({"message": 10, "id": 0}));

    let start_peers = json!([alice.peer_id, bob.peer_id]);
    for client in [&mut alice, &mut bob] {
        let frames = client.drain();
        assert_eq!(frames[0]["message"], 10);
        assert_eq!(frames[0]["start_peers"], start_peers);
    }
}

// =========================================================================
// Invariants
// =========================================================================

#[test]
fn test_join_while_in_lobby_rejected() {
    let mut h = Harness::new();
    let mut alice = h.join("alice");
    let mut bob = h.join("bob");
    let first = h.create_lobby(&mut alice);
    let second = h.create_lobby(&mut bob);

    h.join_lobby(&mut alice, &second);

    let reply = alice.drain().pop().unwrap();
    assert_eq!(reply["success"], false);
    assert_eq!(lobby_members(&h, &first), vec![alice.peer_id]);
    assert_eq!(lobby_members(&h, &second), vec![bob.peer_id]);
}

#[test]
fn test_lobby_codes_unique_across_lifetime() {
    let mut h = Harness::new();
    let mut alice = h.join("alice");
    let mut seen = std::collections::HashSet::new();

    for _ in 0..50 {
        let code = h.create_lobby(&mut alice);
        assert!(seen.insert(code.clone()), "code {code} reused");
        h.request(&alice, json!({"message": 4, "id": 0}));
        alice.drain();
    }
    assert!(h.relay.state().lobbies.is_empty());
}

#[test]
fn test_no_dangling_members_after_sweep() {
    let mut h = Harness::new();
    let mut clients: Vec<Client> = (0..6).map(|n| h.join(&format!("p{n}"))).collect();
    let code = h.create_lobby(&mut clients[0]);
    for client in clients.iter_mut().skip(1) {
        h.join_lobby(client, &code);
    }

    // Host and two others drop in the same tick.
    for index in [0, 2, 4] {
        h.close(&clients[index]);
    }
    h.tick();

    let remaining = lobby_members(&h, &code);
    assert_eq!(
        remaining,
        vec![clients[1].peer_id, clients[3].peer_id, clients[5].peer_id]
    );
    assert!(h.relay.state().invariant_violations().is_empty());
    assert!(is_host(&h, &clients[1]));
}

// =========================================================================
// Protocol errors and the event cycle
// =========================================================================

#[test]
fn test_undecodable_frames_are_discarded_and_connection_survives() {
    let mut h = Harness::new();
    let mut alice = h.join("alice");

    h.send_raw(&alice, b"Test msg!");
    h.send(&alice, json!({"message": 6, "id": 1}));
    h.send(&alice, json!({"message": 3, "id": 1}));
    h.tick();
    assert!(alice.drain().is_empty(), "protocol errors get no reply");

    h.request(&alice, json!({"message": "1", "id": 2}));
    let reply = alice.drain().pop().unwrap();
    assert_eq!(reply["message"], 1);
    assert_eq!(reply["id"], 2);
}

#[test]
fn test_tick_processes_events_in_order_then_sweeps() {
    let mut h = Harness::new();
    let mut alice = h.join("alice");
    let mut bob = h.join("bob");
    let code = h.create_lobby(&mut alice);

    // Join, chat, and the host's close all land in one tick.
    h.send(&bob, json!({"message": 3, "id": 1, "lobby_code": code}));
    h.send(&alice, json!({"message": 5, "id": 2, "lobby_message": "hi"}));
    h.close(&alice);
    let report = h.tick();

    assert_eq!(report.events, 3);
    assert!(!report.disconnected);
    let to_bob: Vec<i64> = bob
        .drain()
        .iter()
        .map(|f| f["message"].as_i64().unwrap())
        .collect();
    assert_eq!(to_bob, vec![11, 3, 5, 4, 11]);
    assert_eq!(lobby_members(&h, &code), vec![bob.peer_id]);
}

#[test]
fn test_tick_reports_disconnected_inbox() {
    let (inbox_tx, mut inbox_rx) = mpsc::unbounded_channel::<RelayEvent>();
    let mut relay = Relay::new(RelayState::default());
    drop(inbox_tx);

    let report = relay.tick(&mut inbox_rx);

    assert!(report.disconnected);
    assert_eq!(report.events, 0);
}
