//! The relay core: turns transport events into state changes and frames.
//!
//! Transport tasks never touch [`RelayState`]. They push [`RelayEvent`]s into
//! an unbounded channel, and the single relay task drains that channel once
//! per tick:
//!
//! ```text
//!  connection tasks ──RelayEvent──▶ [inbox] ──tick()──▶ Relay
//!                                                        │ dispatch / sweep
//!  writer tasks ◀──────── encoded frames (per-peer link) ┘
//! ```
//!
//! `Relay` itself is synchronous, so it can be driven directly in tests with
//! in-memory channels standing in for sockets.

use std::collections::HashMap;

use lobbyrelay_protocol::{ClientPacket, Codec, Envelope, JsonCodec, PeerId};
use lobbyrelay_transport::ConnectionId;
use tokio::sync::mpsc;

use crate::dispatch::dispatch;
use crate::state::{Outbound, RelayState};
use crate::sweep::sweep;

/// Sender half of a peer's outbound frame queue.
pub type Link = mpsc::UnboundedSender<Vec<u8>>;

/// Something that happened on a connection.
#[derive(Debug)]
pub enum RelayEvent {
    /// A connection finished its handshake. Frames for its peer go to
    /// `outbound`.
    Opened {
        connection: ConnectionId,
        outbound: Link,
    },
    /// One inbound frame.
    Frame {
        connection: ConnectionId,
        data: Vec<u8>,
    },
    /// The connection closed or failed.
    Closed { connection: ConnectionId },
}

/// Counters for one [`Relay::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Events taken from the inbox.
    pub events: usize,
    /// Frames handed to peer links.
    pub delivered: usize,
    /// `true` once every event sender is gone; the relay can stop.
    pub disconnected: bool,
}

/// Owns the relay state and the outbound link of every peer.
pub struct Relay<C: Codec = JsonCodec> {
    state: RelayState,
    links: HashMap<PeerId, Link>,
    codec: C,
}

impl Relay<JsonCodec> {
    pub fn new(state: RelayState) -> Self {
        Self::with_codec(state, JsonCodec)
    }
}

impl<C: Codec> Relay<C> {
    pub fn with_codec(state: RelayState, codec: C) -> Self {
        Self {
            state,
            links: HashMap::new(),
            codec,
        }
    }

    pub fn state(&self) -> &RelayState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut RelayState {
        &mut self.state
    }

    /// Runs one tick: the events buffered when the tick starts, in arrival
    /// order, then a sweep. Events that arrive meanwhile wait for the next
    /// tick, so a busy inbox cannot postpone the sweep.
    pub fn tick(&mut self, inbox: &mut mpsc::UnboundedReceiver<RelayEvent>) -> TickReport {
        let budget = inbox.len();
        let mut report = self.drain(inbox, budget);
        report.delivered += self.sweep();
        report
    }

    /// Handles at most `limit` events from the inbox.
    fn drain(
        &mut self,
        inbox: &mut mpsc::UnboundedReceiver<RelayEvent>,
        limit: usize,
    ) -> TickReport {
        let mut report = TickReport::default();
        while report.events < limit {
            match inbox.try_recv() {
                Ok(event) => {
                    report.events += 1;
                    report.delivered += self.handle_event(event);
                }
                Err(_) => break,
            }
        }
        report.disconnected = inbox.is_closed() && inbox.is_empty();
        report
    }

    /// Applies one event. Returns the number of frames delivered.
    pub fn handle_event(&mut self, event: RelayEvent) -> usize {
        match event {
            RelayEvent::Opened {
                connection,
                outbound,
            } => {
                let peer_id = self.state.peers.register(connection);
                self.links.insert(peer_id, outbound);
                0
            }
            RelayEvent::Frame { connection, data } => self.handle_frame(connection, &data),
            RelayEvent::Closed { connection } => {
                match self.state.peers.flag_closed(connection) {
                    Ok(peer_id) => {
                        // Dropping the link ends the writer task, which
                        // closes the socket.
                        self.links.remove(&peer_id);
                        tracing::info!(%peer_id, %connection, "connection closed");
                    }
                    Err(error) => tracing::debug!(%error, "close for unknown connection"),
                }
                0
            }
        }
    }

    /// Runs the lifecycle sweep and delivers its notifications.
    pub fn sweep(&mut self) -> usize {
        let out = sweep(&mut self.state);
        self.deliver(out)
    }

    fn handle_frame(&mut self, connection: ConnectionId, data: &[u8]) -> usize {
        let Some(peer_id) = self.state.peers.by_connection(connection) else {
            tracing::warn!(%connection, "frame from unregistered connection dropped");
            return 0;
        };
        if self.state.peers.is_flagged(peer_id) {
            tracing::debug!(%peer_id, "frame from closing connection dropped");
            return 0;
        }

        let request: Envelope<ClientPacket> = match self.codec.decode(data) {
            Ok(request) => request,
            Err(error) => {
                tracing::warn!(%peer_id, %error, "discarding undecodable frame");
                return 0;
            }
        };

        let out = dispatch(&mut self.state, peer_id, request);
        self.deliver(out)
    }

    /// Encodes and queues each packet on its recipient's link. Packets for
    /// peers without a live link are dropped.
    fn deliver(&mut self, out: Vec<Outbound>) -> usize {
        let mut delivered = 0;
        for Outbound { to, envelope } in out {
            let Some(link) = self.links.get(&to) else {
                tracing::debug!(peer_id = %to, kind = %envelope.kind(), "no link, packet dropped");
                continue;
            };
            let frame = match self.codec.encode(&envelope) {
                Ok(frame) => frame,
                Err(error) => {
                    tracing::error!(peer_id = %to, %error, "failed to encode packet");
                    continue;
                }
            };
            if link.send(frame).is_err() {
                tracing::debug!(peer_id = %to, "link closed, packet dropped");
                continue;
            }
            delivered += 1;
        }
        delivered
    }
}
