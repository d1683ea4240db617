//! `RelayServer` builder and server loop.
//!
//! This is the entry point for running a relay. It ties the layers together:
//! transport → connection tasks → relay inbox → tick-driven relay core.

use std::net::SocketAddr;
use std::time::Duration;

use lobbyrelay_lobby::LobbyConfig;
use lobbyrelay_tick::{TickConfig, TickScheduler};
use lobbyrelay_transport::{Transport, WebSocketTransport};
use tokio::sync::mpsc;

use crate::connection::serve_connection;
use crate::relay::{Relay, RelayEvent};
use crate::{RelayConfig, RelayError, RelayState};

/// Builder for configuring and starting a relay.
///
/// ```rust,no_run
/// # async fn start() -> Result<(), lobbyrelay::RelayError> {
/// use lobbyrelay::RelayServer;
///
/// let server = RelayServer::builder()
///     .bind("0.0.0.0:4556")
///     .tick_rate(30)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RelayServerBuilder {
    config: RelayConfig,
}

impl RelayServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a full configuration, e.g. one read from a file.
    pub fn from_config(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Sets the address to bind the listener to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the core loop rate in Hz. Clamped to 1–128.
    pub fn tick_rate(mut self, hz: u32) -> Self {
        self.config.tick_rate_hz = hz;
        self
    }

    /// Drops accepted streams that do not finish the WebSocket handshake
    /// within `timeout`.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout_secs = timeout.as_secs();
        self
    }

    /// Closes connections that send nothing for `timeout`. Zero disables it.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout_secs = timeout.as_secs();
        self
    }

    pub fn lobby_config(mut self, config: LobbyConfig) -> Self {
        self.config.lobby = config;
        self
    }

    /// Binds the listener.
    ///
    /// # Errors
    /// Returns [`RelayError::Transport`] if the address cannot be bound.
    pub async fn build(self) -> Result<RelayServer, RelayError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        Ok(RelayServer {
            transport,
            config: self.config,
        })
    }
}

/// A bound relay. Call [`run()`](Self::run) to start serving.
pub struct RelayServer {
    transport: WebSocketTransport,
    config: RelayConfig,
}

impl RelayServer {
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        Ok(self.transport.local_addr()?)
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Runs the relay: spawns the core task, then accepts connections until
    /// the future is dropped.
    ///
    /// The loop only accepts TCP streams; each WebSocket handshake runs in
    /// the stream's own task, so a client that stalls its upgrade holds up
    /// nobody else. Accept failures are logged and do not stop the loop.
    pub async fn run(mut self) -> Result<(), RelayError> {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let scheduler = TickScheduler::new(TickConfig::with_rate(self.config.tick_rate_hz));
        let relay = Relay::new(RelayState::new(self.config.lobby.clone()));
        let handshake_timeout = self.config.handshake_timeout();
        let idle_timeout = self.config.idle_timeout();

        tracing::info!(
            addr = ?self.transport.local_addr().ok(),
            tick_rate_hz = scheduler.tick_rate_hz(),
            ?handshake_timeout,
            ?idle_timeout,
            "lobby relay running"
        );
        tokio::spawn(run_core(relay, inbox_rx, scheduler));

        loop {
            match self.transport.accept().await {
                Ok(pending) => {
                    tokio::spawn(serve_connection(
                        pending,
                        inbox_tx.clone(),
                        handshake_timeout,
                        idle_timeout,
                    ));
                }
                Err(error) => {
                    tracing::warn!(%error, "accept failed");
                }
            }
        }
    }
}

/// The relay task: one tick at a time until every event sender is gone.
async fn run_core(
    mut relay: Relay,
    mut inbox: mpsc::UnboundedReceiver<RelayEvent>,
    mut scheduler: TickScheduler,
) {
    loop {
        scheduler.wait_for_tick().await;
        let report = relay.tick(&mut inbox);
        scheduler.record_tick_end();

        if report.events > 0 {
            tracing::trace!(
                events = report.events,
                delivered = report.delivered,
                "tick processed"
            );
        }
        if report.disconnected {
            tracing::info!(ticks = scheduler.tick_count(), "relay inbox closed, core stopping");
            break;
        }
    }
}
