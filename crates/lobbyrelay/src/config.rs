//! Relay configuration.

use std::time::Duration;

use lobbyrelay_lobby::LobbyConfig;
use serde::{Deserialize, Serialize};

/// Everything needed to start a relay.
///
/// Missing fields take their defaults when deserialized, so a config file
/// only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// Core loop rate in Hz (1–128). Each tick drains the inbox and sweeps.
    pub tick_rate_hz: u32,

    /// Drop accepted streams that have not completed the WebSocket
    /// handshake after this many seconds.
    pub handshake_timeout_secs: u64,

    /// Close connections that send nothing for this many seconds.
    /// 0 disables the timeout.
    pub idle_timeout_secs: u64,

    pub lobby: LobbyConfig,
}

impl RelayConfig {
    pub const DEFAULT_PORT: u16 = 4556;

    pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 10;

    /// The handshake timeout. Zero is raised to one second so a stalled
    /// client is always dropped eventually.
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs.max(1))
    }

    /// The idle timeout, or `None` when disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", Self::DEFAULT_PORT),
            tick_rate_hz: 30,
            handshake_timeout_secs: Self::DEFAULT_HANDSHAKE_TIMEOUT_SECS,
            idle_timeout_secs: 0,
            lobby: LobbyConfig::default(),
        }
    }
}
