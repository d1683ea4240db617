//! Lobby relay server.
//!
//! Run with: `cargo run -p lobbyrelay-server -- --bind 0.0.0.0:4556`
//!
//! Log verbosity follows `RUST_LOG`, e.g. `RUST_LOG=lobbyrelay=debug`.

use std::time::Duration;

use clap::Parser;
use lobbyrelay::{RelayConfig, RelayServerBuilder};
use tracing_subscriber::EnvFilter;

/// CLI arguments for the relay binary.
#[derive(Parser, Debug)]
#[command(name = "lobbyrelay-server", version, about = "Lobby and WebRTC signaling relay")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "LOBBYRELAY_BIND", default_value = "0.0.0.0:4556")]
    bind: String,

    /// Core loop rate in Hz (1-128).
    #[arg(long, env = "LOBBYRELAY_TICK_RATE", default_value_t = 30)]
    tick_rate: u32,

    /// Seconds an accepted stream gets to finish the WebSocket handshake.
    #[arg(long, env = "LOBBYRELAY_HANDSHAKE_TIMEOUT", default_value_t = 10)]
    handshake_timeout: u64,

    /// Seconds of silence before a connection is closed. 0 disables it.
    #[arg(long, env = "LOBBYRELAY_IDLE_TIMEOUT", default_value_t = 0)]
    idle_timeout: u64,
}

impl Args {
    fn into_config(self) -> RelayConfig {
        RelayConfig {
            bind_addr: self.bind,
            tick_rate_hz: self.tick_rate,
            handshake_timeout_secs: self.handshake_timeout,
            idle_timeout_secs: self.idle_timeout,
            ..RelayConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .compact()
        .init();

    let config = Args::parse().into_config();
    tracing::info!(
        bind = %config.bind_addr,
        tick_rate_hz = config.tick_rate_hz,
        idle_timeout = ?config.idle_timeout().unwrap_or(Duration::ZERO),
        "starting lobby relay"
    );

    let server = RelayServerBuilder::from_config(config).build().await?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("ctrl-c received, shutting down");
        }
    }
    Ok(())
}
