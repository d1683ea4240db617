//! Per-connection tasks.
//!
//! Each accepted stream first completes its WebSocket handshake here, off
//! the accept loop. It then runs a reader loop (this task) and a writer
//! task. The reader forwards frames to the relay inbox; the writer drains
//! the peer's outbound link. Neither touches relay state.

use std::sync::Arc;
use std::time::Duration;

use lobbyrelay_transport::{Connection, PendingConnection, PendingWebSocket};
use tokio::sync::mpsc;

use crate::relay::RelayEvent;

/// Upgrades one accepted stream, then serves it until it closes, errors,
/// or idles out. A stream that does not finish its handshake within
/// `handshake_timeout` is dropped before the relay ever sees it.
pub(crate) async fn serve_connection(
    pending: PendingWebSocket,
    inbox: mpsc::UnboundedSender<RelayEvent>,
    handshake_timeout: Duration,
    idle_timeout: Option<Duration>,
) {
    let connection = pending.id();
    let remote = pending.remote_addr();
    let conn = match tokio::time::timeout(handshake_timeout, pending.handshake()).await {
        Ok(Ok(conn)) => Arc::new(conn),
        Ok(Err(error)) => {
            tracing::warn!(%connection, %remote, %error, "handshake failed");
            return;
        }
        Err(_) => {
            tracing::warn!(%connection, %remote, "handshake timed out");
            return;
        }
    };
    tracing::debug!(%connection, %remote, "serving connection");

    let (outbound, mut frames) = mpsc::unbounded_channel::<Vec<u8>>();
    if inbox
        .send(RelayEvent::Opened {
            connection,
            outbound,
        })
        .is_err()
    {
        tracing::warn!(%connection, "relay stopped, dropping connection");
        let _ = conn.close().await;
        return;
    }

    let writer_conn = Arc::clone(&conn);
    let writer = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            if let Err(error) = writer_conn.send(&frame).await {
                tracing::debug!(%connection, %error, "send failed, stopping writer");
                break;
            }
        }
        let _ = writer_conn.close().await;
    });

    loop {
        let next = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, conn.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::info!(%connection, "idle timeout, closing connection");
                    break;
                }
            },
            None => conn.recv().await,
        };

        match next {
            Ok(Some(data)) => {
                if inbox.send(RelayEvent::Frame { connection, data }).is_err() {
                    break;
                }
            }
            Ok(None) => {
                tracing::debug!(%connection, "connection closed by peer");
                break;
            }
            Err(error) => {
                tracing::debug!(%connection, %error, "receive failed");
                break;
            }
        }
    }

    // The relay drops the peer's link on `Closed`, which ends the writer.
    if inbox.send(RelayEvent::Closed { connection }).is_err() {
        writer.abort();
        let _ = conn.close().await;
        return;
    }
    if let Err(error) = writer.await {
        tracing::debug!(%connection, %error, "writer task ended abnormally");
    }
}
