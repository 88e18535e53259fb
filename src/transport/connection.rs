//! Per-connection event loop.
//!
//! Every accepted WebSocket runs one [`drive`] task that bridges the socket
//! and an [`Endpoint`]:
//!
//! - Inbound text frames are handed to the endpoint strictly in order; each
//!   is handled to completion before the next is read. Binary frames are
//!   decoded as UTF-8 and take the same path.
//! - Frames queued on the connection's [`PeerHandle`] are encoded as JSON
//!   and written out.
//! - Close frame, stream end, read error or server shutdown ends the loop.
//!
//! On exit the peer handle is marked closed and [`Endpoint::on_close`] runs
//! exactly once.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::to_string;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::protocol::ServerMessage;

use super::PeerHandle;

// ============================================================================
// Endpoint
// ============================================================================

/// Application logic behind one upgrade path.
///
/// `Session` is whatever per-connection state the endpoint keeps. It is
/// owned by the connection task, so no locking is needed to touch it.
#[async_trait]
pub trait Endpoint: Send + Sync + 'static {
    /// Per-connection state.
    type Session: Send;

    /// Called once after the upgrade completes.
    async fn on_connect(&self, peer: PeerHandle) -> Self::Session;

    /// Called for every inbound data frame, in arrival order.
    async fn on_message(&self, session: &mut Self::Session, text: &str);

    /// Called exactly once when the connection ends.
    async fn on_close(&self, session: Self::Session);
}

// ============================================================================
// EndpointHandler
// ============================================================================

/// Type-erased [`Endpoint`], as stored by the dispatcher.
#[async_trait]
pub trait EndpointHandler: Send + Sync {
    /// Runs the connection until it ends.
    async fn serve(&self, ws: WebSocketStream<TcpStream>, shutdown: watch::Receiver<bool>);
}

#[async_trait]
impl<E: Endpoint> EndpointHandler for E {
    async fn serve(&self, ws: WebSocketStream<TcpStream>, shutdown: watch::Receiver<bool>) {
        drive(self, ws, shutdown).await;
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Runs the event loop for one upgraded connection.
///
/// `shutdown` flips to `true` when the server stops; the loop then sends a
/// close frame and exits.
pub async fn drive<E, S>(endpoint: &E, ws: WebSocketStream<S>, mut shutdown: watch::Receiver<bool>)
where
    E: Endpoint + ?Sized,
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (peer, mut outbound) = PeerHandle::channel();
    let conn_id = peer.id();
    let (mut ws_write, mut ws_read) = ws.split();

    let mut session = endpoint.on_connect(peer.clone()).await;
    debug!(%conn_id, "Connection loop started");

    if *shutdown.borrow() {
        let _ = ws_write.close().await;
    } else {
        loop {
            tokio::select! {
                // Incoming frames from the client
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            endpoint.on_message(&mut session, text.as_str()).await;
                        }

                        // Invalid UTF-8 becomes U+FFFD and fails to parse downstream
                        Some(Ok(Message::Binary(data))) => {
                            trace!(%conn_id, len = data.len(), "Binary frame decoded as text");
                            let text = String::from_utf8_lossy(&data);
                            endpoint.on_message(&mut session, &text).await;
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!(%conn_id, "WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            debug!(%conn_id, error = %e, "WebSocket read failed");
                            break;
                        }

                        None => {
                            debug!(%conn_id, "WebSocket stream ended");
                            break;
                        }

                        // Ping/Pong are answered by tungstenite
                        Some(Ok(_)) => {}
                    }
                }

                // Frames queued through the peer handle
                outgoing = outbound.recv() => {
                    let Some(msg) = outgoing else {
                        break;
                    };

                    if let Err(e) = write_frame(&mut ws_write, &msg).await {
                        warn!(%conn_id, error = %e, kind = msg.kind(), "Failed to write frame");
                        break;
                    }
                }

                // Server shutdown
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!(%conn_id, "Closing for server shutdown");
                        let _ = ws_write.close().await;
                        break;
                    }
                }
            }
        }
    }

    peer.close();
    endpoint.on_close(session).await;

    debug!(%conn_id, "Connection loop terminated");
}

/// Encodes and writes one outbound frame.
async fn write_frame<S>(
    ws_write: &mut SplitSink<WebSocketStream<S>, Message>,
    msg: &ServerMessage,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let json = to_string(msg)?;
    ws_write.send(Message::Text(json.into())).await?;
    trace!(kind = msg.kind(), "Frame sent");
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
