//! WebSocket server: bind, accept, upgrade, dispatch.
//!
//! # Connection Flow
//!
//! 1. `ChatServer::start` binds a TCP listener and spawns the accept loop
//! 2. Each accepted stream is upgraded in its own task
//! 3. The handshake resolves the request path through the [`UpgradeDispatcher`]
//! 4. Unknown paths get HTTP 404 and the socket is dropped
//! 5. Known paths run the endpoint's connection loop until it ends
//!
//! # Shutdown
//!
//! ```text
//! shutdown() ──► accept loop stops ──► listener dropped
//!            └─► watch flips true ──► every connection loop closes
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::{Instant, sleep, timeout};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{Error, Result};

use super::connection::EndpointHandler;
use super::dispatcher::UpgradeDispatcher;

// ============================================================================
// Constants
// ============================================================================

/// How often the accept loop re-checks the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long `shutdown` waits for connection loops to finish.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

// ============================================================================
// ChatServer
// ============================================================================

/// Running WebSocket server.
///
/// # Example
///
/// ```ignore
/// let server = ChatServer::start(&config, dispatcher).await?;
/// println!("listening on {}", server.local_addr());
///
/// tokio::signal::ctrl_c().await?;
/// server.shutdown().await;
/// ```
pub struct ChatServer {
    /// Actual bound address.
    local_addr: SocketAddr,

    /// Path → endpoint table.
    dispatcher: UpgradeDispatcher,

    /// Live upgraded connections.
    connections: AtomicUsize,

    /// Accept loop stop flag.
    shutdown: AtomicBool,

    /// Broadcasts shutdown to connection loops.
    shutdown_tx: watch::Sender<bool>,
}

// ============================================================================
// ChatServer - Constructor
// ============================================================================

impl ChatServer {
    /// Binds the configured address and starts the accept loop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn start(config: &ServerConfig, dispatcher: UpgradeDispatcher) -> Result<Arc<Self>> {
        let listener = TcpListener::bind(config.socket_addr()).await?;
        let local_addr = listener.local_addr()?;

        debug!(%local_addr, "WebSocket server bound");

        let (shutdown_tx, _) = watch::channel(false);
        let server = Arc::new(Self {
            local_addr,
            dispatcher,
            connections: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
            shutdown_tx,
        });

        let server_clone = Arc::clone(&server);
        tokio::spawn(async move {
            server_clone.accept_loop(listener).await;
        });

        info!(%local_addr, paths = ?server.dispatcher.paths(), "ChatServer started");

        Ok(server)
    }
}

// ============================================================================
// ChatServer - Public API
// ============================================================================

impl ChatServer {
    /// Returns the bound address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the bound port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns the `ws://` URL for `path` on this server.
    #[must_use]
    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.local_addr, path)
    }

    /// Returns the routing table.
    #[inline]
    #[must_use]
    pub fn dispatcher(&self) -> &UpgradeDispatcher {
        &self.dispatcher
    }

    /// Returns the number of live upgraded connections.
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Returns `true` once shutdown has been requested.
    #[inline]
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Stops accepting, closes every connection and waits briefly for the
    /// connection loops to finish.
    pub async fn shutdown(&self) {
        info!("ChatServer shutting down");

        // Signal accept loop and connection loops
        self.shutdown.store(true, Ordering::SeqCst);
        self.shutdown_tx.send_replace(true);

        let deadline = Instant::now() + SHUTDOWN_GRACE;
        while self.connection_count() > 0 && Instant::now() < deadline {
            sleep(Duration::from_millis(10)).await;
        }

        let remaining = self.connection_count();
        if remaining > 0 {
            warn!(remaining, "Connections still open after shutdown grace");
        }

        info!("ChatServer shutdown complete");
    }
}

// ============================================================================
// ChatServer - Accept Loop
// ============================================================================

impl ChatServer {
    /// Background task that accepts new connections.
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        debug!("Accept loop started");

        loop {
            if self.is_shutdown() {
                debug!("Accept loop shutting down");
                break;
            }

            // Accept with timeout to allow checking shutdown flag
            match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
                Ok(Ok((stream, addr))) => {
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(stream, addr).await {
                            warn!(error = %e, ?addr, "Connection handling failed");
                        }
                    });
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Accept failed");
                }
                Err(_) => continue,
            }
        }

        debug!("Accept loop terminated");
    }

    /// Upgrades one TCP stream and runs its endpoint.
    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        debug!(?addr, "New TCP connection");

        let mut resolved: Option<(String, Arc<dyn EndpointHandler>)> = None;

        let callback = |request: &Request, response: Response| {
            let path = request.uri().path();
            match self.dispatcher.resolve(path) {
                Some(handler) => {
                    resolved = Some((path.to_string(), handler));
                    Ok(response)
                }
                None => Err(not_found()),
            }
        };

        let ws_stream = match accept_hdr_async(stream, callback).await {
            Ok(ws_stream) => ws_stream,
            Err(WsError::Http(response)) => {
                debug!(?addr, status = %response.status(), "Upgrade rejected");
                return Ok(());
            }
            Err(e) => {
                return Err(Error::connection(format!("WebSocket upgrade failed: {e}")));
            }
        };

        let Some((path, handler)) = resolved else {
            return Err(Error::connection("Upgrade completed without a route"));
        };

        info!(?addr, path = %path, "WebSocket connection established");

        self.connections.fetch_add(1, Ordering::SeqCst);
        handler.serve(ws_stream, self.shutdown_tx.subscribe()).await;
        self.connections.fetch_sub(1, Ordering::SeqCst);

        debug!(?addr, path = %path, "WebSocket connection finished");
        Ok(())
    }
}

/// Handshake response for an unrouted path.
fn not_found() -> ErrorResponse {
    let mut response = ErrorResponse::new(Some("Not Found".to_string()));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use tokio_tungstenite::connect_async;

    use crate::transport::{Endpoint, PeerHandle};

    struct Nop;

    #[async_trait]
    impl Endpoint for Nop {
        type Session = ();

        async fn on_connect(&self, _peer: PeerHandle) {}

        async fn on_message(&self, _session: &mut (), _text: &str) {}

        async fn on_close(&self, _session: ()) {}
    }

    fn local_config() -> ServerConfig {
        ServerConfig::builder().port(0).build().unwrap()
    }

    #[tokio::test]
    async fn test_server_binds_random_port() {
        let server = ChatServer::start(&local_config(), UpgradeDispatcher::new())
            .await
            .expect("server start");

        assert!(server.port() > 0);
        assert_eq!(
            server.ws_url("/chat"),
            format!("ws://127.0.0.1:{}/chat", server.port())
        );
        assert_eq!(server.connection_count(), 0);

        server.shutdown().await;
        assert!(server.is_shutdown());
    }

    #[tokio::test]
    async fn test_unknown_path_is_refused() {
        let dispatcher = UpgradeDispatcher::new().route("/chat", Nop);
        let server = ChatServer::start(&local_config(), dispatcher)
            .await
            .expect("server start");

        let result = connect_async(server.ws_url("/nope")).await;
        match result {
            Err(WsError::Http(response)) => assert_eq!(response.status(), StatusCode::NOT_FOUND),
            other => panic!("expected 404, got {:?}", other.map(|_| ())),
        }

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_connection_count_tracks_live_sockets() {
        let dispatcher = UpgradeDispatcher::new().route("/chat", Nop);
        let server = ChatServer::start(&local_config(), dispatcher)
            .await
            .expect("server start");

        let (client, _) = connect_async(server.ws_url("/chat")).await.unwrap();
        for _ in 0..50 {
            if server.connection_count() == 1 {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(server.connection_count(), 1);

        drop(client);
        for _ in 0..50 {
            if server.connection_count() == 0 {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(server.connection_count(), 0);

        server.shutdown().await;
    }
}
