//! `/users`: presence snapshots.
//!
//! Sends `{"type":"online_users","data":[...]}` once on connect, and again
//! in reply to any text frame. Nothing is pushed when presence changes.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::chat::MessageRouter;
use crate::protocol::ServerMessage;
use crate::transport::{Endpoint, PeerHandle};

// ============================================================================
// PresenceEndpoint
// ============================================================================

/// Read-only view of who is registered on the chat endpoint.
#[derive(Debug, Clone)]
pub struct PresenceEndpoint {
    router: Arc<MessageRouter>,
}

impl PresenceEndpoint {
    /// Creates an endpoint reporting on `router`.
    #[must_use]
    pub fn new(router: Arc<MessageRouter>) -> Self {
        Self { router }
    }

    fn send_snapshot(&self, peer: &PeerHandle) {
        let msg = ServerMessage::OnlineUsers {
            data: self.router.presence_snapshot(),
        };
        if let Err(e) = peer.send(msg) {
            debug!(conn_id = %peer.id(), error = %e, "Presence snapshot dropped");
        }
    }
}

#[async_trait]
impl Endpoint for PresenceEndpoint {
    type Session = PeerHandle;

    async fn on_connect(&self, peer: PeerHandle) -> PeerHandle {
        self.send_snapshot(&peer);
        peer
    }

    async fn on_message(&self, peer: &mut PeerHandle, _text: &str) {
        self.send_snapshot(peer);
    }

    async fn on_close(&self, peer: PeerHandle) {
        debug!(conn_id = %peer.id(), "Presence connection closed");
    }
}

// ============================================================================
// Tests
// ============================================================================
