//! `/chat`: the chat endpoint.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;

use crate::chat::{MessageRouter, Session};
use crate::transport::{Endpoint, PeerHandle};

// ============================================================================
// ChatEndpoint
// ============================================================================

/// Feeds chat connections into a shared [`MessageRouter`].
#[derive(Debug, Clone)]
pub struct ChatEndpoint {
    router: Arc<MessageRouter>,
}

impl ChatEndpoint {
    /// Creates an endpoint backed by `router`.
    #[must_use]
    pub fn new(router: Arc<MessageRouter>) -> Self {
        Self { router }
    }

    /// The router this endpoint feeds.
    #[inline]
    #[must_use]
    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }
}

#[async_trait]
impl Endpoint for ChatEndpoint {
    type Session = Session;

    async fn on_connect(&self, peer: PeerHandle) -> Session {
        self.router.connect(peer)
    }

    async fn on_message(&self, session: &mut Session, text: &str) {
        self.router.handle_frame(session, text);
    }

    async fn on_close(&self, mut session: Session) {
        self.router.disconnect(&mut session);
    }
}

// ============================================================================
// Tests
// ============================================================================
