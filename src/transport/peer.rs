//! Send handle for one connected peer.
//!
//! A [`PeerHandle`] is the only thing the chat core holds for a live
//! connection. Sending queues a [`ServerMessage`] on the connection's
//! outbound channel and returns immediately; the connection event loop
//! encodes and writes it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::protocol::ServerMessage;

// ============================================================================
// PeerHandle
// ============================================================================

/// Cloneable, fire-and-forget send handle for a connection.
///
/// All clones refer to the same peer. Once the connection loop exits, or
/// [`PeerHandle::close`] is called, the handle reports not open and every
/// send fails with [`Error::ConnectionClosed`].
#[derive(Clone)]
pub struct PeerHandle {
    /// Id of the underlying connection.
    id: ConnectionId,
    /// Outbound queue drained by the connection event loop.
    tx: mpsc::UnboundedSender<ServerMessage>,
    /// Cleared when the connection stops accepting writes.
    open: Arc<AtomicBool>,
}

impl PeerHandle {
    /// Creates a handle with a fresh [`ConnectionId`] and the receiving half
    /// of its outbound queue.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: ConnectionId::next(),
            tx,
            open: Arc::new(AtomicBool::new(true)),
        };
        (handle, rx)
    }

    /// Returns the connection id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns `true` if frames can still be queued for this peer.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    /// Queues a frame for delivery.
    ///
    /// Does not wait for the frame to reach the socket.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`] if the peer is no longer writable.
    pub fn send(&self, msg: ServerMessage) -> Result<()> {
        if !self.open.load(Ordering::Acquire) {
            return Err(Error::ConnectionClosed);
        }
        self.tx.send(msg).map_err(|_| Error::ConnectionClosed)
    }

    /// Marks the peer as no longer writable.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

impl fmt::Debug for PeerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerHandle")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
