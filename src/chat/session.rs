//! Per-connection chat state machine.
//!
//! ```text
//!   accept ──► Unregistered ──register──► Registered(user) ──┐
//!                  │   ▲                      │  register    │
//!                  │   └──────────────────────┘  (rebind)    │
//!                  └──────────── transport close ────────────┴──► Closed
//! ```
//!
//! `Closed` is terminal. Room and chat actions require `Registered`.

// ============================================================================
// Imports
// ============================================================================

use std::mem;

use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::UserId;
use crate::protocol::ServerMessage;
use crate::transport::PeerHandle;

// ============================================================================
// SessionState
// ============================================================================

/// Lifecycle state of one chat connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted, no identity bound yet.
    Unregistered,
    /// Bound to a chat identity.
    Registered(UserId),
    /// Transport closed; no further events are processed.
    Closed,
}

// ============================================================================
// Session
// ============================================================================

/// A chat connection as seen by the router.
#[derive(Debug)]
pub struct Session {
    peer: PeerHandle,
    state: SessionState,
}

impl Session {
    /// Creates an unregistered session for `peer`.
    #[must_use]
    pub fn new(peer: PeerHandle) -> Self {
        Self {
            peer,
            state: SessionState::Unregistered,
        }
    }

    /// The connection's send handle.
    #[inline]
    #[must_use]
    pub fn peer(&self) -> &PeerHandle {
        &self.peer
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Bound identity, if registered.
    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        match &self.state {
            SessionState::Registered(user_id) => Some(user_id),
            _ => None,
        }
    }

    /// Returns `true` once the transport has closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// The guard applied before every room and chat action.
    ///
    /// # Errors
    ///
    /// [`Error::NotRegistered`] unless the session is registered.
    pub fn require_registered(&self) -> Result<&UserId> {
        self.user_id().ok_or(Error::NotRegistered)
    }

    /// Binds `user_id`, returning the identity previously bound, if any.
    pub(crate) fn bind(&mut self, user_id: UserId) -> Option<UserId> {
        match mem::replace(&mut self.state, SessionState::Registered(user_id)) {
            SessionState::Registered(previous) => Some(previous),
            _ => None,
        }
    }

    /// Moves to `Closed`, returning the state it left.
    pub(crate) fn close(&mut self) -> SessionState {
        mem::replace(&mut self.state, SessionState::Closed)
    }

    /// Sends a frame back to this connection.
    ///
    /// A closed peer is not an error here; the frame is dropped.
    pub fn reply(&self, msg: ServerMessage) {
        if let Err(e) = self.peer.send(msg) {
            debug!(conn_id = %self.peer.id(), error = %e, "Reply dropped");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
