//! Connection registry: who is online, and how to reach them.
//!
//! Maps each registered [`UserId`] to the [`PeerHandle`] of its live
//! connection. At most one handle is bound per user; registering again
//! replaces the previous binding without notifying it.
//!
//! The registry knows nothing about rooms. Callers that unregister a user
//! must clean up the room index themselves.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;

use crate::identifiers::{ConnectionId, UserId};
use crate::transport::PeerHandle;

// ============================================================================
// ConnectionRegistry
// ============================================================================

/// Identity → live handle map.
///
/// Not synchronized; the router serializes access.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: FxHashMap<UserId, PeerHandle>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `user_id` to `handle`.
    ///
    /// Returns the previously bound handle if one was evicted.
    pub fn register(&mut self, user_id: UserId, handle: PeerHandle) -> Option<PeerHandle> {
        self.entries.insert(user_id, handle)
    }

    /// Returns the handle bound to `user_id`; `None` means offline.
    #[inline]
    #[must_use]
    pub fn lookup(&self, user_id: &UserId) -> Option<&PeerHandle> {
        self.entries.get(user_id)
    }

    /// Removes the binding for `user_id`.
    pub fn unregister(&mut self, user_id: &UserId) -> Option<PeerHandle> {
        self.entries.remove(user_id)
    }

    /// Returns `true` if `user_id` is currently bound to connection `conn_id`.
    #[must_use]
    pub fn is_bound_to(&self, user_id: &UserId, conn_id: ConnectionId) -> bool {
        self.entries
            .get(user_id)
            .is_some_and(|handle| handle.id() == conn_id)
    }

    /// Removes the binding only if it still belongs to connection `conn_id`.
    ///
    /// Returns `true` if an entry was removed.
    pub fn unregister_if_bound(&mut self, user_id: &UserId, conn_id: ConnectionId) -> bool {
        if self.is_bound_to(user_id, conn_id) {
            self.entries.remove(user_id);
            true
        } else {
            false
        }
    }

    /// Snapshot of every registered user. Order is unspecified.
    #[must_use]
    pub fn list_online(&self) -> Vec<UserId> {
        self.entries.keys().cloned().collect()
    }

    /// Iterates over every binding.
    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &PeerHandle)> {
        self.entries.iter()
    }

    /// Number of registered users.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nobody is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
