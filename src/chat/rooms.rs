//! Room index: which users belong to which rooms.
//!
//! Purely relational. Rooms hold [`UserId`]s, never transport handles, so
//! a disconnect can never leave a dangling reference behind; delivery
//! always goes back through the registry.
//!
//! # Invariants
//!
//! - A room with zero members does not exist.
//! - The forward map (room → users) and reverse map (user → rooms) always
//!   describe the same membership relation.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::{FxHashMap, FxHashSet};

use crate::identifiers::{RoomId, UserId};

// ============================================================================
// RoomIndex
// ============================================================================

/// Room membership index.
///
/// Not synchronized; the router serializes access.
#[derive(Debug, Default)]
pub struct RoomIndex {
    /// Room → members.
    rooms: FxHashMap<RoomId, FxHashSet<UserId>>,
    /// User → rooms joined. Used for O(rooms-of-user) cleanup on disconnect.
    memberships: FxHashMap<UserId, FxHashSet<RoomId>>,
}

impl RoomIndex {
    /// Creates an empty index.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `user_id` to `room_id`, creating the room on first join.
    ///
    /// Returns `false` if the user was already a member.
    pub fn join(&mut self, room_id: &RoomId, user_id: &UserId) -> bool {
        let added = self
            .rooms
            .entry(room_id.clone())
            .or_default()
            .insert(user_id.clone());

        if added {
            self.memberships
                .entry(user_id.clone())
                .or_default()
                .insert(room_id.clone());
        }

        added
    }

    /// Removes `user_id` from `room_id`, deleting the room if it empties.
    ///
    /// Returns `false` if the user was not a member.
    pub fn leave(&mut self, room_id: &RoomId, user_id: &UserId) -> bool {
        let Some(members) = self.rooms.get_mut(room_id) else {
            return false;
        };

        if !members.remove(user_id) {
            return false;
        }

        if members.is_empty() {
            self.rooms.remove(room_id);
        }

        if let Some(joined) = self.memberships.get_mut(user_id) {
            joined.remove(room_id);
            if joined.is_empty() {
                self.memberships.remove(user_id);
            }
        }

        true
    }

    /// Snapshot of the members of `room_id`; empty if the room does not exist.
    #[must_use]
    pub fn members_of(&self, room_id: &RoomId) -> FxHashSet<UserId> {
        self.rooms.get(room_id).cloned().unwrap_or_default()
    }

    /// Borrows the members of `room_id`, or `None` if the room does not exist.
    #[inline]
    #[must_use]
    pub fn members(&self, room_id: &RoomId) -> Option<&FxHashSet<UserId>> {
        self.rooms.get(room_id)
    }

    /// Removes `user_id` from every room it belongs to, pruning emptied rooms.
    ///
    /// Returns the rooms that were touched.
    pub fn leave_all(&mut self, user_id: &UserId) -> Vec<RoomId> {
        let Some(joined) = self.memberships.remove(user_id) else {
            return Vec::new();
        };

        let mut affected = Vec::with_capacity(joined.len());
        for room_id in joined {
            if let Some(members) = self.rooms.get_mut(&room_id) {
                members.remove(user_id);
                if members.is_empty() {
                    self.rooms.remove(&room_id);
                }
            }
            affected.push(room_id);
        }

        affected
    }

    /// Rooms `user_id` currently belongs to.
    #[must_use]
    pub fn rooms_of(&self, user_id: &UserId) -> Vec<RoomId> {
        self.memberships
            .get(user_id)
            .map(|joined| joined.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns `true` if the room exists (has at least one member).
    #[inline]
    #[must_use]
    pub fn contains_room(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Returns `true` if `user_id` is a member of `room_id`.
    #[must_use]
    pub fn is_member(&self, room_id: &RoomId, user_id: &UserId) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|members| members.contains(user_id))
    }

    /// Number of existing rooms.
    #[inline]
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
