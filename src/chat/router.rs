//! Message router: per-event state transitions and delivery fan-out.
//!
//! The router owns one [`ConnectionRegistry`] and one [`RoomIndex`] behind a
//! single coarse lock. Every event is handled to completion, fan-out
//! included, inside one critical section. Sends only queue frames on the
//! target's outbound channel, so nothing waits on network I/O while the
//! lock is held.
//!
//! # Event Handling
//!
//! | Event | Requires | Effect | Sender sees |
//! |-------|----------|--------|-------------|
//! | `register` | any | bind identity | `system` ack |
//! | `join_room` | registered | join | `system` ack |
//! | `leave_room` | registered | leave | `system` ack |
//! | `group_message` | registered, room exists | fan-out to room minus sender | nothing, or `error` |
//! | `broadcast_message` | registered | fan-out to everyone minus sender | nothing |
//! | `private_message` | registered | deliver to one | `system` offline notice on miss |
//! | bad frame | any | none | `error` |
//! | close | any | unregister + leave all rooms | - |

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{RoomId, UserId};
use crate::protocol::{ClientEvent, OnlineUser, ServerMessage};
use crate::transport::PeerHandle;

use super::registry::ConnectionRegistry;
use super::rooms::RoomIndex;
use super::session::{Session, SessionState};

// ============================================================================
// ChatState
// ============================================================================

/// Everything guarded by the router lock.
#[derive(Debug, Default)]
struct ChatState {
    registry: ConnectionRegistry,
    rooms: RoomIndex,
}

impl ChatState {
    /// Drops `user_id` from the registry and every room, but only while the
    /// registry still binds it to `peer`.
    ///
    /// Returns the rooms left, or `None` if the identity belongs to another
    /// connection now.
    fn release(&mut self, user_id: &UserId, peer: &PeerHandle) -> Option<Vec<RoomId>> {
        if self.registry.unregister_if_bound(user_id, peer.id()) {
            Some(self.rooms.leave_all(user_id))
        } else {
            None
        }
    }
}

// ============================================================================
// MessageRouter
// ============================================================================

/// Chat core shared by every connection of the chat endpoint.
///
/// Instances are independent; nothing is process-global.
///
/// # Example
///
/// ```ignore
/// let router = MessageRouter::new();
/// let (peer, outbound) = PeerHandle::channel();
/// let mut session = router.connect(peer);
///
/// router.handle_frame(&mut session, r#"{"type":"register","userId":"a"}"#);
/// router.disconnect(&mut session);
/// ```
#[derive(Debug, Default)]
pub struct MessageRouter {
    state: Mutex<ChatState>,
}

impl MessageRouter {
    /// Creates a router with an empty registry and room index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session for a freshly accepted connection.
    #[must_use]
    pub fn connect(&self, peer: PeerHandle) -> Session {
        debug!(conn_id = %peer.id(), "Chat connection opened");
        Session::new(peer)
    }

    /// Decodes and handles one inbound text frame.
    pub fn handle_frame(&self, session: &mut Session, text: &str) {
        if session.is_closed() {
            trace!(conn_id = %session.peer().id(), "Frame for closed session dropped");
            return;
        }

        match ClientEvent::decode(text) {
            Ok(event) => self.handle_event(session, event),
            Err(e) => {
                debug!(conn_id = %session.peer().id(), error = %e, "Rejected frame");
                session.reply(ServerMessage::from_error(&e));
            }
        }
    }

    /// Handles one decoded event.
    pub fn handle_event(&self, session: &mut Session, event: ClientEvent) {
        if session.is_closed() {
            return;
        }

        trace!(conn_id = %session.peer().id(), kind = event.kind(), "Chat event");

        let result = match event {
            ClientEvent::Register { user_id } => self.register(session, user_id),
            ClientEvent::JoinRoom { room_id } => self.join_room(session, room_id),
            ClientEvent::LeaveRoom { room_id } => self.leave_room(session, room_id),
            ClientEvent::GroupMessage { room_id, content } => {
                self.group_message(session, room_id, content)
            }
            ClientEvent::BroadcastMessage { content } => self.broadcast_message(session, content),
            ClientEvent::PrivateMessage {
                to_user_id,
                content,
            } => self.private_message(session, to_user_id, content),
        };

        match result {
            Ok(()) => {}
            Err(e @ Error::UserOffline { .. }) => {
                session.reply(ServerMessage::system(e.client_message()));
            }
            Err(e) => {
                debug!(conn_id = %session.peer().id(), error = %e, "Chat event refused");
                session.reply(ServerMessage::from_error(&e));
            }
        }
    }

    /// Handles transport close.
    ///
    /// Runs its cleanup exactly once per session; later calls are no-ops.
    /// Registry and room state for the session's identity are cleared
    /// before this returns.
    pub fn disconnect(&self, session: &mut Session) {
        session.peer().close();

        match session.close() {
            SessionState::Closed => {}
            SessionState::Unregistered => {
                debug!(conn_id = %session.peer().id(), "Unregistered chat connection closed");
            }
            SessionState::Registered(user_id) => {
                let released = self.state.lock().release(&user_id, session.peer());
                match released {
                    Some(rooms) => info!(
                        user_id = %user_id,
                        rooms_left = rooms.len(),
                        "User disconnected"
                    ),
                    None => debug!(
                        user_id = %user_id,
                        conn_id = %session.peer().id(),
                        "Evicted connection closed, identity kept by newer session"
                    ),
                }
            }
        }
    }
}

// ============================================================================
// MessageRouter - Event Handlers
// ============================================================================

impl MessageRouter {
    fn register(&self, session: &mut Session, user_id: UserId) -> Result<()> {
        let peer = session.peer().clone();

        {
            let mut state = self.state.lock();

            if let Some(previous) = session.user_id()
                && previous != &user_id
                && let Some(rooms) = state.release(previous, &peer)
            {
                debug!(
                    from = %previous,
                    to = %user_id,
                    rooms_left = rooms.len(),
                    "Connection switched identity"
                );
            }

            if let Some(evicted) = state.registry.register(user_id.clone(), peer.clone())
                && evicted.id() != peer.id()
            {
                warn!(
                    user_id = %user_id,
                    evicted = %evicted.id(),
                    conn_id = %peer.id(),
                    "Identity re-registered, previous connection evicted"
                );
            }
        }

        debug!(user_id = %user_id, conn_id = %peer.id(), "User registered");
        session.reply(ServerMessage::system(format!("Registered as {user_id}")));
        session.bind(user_id);
        Ok(())
    }

    fn join_room(&self, session: &Session, room_id: RoomId) -> Result<()> {
        let user_id = session.require_registered()?;

        if self.state.lock().rooms.join(&room_id, user_id) {
            debug!(user_id = %user_id, room_id = %room_id, "Joined room");
        }

        session.reply(ServerMessage::system(format!("Joined room {room_id}")));
        Ok(())
    }

    fn leave_room(&self, session: &Session, room_id: RoomId) -> Result<()> {
        let user_id = session.require_registered()?;

        if self.state.lock().rooms.leave(&room_id, user_id) {
            debug!(user_id = %user_id, room_id = %room_id, "Left room");
        }

        session.reply(ServerMessage::system(format!("Left room {room_id}")));
        Ok(())
    }

    fn group_message(&self, session: &Session, room_id: RoomId, content: String) -> Result<()> {
        let sender = session.require_registered()?;
        let state = self.state.lock();

        let members = state
            .rooms
            .members(&room_id)
            .ok_or_else(|| Error::room_not_found(room_id.clone()))?;

        let msg = ServerMessage::GroupMessage {
            room_id: room_id.clone(),
            from_user_id: sender.clone(),
            content,
        };

        let mut delivered = 0usize;
        for member in members.iter().filter(|member| *member != sender) {
            if let Some(handle) = state.registry.lookup(member)
                && deliver(member, handle, msg.clone())
            {
                delivered += 1;
            }
        }

        trace!(room_id = %room_id, from = %sender, delivered, "Group fan-out");
        Ok(())
    }

    fn broadcast_message(&self, session: &Session, content: String) -> Result<()> {
        let sender = session.require_registered()?;
        let state = self.state.lock();

        let msg = ServerMessage::BroadcastMessage {
            from_user_id: sender.clone(),
            content,
        };

        let delivered = state
            .registry
            .iter()
            .filter(|(user_id, _)| *user_id != sender)
            .filter(|(user_id, handle)| deliver(user_id, handle, msg.clone()))
            .count();

        trace!(from = %sender, delivered, "Broadcast fan-out");
        Ok(())
    }

    fn private_message(
        &self,
        session: &Session,
        to_user_id: UserId,
        content: String,
    ) -> Result<()> {
        let sender = session.require_registered()?;
        let state = self.state.lock();

        let msg = ServerMessage::PrivateMessage {
            from_user_id: sender.clone(),
            to_user_id: to_user_id.clone(),
            content,
        };

        match state.registry.lookup(&to_user_id) {
            Some(handle) if deliver(&to_user_id, handle, msg) => Ok(()),
            _ => Err(Error::user_offline(to_user_id)),
        }
    }
}

// ============================================================================
// MessageRouter - Introspection
// ============================================================================

impl MessageRouter {
    /// Snapshot of registered users.
    #[must_use]
    pub fn online_users(&self) -> Vec<UserId> {
        self.state.lock().registry.list_online()
    }

    /// Presence snapshot in wire form.
    #[must_use]
    pub fn presence_snapshot(&self) -> Vec<OnlineUser> {
        self.online_users().into_iter().map(OnlineUser::new).collect()
    }

    /// Returns `true` if `user_id` is registered.
    #[must_use]
    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.state.lock().registry.lookup(user_id).is_some()
    }

    /// Number of registered users.
    #[must_use]
    pub fn online_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    /// Members of `room_id`, sorted; empty if the room does not exist.
    #[must_use]
    pub fn members_of(&self, room_id: &RoomId) -> Vec<UserId> {
        let mut members: Vec<_> = self
            .state
            .lock()
            .rooms
            .members_of(room_id)
            .into_iter()
            .collect();
        members.sort();
        members
    }

    /// Rooms `user_id` belongs to, sorted.
    #[must_use]
    pub fn rooms_of(&self, user_id: &UserId) -> Vec<RoomId> {
        let mut rooms = self.state.lock().rooms.rooms_of(user_id);
        rooms.sort();
        rooms
    }

    /// Number of non-empty rooms.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.state.lock().rooms.room_count()
    }
}

// ============================================================================
// Delivery
// ============================================================================

/// Best-effort delivery to one peer. Unreachable peers are skipped.
///
/// Returns `true` if the frame was queued.
fn deliver(target: &UserId, handle: &PeerHandle, msg: ServerMessage) -> bool {
    if !handle.is_open() {
        trace!(user_id = %target, "Target not writable, skipped");
        return false;
    }

    match handle.send(msg) {
        Ok(()) => true,
        Err(e) => {
            warn!(user_id = %target, conn_id = %handle.id(), error = %e, "Delivery failed");
            false
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
