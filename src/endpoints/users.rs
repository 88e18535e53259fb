//! `/ws`: CRUD over persisted user records.
//!
//! | Request | Reply |
//! |---------|-------|
//! | `create_user { name, email }` | `user_created { data }` |
//! | `get_users` | `users_list { data }` |
//! | `update_user { id, name?, email? }` | `user_updated { data }` |
//! | `delete_user { id }` | `user_deleted { id }` |
//! | anything else | `error { message: "Unknown type" }` |
//!
//! Failures are reported as `error` frames carrying the error text.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::protocol::{NewUser, ServerMessage, UserPatch, UserRecord, UserRequest};
use crate::transport::{Endpoint, PeerHandle};

// ============================================================================
// Constants
// ============================================================================

/// Reply text for a request type this endpoint does not serve.
const UNKNOWN_TYPE: &str = "Unknown type";

// ============================================================================
// UserStore
// ============================================================================

/// Storage port for user records.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Stores a new record and returns it with its assigned id.
    async fn create(&self, user: NewUser) -> Result<UserRecord>;

    /// Returns every record in insertion order.
    async fn list(&self) -> Result<Vec<UserRecord>>;

    /// Applies `patch` to record `id` and returns the result.
    ///
    /// # Errors
    ///
    /// [`Error::UserNotFound`] if no such record exists.
    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<UserRecord>;

    /// Removes record `id`.
    ///
    /// # Errors
    ///
    /// [`Error::UserNotFound`] if no such record exists.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

// ============================================================================
// InMemoryUserStore
// ============================================================================

/// Process-local [`UserStore`]. Ids are random v4 UUIDs.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    records: RwLock<Vec<UserRecord>>,
}

impl InMemoryUserStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<UserRecord> {
        let record = UserRecord {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
        };
        self.records.write().push(record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<UserRecord>> {
        Ok(self.records.read().clone())
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<UserRecord> {
        let mut records = self.records.write();
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| Error::user_not_found(id.to_string()))?;

        patch.apply(record);
        Ok(record.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|record| record.id != id);

        if records.len() == before {
            return Err(Error::user_not_found(id.to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// UsersEndpoint
// ============================================================================

/// Serves CRUD frames against a [`UserStore`].
#[derive(Debug)]
pub struct UsersEndpoint<S = InMemoryUserStore> {
    store: Arc<S>,
}

impl<S> Clone for UsersEndpoint<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: UserStore> UsersEndpoint<S> {
    /// Creates an endpoint over `store`.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The backing store.
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Decodes and executes one request, producing the reply frame.
    pub async fn handle(&self, text: &str) -> ServerMessage {
        match self.execute(text).await {
            Ok(reply) => reply,
            Err(Error::UnknownMessageType { .. }) => ServerMessage::error(UNKNOWN_TYPE),
            Err(e) => {
                debug!(error = %e, "User request failed");
                ServerMessage::from_error(&e)
            }
        }
    }

    async fn execute(&self, text: &str) -> Result<ServerMessage> {
        let reply = match UserRequest::decode(text)? {
            UserRequest::Create(user) => ServerMessage::UserCreated {
                data: self.store.create(user).await?,
            },
            UserRequest::List => ServerMessage::UsersList {
                data: self.store.list().await?,
            },
            UserRequest::Update { id, patch } => ServerMessage::UserUpdated {
                data: self.store.update(id, patch).await?,
            },
            UserRequest::Delete { id } => {
                self.store.delete(id).await?;
                ServerMessage::UserDeleted { id }
            }
        };
        Ok(reply)
    }
}

#[async_trait]
impl<S: UserStore> Endpoint for UsersEndpoint<S> {
    type Session = PeerHandle;

    async fn on_connect(&self, peer: PeerHandle) -> PeerHandle {
        debug!(conn_id = %peer.id(), "Users connection opened");
        peer
    }

    async fn on_message(&self, peer: &mut PeerHandle, text: &str) {
        let reply = self.handle(text).await;
        if let Err(e) = peer.send(reply) {
            debug!(conn_id = %peer.id(), error = %e, "Users reply dropped");
        }
    }

    async fn on_close(&self, peer: PeerHandle) {
        debug!(conn_id = %peer.id(), "Users connection closed");
    }
}

// ============================================================================
// Tests
// ============================================================================
