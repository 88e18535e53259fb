//! Application endpoints mounted on upgrade paths.
//!
//! | Module | Default path | Description |
//! |--------|--------------|-------------|
//! | `chat` | `/chat` | Registration, rooms, group/broadcast/private messaging |
//! | `presence` | `/users` | Snapshot of registered chat users |
//! | `users` | `/ws` | CRUD over persisted user records |
//!
//! `chat` and `presence` share one [`MessageRouter`](crate::chat::MessageRouter);
//! `users` is independent of chat identities.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use crate::chat::MessageRouter;
use crate::config::ServerConfig;
use crate::transport::UpgradeDispatcher;

// ============================================================================
// Modules
// ============================================================================

pub mod chat;
pub mod presence;
pub mod users;

// ============================================================================
// Re-exports
// ============================================================================

pub use chat::ChatEndpoint;
pub use presence::PresenceEndpoint;
pub use users::{InMemoryUserStore, UserStore, UsersEndpoint};

// ============================================================================
// Mounting
// ============================================================================

/// Builds the routing table for all three endpoints at the paths in `config`.
#[must_use]
pub fn mount<S: UserStore>(
    config: &ServerConfig,
    router: Arc<MessageRouter>,
    store: Arc<S>,
) -> UpgradeDispatcher {
    UpgradeDispatcher::new()
        .route(config.chat_path(), ChatEndpoint::new(Arc::clone(&router)))
        .route(config.presence_path(), PresenceEndpoint::new(router))
        .route(config.users_path(), UsersEndpoint::new(store))
}

// ============================================================================
// Tests
// ============================================================================
