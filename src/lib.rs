//! Chat Relay - in-memory real-time chat over WebSocket.
//!
//! Clients connect, register a user id, join rooms and exchange group,
//! broadcast and private messages. All state lives in memory and is owned
//! by the server instance; nothing survives a restart.
//!
//! # Architecture
//!
//! - **Transport**: accepts sockets, routes each upgrade path to an endpoint,
//!   and runs one event loop per connection.
//! - **Chat core**: a connection registry (identity → send handle), a room
//!   index (room ↔ members) and a message router that applies each event.
//! - **Endpoints**: chat, presence snapshots, and user-record CRUD.
//!
//! Key design principles:
//!
//! - Rooms store user ids, never socket handles; delivery always goes
//!   through the registry
//! - Every inbound frame is decoded into a typed event before routing
//! - A connection close clears its identity and room memberships before the
//!   next event is handled
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chat_relay::{ChatServer, InMemoryUserStore, MessageRouter, Result, ServerConfig, endpoints};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ServerConfig::builder().port(3000).build()?;
//!     let dispatcher = endpoints::mount(
//!         &config,
//!         Arc::new(MessageRouter::new()),
//!         Arc::new(InMemoryUserStore::new()),
//!     );
//!
//!     let server = ChatServer::start(&config, dispatcher).await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`chat`] | Registry, room index, sessions, message router |
//! | [`config`] | Server configuration and builder |
//! | [`endpoints`] | Chat, presence and user-record endpoints |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire frames and decoding |
//! | [`transport`] | WebSocket server, dispatcher, connection loop |

// ============================================================================
// Modules
// ============================================================================

/// In-memory chat core.
///
/// - [`MessageRouter`] - applies client events and fans out messages
/// - [`ConnectionRegistry`] - who is online
/// - [`RoomIndex`] - who is in which room
pub mod chat;

/// Server configuration.
pub mod config;

/// Endpoints mounted on upgrade paths.
pub mod endpoints;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing user ids, room ids and connection ids.
pub mod identifiers;

/// WebSocket message types.
pub mod protocol;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Chat core
pub use chat::{ConnectionRegistry, MessageRouter, RoomIndex, Session, SessionState};

// Configuration
pub use config::{ServerConfig, ServerConfigBuilder};

// Endpoints
pub use endpoints::{ChatEndpoint, InMemoryUserStore, PresenceEndpoint, UserStore, UsersEndpoint};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ConnectionId, RoomId, UserId};

// Protocol types
pub use protocol::{ClientEvent, OnlineUser, ServerMessage};

// Transport
pub use transport::{ChatServer, Endpoint, PeerHandle, UpgradeDispatcher};
