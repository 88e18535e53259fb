//! WebSocket transport layer.
//!
//! Everything that touches sockets lives here. The chat core only ever sees
//! a [`PeerHandle`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   TCP    ┌────────────┐  path   ┌───────────────────┐
//! │  Client  │─────────►│ ChatServer │────────►│ UpgradeDispatcher │
//! └──────────┘          └────────────┘         └─────────┬─────────┘
//!      ▲                                                 │ Endpoint
//!      │             ┌──────────────────────┐            ▼
//!      └─────────────│ connection::drive    │◄──── on_connect / on_message
//!        JSON frames │ (one task per socket)│      / on_close
//!                    └──────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `peer` | Fire-and-forget send handle |
//! | `connection` | Per-socket event loop and the `Endpoint` trait |
//! | `dispatcher` | Upgrade path → endpoint |
//! | `server` | Bind, accept loop, shutdown |

// ============================================================================
// Submodules
// ============================================================================

/// Per-socket event loop.
pub mod connection;

/// Upgrade path routing.
pub mod dispatcher;

/// Send handle for one connection.
pub mod peer;

/// WebSocket server.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Endpoint, EndpointHandler, drive};
pub use dispatcher::UpgradeDispatcher;
pub use peer::PeerHandle;
pub use server::ChatServer;
