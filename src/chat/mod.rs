//! In-memory chat core.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `registry` | Identity → live connection map |
//! | `rooms` | Room membership, forward and reverse |
//! | `session` | Per-connection lifecycle state |
//! | `router` | Event handling and fan-out |
//!
//! The core has no knowledge of sockets. It talks to connections only
//! through [`PeerHandle`](crate::transport::PeerHandle).

// ============================================================================
// Modules
// ============================================================================

pub mod registry;
pub mod rooms;
pub mod router;
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use registry::ConnectionRegistry;
pub use rooms::RoomIndex;
pub use router::MessageRouter;
pub use session::{Session, SessionState};
