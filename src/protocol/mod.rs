//! WebSocket protocol message types.
//!
//! This module is the decode/encode boundary between the transport and the
//! chat core. Inbound text is decoded into typed events here; outbound
//! frames are typed [`ServerMessage`]s that the transport serializes.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Endpoint |
//! |--------------|-----------|----------|
//! | [`ClientEvent`] | Client → Server | chat |
//! | [`UserRequest`] | Client → Server | user CRUD |
//! | [`ServerMessage`] | Server → Client | all |
//!
//! All frames are JSON objects with a `type` tag.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `inbound` | Chat events and the decode step |
//! | `outbound` | Server frames |
//! | `users` | CRUD requests and user records |

// ============================================================================
// Submodules
// ============================================================================

/// Chat events sent by clients.
pub mod inbound;

/// Frames sent by the server.
pub mod outbound;

/// User CRUD requests and records.
pub mod users;

// ============================================================================
// Re-exports
// ============================================================================

pub use inbound::ClientEvent;
pub use outbound::{OnlineUser, ServerMessage};
pub use users::{NewUser, UserPatch, UserRecord, UserRequest};
