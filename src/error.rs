//! Error types for the chat relay.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use chat_relay::{Result, ServerConfig};
//!
//! fn config() -> Result<ServerConfig> {
//!     ServerConfig::builder().port(0).build()
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants | Reported to client |
//! |----------|----------|--------------------|
//! | Configuration | [`Error::Config`] | no |
//! | Protocol | [`Error::InvalidJson`], [`Error::UnknownMessageType`], [`Error::MalformedPayload`] | `error` frame |
//! | Precondition | [`Error::NotRegistered`], [`Error::RoomNotFound`] | `error` frame |
//! | Delivery | [`Error::UserOffline`] | `system` notice (private only) |
//! | Transport | [`Error::Connection`], [`Error::ConnectionClosed`] | no, logged |
//! | Persistence | [`Error::UserNotFound`] | `error` frame |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] | no |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::{RoomId, UserId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Nothing here is fatal to the process: every variant is scoped to a
/// single event, a single connection, or server configuration.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when server configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Inbound frame is not a JSON object.
    #[error("Invalid JSON: {message}")]
    InvalidJson {
        /// Parser detail.
        message: String,
    },

    /// Inbound frame carries a `type` this endpoint does not handle.
    #[error("Unknown message type: {message_type}")]
    UnknownMessageType {
        /// The unrecognized type tag (empty when absent).
        message_type: String,
    },

    /// Inbound frame has a known `type` but missing or invalid fields.
    #[error("Invalid {message_type} payload: {message}")]
    MalformedPayload {
        /// The type tag of the frame.
        message_type: String,
        /// Description of what is wrong.
        message: String,
    },

    // ========================================================================
    // Precondition Errors
    // ========================================================================
    /// Room or chat action attempted before `register`.
    #[error("Connection is not registered")]
    NotRegistered,

    /// Group message addressed to a room that does not exist.
    #[error("Room not found: {room_id}")]
    RoomNotFound {
        /// The missing room.
        room_id: RoomId,
    },

    // ========================================================================
    // Delivery Errors
    // ========================================================================
    /// Target user is not registered or its connection is not writable.
    #[error("User offline: {user_id}")]
    UserOffline {
        /// The unreachable user.
        user_id: UserId,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Peer connection is closed; nothing more can be written to it.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Persistence Errors
    // ========================================================================
    /// User record not found in the store.
    #[error("User not found: {id}")]
    UserNotFound {
        /// The missing record id.
        id: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid JSON error.
    #[inline]
    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self::InvalidJson {
            message: message.into(),
        }
    }

    /// Creates an unknown message type error.
    #[inline]
    pub fn unknown_message_type(message_type: impl Into<String>) -> Self {
        Self::UnknownMessageType {
            message_type: message_type.into(),
        }
    }

    /// Creates a malformed payload error.
    #[inline]
    pub fn malformed_payload(message_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message_type: message_type.into(),
            message: message.into(),
        }
    }

    /// Creates a room not found error.
    #[inline]
    pub fn room_not_found(room_id: RoomId) -> Self {
        Self::RoomNotFound { room_id }
    }

    /// Creates a user offline error.
    #[inline]
    pub fn user_offline(user_id: UserId) -> Self {
        Self::UserOffline { user_id }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a user not found error.
    #[inline]
    pub fn user_not_found(id: impl Into<String>) -> Self {
        Self::UserNotFound { id: id.into() }
    }
}

// ============================================================================
// Client Text
// ============================================================================

impl Error {
    /// Text placed in the `message` field of a frame sent back to the client.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::InvalidJson { .. } => "Invalid JSON format".to_string(),
            Self::UnknownMessageType { .. } => "Unknown message type".to_string(),
            Self::NotRegistered => "Please register first".to_string(),
            Self::RoomNotFound { room_id } => format!("Room {room_id} does not exist"),
            Self::UserOffline { user_id } => format!("User {user_id} is offline"),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the inbound frame could not be understood.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidJson { .. } | Self::UnknownMessageType { .. } | Self::MalformedPayload { .. }
        )
    }

    /// Returns `true` if the action was refused because of connection or room state.
    #[inline]
    #[must_use]
    pub fn is_precondition_error(&self) -> bool {
        matches!(self, Self::NotRegistered | Self::RoomNotFound { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the error is reported back to the sending client.
    #[inline]
    #[must_use]
    pub fn is_client_facing(&self) -> bool {
        self.is_protocol_error()
            || self.is_precondition_error()
            || matches!(self, Self::UserOffline { .. } | Self::UserNotFound { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("reset by peer");
        assert_eq!(err.to_string(), "Connection failed: reset by peer");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("chat path must start with '/'");
        assert_eq!(
            err.to_string(),
            "Configuration error: chat path must start with '/'"
        );
    }

    #[test]
    fn test_client_messages() {
        assert_eq!(
            Error::invalid_json("EOF").client_message(),
            "Invalid JSON format"
        );
        assert_eq!(
            Error::unknown_message_type("dance").client_message(),
            "Unknown message type"
        );
        assert_eq!(Error::NotRegistered.client_message(), "Please register first");
        assert_eq!(
            Error::room_not_found(RoomId::from("r1")).client_message(),
            "Room r1 does not exist"
        );
        assert_eq!(
            Error::user_offline(UserId::from("ghost")).client_message(),
            "User ghost is offline"
        );
        assert_eq!(
            Error::malformed_payload("join_room", "missing field `roomId`").client_message(),
            "Invalid join_room payload: missing field `roomId`"
        );
    }

    #[test]
    fn test_is_protocol_error() {
        assert!(Error::invalid_json("x").is_protocol_error());
        assert!(Error::unknown_message_type("x").is_protocol_error());
        assert!(Error::malformed_payload("register", "x").is_protocol_error());
        assert!(!Error::NotRegistered.is_protocol_error());
    }

    #[test]
    fn test_is_precondition_error() {
        assert!(Error::NotRegistered.is_precondition_error());
        assert!(Error::room_not_found(RoomId::from("r")).is_precondition_error());
        assert!(!Error::ConnectionClosed.is_precondition_error());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_is_client_facing() {
        assert!(Error::NotRegistered.is_client_facing());
        assert!(Error::user_not_found("42").is_client_facing());
        assert!(!Error::ConnectionClosed.is_client_facing());
        assert!(!Error::config("x").is_client_facing());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::AddrInUse, "address in use");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
