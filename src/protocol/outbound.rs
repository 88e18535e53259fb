//! Outbound frames.
//!
//! Every frame the server writes is a [`ServerMessage`], encoded as a JSON
//! object whose `type` field selects the variant.
//!
//! # Format
//!
//! ```json
//! { "type": "group_message", "roomId": "r1", "fromUserId": "a", "content": "hi" }
//! { "type": "system", "message": "User ghost is offline" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::identifiers::{RoomId, UserId};

use super::users::UserRecord;

// ============================================================================
// OnlineUser
// ============================================================================

/// One entry of a presence snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUser {
    /// Registered chat identity.
    pub id: UserId,
    /// Always `"online"`.
    pub status: String,
}

impl OnlineUser {
    /// Creates an online entry.
    #[inline]
    #[must_use]
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            status: "online".to_string(),
        }
    }
}

// ============================================================================
// ServerMessage
// ============================================================================

/// All frames sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Acknowledgement or notice.
    System {
        /// Human-readable text.
        message: String,
    },

    /// Request was refused.
    Error {
        /// Human-readable text.
        message: String,
    },

    /// Room fan-out.
    GroupMessage {
        /// Room the message was sent to.
        room_id: RoomId,
        /// Sender.
        from_user_id: UserId,
        /// Message body.
        content: String,
    },

    /// Global fan-out.
    BroadcastMessage {
        /// Sender.
        from_user_id: UserId,
        /// Message body.
        content: String,
    },

    /// Direct message.
    PrivateMessage {
        /// Sender.
        from_user_id: UserId,
        /// Recipient.
        to_user_id: UserId,
        /// Message body.
        content: String,
    },

    /// Presence snapshot.
    OnlineUsers {
        /// Registered users at snapshot time.
        data: Vec<OnlineUser>,
    },

    /// CRUD: record created.
    UserCreated {
        /// The new record.
        data: UserRecord,
    },

    /// CRUD: all records.
    UsersList {
        /// Every stored record.
        data: Vec<UserRecord>,
    },

    /// CRUD: record updated.
    UserUpdated {
        /// The record after the update.
        data: UserRecord,
    },

    /// CRUD: record deleted.
    UserDeleted {
        /// Id of the removed record.
        id: Uuid,
    },
}

impl ServerMessage {
    /// Creates a `system` frame.
    #[inline]
    #[must_use]
    pub fn system(message: impl Into<String>) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    /// Creates an `error` frame.
    #[inline]
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Creates the `error` frame reported for `err`.
    #[inline]
    #[must_use]
    pub fn from_error(err: &Error) -> Self {
        Self::error(err.client_message())
    }

    /// Returns the wire `type` tag of this frame.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::Error { .. } => "error",
            Self::GroupMessage { .. } => "group_message",
            Self::BroadcastMessage { .. } => "broadcast_message",
            Self::PrivateMessage { .. } => "private_message",
            Self::OnlineUsers { .. } => "online_users",
            Self::UserCreated { .. } => "user_created",
            Self::UsersList { .. } => "users_list",
            Self::UserUpdated { .. } => "user_updated",
            Self::UserDeleted { .. } => "user_deleted",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{Value, json};

    fn encode(msg: &ServerMessage) -> Value {
        serde_json::to_value(msg).unwrap()
    }

    #[test]
    fn test_group_message_shape() {
        let msg = ServerMessage::GroupMessage {
            room_id: RoomId::from("r1"),
            from_user_id: UserId::from("a"),
            content: "hi".into(),
        };
        assert_eq!(
            encode(&msg),
            json!({"type": "group_message", "roomId": "r1", "fromUserId": "a", "content": "hi"})
        );
        assert_eq!(msg.kind(), "group_message");
    }

    #[test]
    fn test_system_shape() {
        assert_eq!(
            encode(&ServerMessage::system("User ghost is offline")),
            json!({"type": "system", "message": "User ghost is offline"})
        );
    }

    #[test]
    fn test_error_from_error() {
        let msg = ServerMessage::from_error(&Error::NotRegistered);
        assert_eq!(
            encode(&msg),
            json!({"type": "error", "message": "Please register first"})
        );
    }

    #[test]
    fn test_online_users_shape() {
        let msg = ServerMessage::OnlineUsers {
            data: vec![OnlineUser::new(UserId::from("a"))],
        };
        assert_eq!(
            encode(&msg),
            json!({"type": "online_users", "data": [{"id": "a", "status": "online"}]})
        );
    }

    #[test]
    fn test_private_message_carries_both_ends() {
        let value = encode(&ServerMessage::PrivateMessage {
            from_user_id: UserId::from("a"),
            to_user_id: UserId::from("b"),
            content: "psst".into(),
        });
        assert_eq!(value["fromUserId"], "a");
        assert_eq!(value["toUserId"], "b");
    }

    #[test]
    fn test_decodes_back_on_client_side() {
        let text = r#"{"type":"broadcast_message","fromUserId":"a","content":"yo"}"#;
        let msg: ServerMessage = serde_json::from_str(text).unwrap();
        assert_eq!(
            msg,
            ServerMessage::BroadcastMessage {
                from_user_id: UserId::from("a"),
                content: "yo".into()
            }
        );
    }
}
