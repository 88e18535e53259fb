//! Inbound chat frames.
//!
//! Decoding is an explicit step that yields either a typed
//! [`ClientEvent`] or a protocol error; the router never sees raw text.
//!
//! # Format
//!
//! ```json
//! { "type": "group_message", "roomId": "r1", "content": "hi" }
//! ```
//!
//! | `type` | Required fields |
//! |--------|-----------------|
//! | `register` | `userId` |
//! | `join_room` / `leave_room` | `roomId` |
//! | `group_message` | `roomId`, `content` |
//! | `broadcast_message` | `content` |
//! | `private_message` | `toUserId`, `content` |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, from_str, from_value};

use crate::error::{Error, Result};
use crate::identifiers::{RoomId, UserId};

// ============================================================================
// Frame Splitting
// ============================================================================

/// Parses a text frame into its `type` tag and the full JSON object.
///
/// Unparseable text and a bare `null` are [`Error::InvalidJson`]. Any other
/// JSON value without a string `type` (numbers, arrays, strings included)
/// is [`Error::UnknownMessageType`].
pub(crate) fn split_frame(text: &str) -> Result<(String, Value)> {
    let value: Value = from_str(text).map_err(|e| Error::invalid_json(e.to_string()))?;

    let map = match &value {
        Value::Object(map) => map,
        Value::Null => return Err(Error::invalid_json("frame is null")),
        _ => return Err(Error::unknown_message_type("")),
    };

    match map.get("type") {
        Some(Value::String(tag)) => Ok((tag.clone(), value)),
        _ => Err(Error::unknown_message_type("")),
    }
}

/// Deserializes the fields of a frame whose tag is already known.
pub(crate) fn payload<T: DeserializeOwned>(tag: &str, value: Value) -> Result<T> {
    from_value(value).map_err(|e| Error::malformed_payload(tag, e.to_string()))
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterPayload {
    user_id: UserId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomPayload {
    room_id: RoomId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupPayload {
    room_id: RoomId,
    content: String,
}

#[derive(Deserialize)]
struct BroadcastPayload {
    content: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrivatePayload {
    to_user_id: UserId,
    content: String,
}

// ============================================================================
// ClientEvent
// ============================================================================

/// A decoded chat event from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Bind this connection to a chat identity.
    Register {
        /// Identity to bind.
        user_id: UserId,
    },

    /// Join a room, creating it if needed.
    JoinRoom {
        /// Room to join.
        room_id: RoomId,
    },

    /// Leave a room.
    LeaveRoom {
        /// Room to leave.
        room_id: RoomId,
    },

    /// Fan out to every other member of a room.
    GroupMessage {
        /// Target room.
        room_id: RoomId,
        /// Message body.
        content: String,
    },

    /// Fan out to every other registered user.
    BroadcastMessage {
        /// Message body.
        content: String,
    },

    /// Deliver to a single user.
    PrivateMessage {
        /// Recipient.
        to_user_id: UserId,
        /// Message body.
        content: String,
    },
}

impl ClientEvent {
    /// Decodes a text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidJson`] if the frame is not JSON or is `null`
    /// - [`Error::UnknownMessageType`] if `type` is absent or not a chat event,
    ///   including frames that are JSON but not an object
    /// - [`Error::MalformedPayload`] if required fields are missing or empty
    pub fn decode(text: &str) -> Result<Self> {
        let (tag, value) = split_frame(text)?;

        let event = match tag.as_str() {
            "register" => {
                let p: RegisterPayload = payload(&tag, value)?;
                if p.user_id.is_empty() {
                    return Err(Error::malformed_payload(&tag, "userId must not be empty"));
                }
                Self::Register { user_id: p.user_id }
            }
            "join_room" => {
                let p: RoomPayload = payload(&tag, value)?;
                Self::JoinRoom { room_id: p.room_id }
            }
            "leave_room" => {
                let p: RoomPayload = payload(&tag, value)?;
                Self::LeaveRoom { room_id: p.room_id }
            }
            "group_message" => {
                let p: GroupPayload = payload(&tag, value)?;
                Self::GroupMessage {
                    room_id: p.room_id,
                    content: p.content,
                }
            }
            "broadcast_message" => {
                let p: BroadcastPayload = payload(&tag, value)?;
                Self::BroadcastMessage { content: p.content }
            }
            "private_message" => {
                let p: PrivatePayload = payload(&tag, value)?;
                Self::PrivateMessage {
                    to_user_id: p.to_user_id,
                    content: p.content,
                }
            }
            _ => return Err(Error::unknown_message_type(tag)),
        };

        Ok(event)
    }

    /// Returns the wire `type` tag of this event.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::JoinRoom { .. } => "join_room",
            Self::LeaveRoom { .. } => "leave_room",
            Self::GroupMessage { .. } => "group_message",
            Self::BroadcastMessage { .. } => "broadcast_message",
            Self::PrivateMessage { .. } => "private_message",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_register() {
        let event = ClientEvent::decode(r#"{"type":"register","userId":"a"}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::Register {
                user_id: UserId::from("a")
            }
        );
        assert_eq!(event.kind(), "register");
    }

    #[test]
    fn test_decode_group_message() {
        let event =
            ClientEvent::decode(r#"{"type":"group_message","roomId":"r1","content":"hi"}"#)
                .unwrap();
        assert_eq!(
            event,
            ClientEvent::GroupMessage {
                room_id: RoomId::from("r1"),
                content: "hi".into(),
            }
        );
    }

    #[test]
    fn test_decode_private_message() {
        let event =
            ClientEvent::decode(r#"{"type":"private_message","toUserId":"b","content":"yo"}"#)
                .unwrap();
        assert!(matches!(
            event,
            ClientEvent::PrivateMessage { ref to_user_id, .. } if to_user_id.as_str() == "b"
        ));
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let event =
            ClientEvent::decode(r#"{"type":"broadcast_message","content":"x","extra":1}"#)
                .unwrap();
        assert_eq!(event.kind(), "broadcast_message");
    }

    #[test]
    fn test_not_json_is_invalid_json() {
        let err = ClientEvent::decode("not json").unwrap_err();
        assert!(matches!(err, Error::InvalidJson { .. }));
        assert_eq!(err.client_message(), "Invalid JSON format");
    }

    #[test]
    fn test_non_object_json_is_unknown_type() {
        for text in ["5", "[1,2]", r#""x""#, "true"] {
            let err = ClientEvent::decode(text).unwrap_err();
            assert!(
                matches!(err, Error::UnknownMessageType { .. }),
                "{text}: {err:?}"
            );
            assert_eq!(err.client_message(), "Unknown message type");
        }
    }

    #[test]
    fn test_null_is_invalid_json() {
        let err = ClientEvent::decode("null").unwrap_err();
        assert!(matches!(err, Error::InvalidJson { .. }));
        assert_eq!(err.client_message(), "Invalid JSON format");
    }

    #[test]
    fn test_unknown_type() {
        let err = ClientEvent::decode(r#"{"type":"dance"}"#).unwrap_err();
        assert!(matches!(err, Error::UnknownMessageType { ref message_type } if message_type == "dance"));
    }

    #[test]
    fn test_missing_type_is_unknown() {
        let err = ClientEvent::decode(r#"{"userId":"a"}"#).unwrap_err();
        assert!(matches!(err, Error::UnknownMessageType { .. }));
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let err = ClientEvent::decode(r#"{"type":"join_room"}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload { ref message_type, .. } if message_type == "join_room"));
        assert!(err.client_message().contains("roomId"));
    }

    #[test]
    fn test_wrong_field_type_is_malformed() {
        let err = ClientEvent::decode(r#"{"type":"broadcast_message","content":5}"#).unwrap_err();
        assert!(err.is_protocol_error());
        assert!(matches!(err, Error::MalformedPayload { .. }));
    }

    #[test]
    fn test_empty_user_id_is_malformed() {
        let err = ClientEvent::decode(r#"{"type":"register","userId":""}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload { .. }));
    }
}
