//! User CRUD frames for the persistence endpoint.
//!
//! These records are keyed by a server-generated id and have nothing to do
//! with chat identities.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

use super::inbound::{payload, split_frame};

// ============================================================================
// Records
// ============================================================================

/// A persisted user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Store-assigned id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
}

/// Fields for a new user record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UserPatch {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New contact email.
    #[serde(default)]
    pub email: Option<String>,
}

impl UserPatch {
    /// Applies the patch to a record in place.
    pub fn apply(self, record: &mut UserRecord) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(email) = self.email {
            record.email = email;
        }
    }
}

// ============================================================================
// UserRequest
// ============================================================================

#[derive(Deserialize)]
struct UpdatePayload {
    id: Uuid,
    #[serde(flatten)]
    patch: UserPatch,
}

#[derive(Deserialize)]
struct DeletePayload {
    id: Uuid,
}

/// A decoded CRUD request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRequest {
    /// `create_user { name, email }`
    Create(NewUser),
    /// `get_users`
    List,
    /// `update_user { id, name?, email? }`
    Update {
        /// Record to update.
        id: Uuid,
        /// Fields to change.
        patch: UserPatch,
    },
    /// `delete_user { id }`
    Delete {
        /// Record to delete.
        id: Uuid,
    },
}

impl UserRequest {
    /// Decodes a text frame.
    ///
    /// # Errors
    ///
    /// Same protocol errors as chat decoding.
    pub fn decode(text: &str) -> Result<Self> {
        let (tag, value) = split_frame(text)?;

        match tag.as_str() {
            "create_user" => Ok(Self::Create(payload(&tag, value)?)),
            "get_users" => Ok(Self::List),
            "update_user" => {
                let p: UpdatePayload = payload(&tag, value)?;
                Ok(Self::Update {
                    id: p.id,
                    patch: p.patch,
                })
            }
            "delete_user" => {
                let p: DeletePayload = payload(&tag, value)?;
                Ok(Self::Delete { id: p.id })
            }
            _ => Err(Error::unknown_message_type(tag)),
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
    fn test_decode_create() {
        let req = UserRequest::decode(r#"{"type":"create_user","name":"Ann","email":"a@x.io"}"#)
            .unwrap();
        assert_eq!(
            req,
            UserRequest::Create(NewUser {
                name: "Ann".into(),
                email: "a@x.io".into()
            })
        );
    }

    #[test]
    fn test_decode_list() {
        assert_eq!(
            UserRequest::decode(r#"{"type":"get_users"}"#).unwrap(),
            UserRequest::List
        );
    }

    #[test]
    fn test_decode_partial_update() {
        let id = Uuid::new_v4();
        let text = format!(r#"{{"type":"update_user","id":"{id}","name":"Bo"}}"#);
        let req = UserRequest::decode(&text).unwrap();
        assert_eq!(
            req,
            UserRequest::Update {
                id,
                patch: UserPatch {
                    name: Some("Bo".into()),
                    email: None
                }
            }
        );
    }

    #[test]
    fn test_decode_delete_bad_id() {
        let err = UserRequest::decode(r#"{"type":"delete_user","id":"nope"}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload { .. }));
    }

    #[test]
    fn test_chat_type_is_unknown_here() {
        let err = UserRequest::decode(r#"{"type":"register","userId":"a"}"#).unwrap_err();
        assert!(matches!(err, Error::UnknownMessageType { .. }));
    }

    #[test]
    fn test_patch_apply() {
        let mut record = UserRecord {
            id: Uuid::new_v4(),
            name: "Ann".into(),
            email: "a@x.io".into(),
        };
        UserPatch {
            name: None,
            email: Some("ann@x.io".into()),
        }
        .apply(&mut record);
        assert_eq!(record.name, "Ann");
        assert_eq!(record.email, "ann@x.io");
    }
}
