//! Chat message rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{CorrelationId, MessageId, SessionId};

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The anonymous storefront visitor.
    Visitor,
    /// A support operator replying from the admin panel.
    Admin,
    /// The automated welcome message that opens every transcript.
    Greeter,
}

/// A chat message row.
///
/// Messages are never edited or deleted; the only mutations are flips of the
/// `delivered` and `read` flags (read receipts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub session_id: SessionId,
    pub sender: Sender,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub delivered: bool,
    #[serde(default, rename = "is_read")]
    pub read: bool,
    /// Echo of the client-generated correlation id, when the message was
    /// inserted by a client that set one. Used to reconcile optimistic
    /// entries without sender/text/time guessing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ref: Option<CorrelationId>,
}

impl ChatMessage {
    /// True for visitor messages an operator has not yet read.
    #[must_use]
    pub const fn unread_from_visitor(&self) -> bool {
        matches!(self.sender, Sender::Visitor) && !self.read
    }
}

/// Insert payload for a new message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub session_id: SessionId,
    pub sender: Sender,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ref: Option<CorrelationId>,
}

impl NewMessage {
    /// A visitor message tagged with a fresh correlation id.
    #[must_use]
    pub fn from_visitor(session_id: SessionId, text: impl Into<String>) -> Self {
        Self {
            session_id,
            sender: Sender::Visitor,
            text: text.into(),
            client_ref: Some(CorrelationId::generate()),
        }
    }

    /// An operator reply (no optimistic tracking needed).
    #[must_use]
    pub fn from_admin(session_id: SessionId, text: impl Into<String>) -> Self {
        Self {
            session_id,
            sender: Sender::Admin,
            text: text.into(),
            client_ref: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_wire_format() {
        assert_eq!(
            serde_json::to_string(&Sender::Visitor).expect("serialize"),
            "\"visitor\""
        );
        let sender: Sender = serde_json::from_str("\"admin\"").expect("deserialize");
        assert_eq!(sender, Sender::Admin);
    }

    #[test]
    fn test_unread_from_visitor() {
        let msg = ChatMessage {
            id: MessageId::new(1),
            session_id: SessionId::from("s"),
            sender: Sender::Visitor,
            text: "hello".to_string(),
            created_at: Utc::now(),
            delivered: false,
            read: false,
            client_ref: None,
        };
        assert!(msg.unread_from_visitor());

        let read = ChatMessage { read: true, ..msg.clone() };
        assert!(!read.unread_from_visitor());

        let admin = ChatMessage {
            sender: Sender::Admin,
            ..msg
        };
        assert!(!admin.unread_from_visitor());
    }

    #[test]
    fn test_read_flag_wire_name() {
        let json = r#"{
            "id": 9,
            "session_id": "abc",
            "sender": "visitor",
            "text": "hi",
            "created_at": "2026-08-01T12:00:00Z",
            "delivered": true,
            "is_read": true
        }"#;
        let msg: ChatMessage = serde_json::from_str(json).expect("deserialize");
        assert!(msg.read);
        assert!(msg.client_ref.is_none());
    }
}
