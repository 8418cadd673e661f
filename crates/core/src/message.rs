//! Conversation message types.
//!
//! These mirror the wire shape the chat client sends: a message has a role
//! and an ordered list of text parts. The whole history travels with every
//! request; nothing is persisted server-side.

use serde::{Deserialize, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The answer generator
    Model,
}

/// A single text fragment of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

impl Part {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// Ordered text parts
    pub parts: Vec<Part>,

    /// Client-side image preview URL. Never read by the matcher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

impl Message {
    /// Create a single-part user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::new(text)],
            file_url: None,
        }
    }

    /// Create a single-part model message.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::new(text)],
            file_url: None,
        }
    }

    /// Create a message from several parts.
    pub fn with_parts(role: Role, parts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            role,
            parts: parts.into_iter().map(Part::new).collect(),
            file_url: None,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// All part texts joined with a single space, in part order.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Text of the first part, if any. This is what gets sent as the query.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.first().map(|p| p.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Berapa tarif PPN?");
        assert_eq!(msg.role, Role::User);
        assert!(msg.is_user());
        assert_eq!(msg.text(), "Berapa tarif PPN?");
    }

    #[test]
    fn parts_are_space_joined_in_order() {
        let msg = Message::with_parts(Role::User, ["pajak", "kendaraan", "bermotor"]);
        assert_eq!(msg.text(), "pajak kendaraan bermotor");
        assert_eq!(msg.first_text(), Some("pajak"));
    }

    #[test]
    fn empty_parts_give_empty_text() {
        let msg = Message::with_parts(Role::Model, Vec::<String>::new());
        assert_eq!(msg.text(), "");
        assert_eq!(msg.first_text(), None);
    }

    #[test]
    fn deserializes_client_payload() {
        let json = r#"{"role":"model","parts":[{"text":"Halo"}],"fileUrl":"blob:abc"}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.role, Role::Model);
        assert_eq!(msg.file_url.as_deref(), Some("blob:abc"));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let json = r#"{"role":"system","parts":[{"text":"x"}]}"#;
        assert!(serde_json::from_str::<Message>(json).is_err());
    }

    #[test]
    fn extra_client_fields_are_ignored() {
        let json = r#"{"role":"model","parts":[{"text":"x"}],"answer":"x","examples":[]}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.text(), "x");
    }
}
