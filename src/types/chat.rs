//! Chat message shape consumed by instance derivation and the
//! auto-outfit prompt.

use serde::{Deserialize, Serialize};

/// A single message of a conversation, as handed over by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Display name of the speaker.
    #[serde(default)]
    pub name: String,
    /// Whether the user wrote this message.
    #[serde(default)]
    pub is_user: bool,
    /// Whether this is a system/narrator message rather than dialogue.
    #[serde(default)]
    pub is_system: bool,
    /// Raw message text (may contain markup and macros).
    #[serde(default)]
    pub text: String,
}

impl ChatMessage {
    /// A message written by a character.
    pub fn character(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_user: false,
            is_system: false,
            text: text.into(),
        }
    }

    /// A message written by the user.
    pub fn user(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_user: true,
            is_system: false,
            text: text.into(),
        }
    }

    /// A system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            is_user: false,
            is_system: true,
            text: text.into(),
        }
    }

    /// Whether this message can anchor an instance: not a system message
    /// and not blank.
    pub fn is_substantive(&self) -> bool {
        !self.is_system && !self.text.trim().is_empty()
    }
}

/// The first substantive message of a conversation, if any.
pub fn first_substantive_message(messages: &[ChatMessage]) -> Option<&ChatMessage> {
    messages.iter().find(|m| m.is_substantive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_substantive_skips_system_and_blank() {
        let messages = vec![
            ChatMessage::system("Scenario begins."),
            ChatMessage::character("Mira", "   "),
            ChatMessage::character("Mira", "Welcome, traveler."),
            ChatMessage::user("You", "Hello!"),
        ];
        let first = first_substantive_message(&messages).unwrap();
        assert_eq!(first.text, "Welcome, traveler.");
    }

    #[test]
    fn test_no_substantive_message() {
        let messages = vec![ChatMessage::system("x"), ChatMessage::user("You", "")];
        assert!(first_substantive_message(&messages).is_none());
        assert!(first_substantive_message(&[]).is_none());
    }

    #[test]
    fn test_deserialize_with_missing_fields() {
        let msg: ChatMessage = serde_json::from_value(serde_json::json!({
            "text": "hi"
        }))
        .unwrap();
        assert!(!msg.is_user);
        assert_eq!(msg.text, "hi");
    }
}
