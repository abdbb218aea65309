//! Chat log entries.

use serde::{Deserialize, Serialize};

/// Text shown by the transient placeholder while a reply is pending.
pub const TYPING_TEXT: &str = "Typing...";

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person using the widget.
    User,
    /// The assistant service.
    Bot,
}

impl Sender {
    /// Wire/CSS name of the sender.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry in the visible conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub content: String,
    /// Marks the "typing" placeholder. At most one may be visible at a time.
    #[serde(default)]
    pub is_transient: bool,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            content: content.into(),
            is_transient: false,
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            content: content.into(),
            is_transient: false,
        }
    }

    /// The bot's "typing" placeholder.
    pub fn typing() -> Self {
        Self {
            sender: Sender::Bot,
            content: TYPING_TEXT.to_string(),
            is_transient: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(Message::user("hi").sender, Sender::User);
        assert!(!Message::bot("hello").is_transient);

        let typing = Message::typing();
        assert!(typing.is_transient);
        assert_eq!(typing.sender, Sender::Bot);
    }

    #[test]
    fn test_sender_wire_name() {
        let json = serde_json::to_string(&Sender::Bot).unwrap();
        assert_eq!(json, "\"bot\"");
        assert_eq!(Sender::User.to_string(), "user");
    }
}
