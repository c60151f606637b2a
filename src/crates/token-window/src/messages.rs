//! Chat message types and transcript rendering
//!
//! A [`Message`] is one immutable entry of a conversation. The window never
//! edits messages; it only decides how many of the oldest ones to drop and
//! then either hands the survivors back as-is or flattens them into a
//! role-labelled transcript with [`get_buffer_string`].
//!
//! ```rust
//! use token_window::messages::{get_buffer_string, Message};
//!
//! let history = vec![Message::human("hi"), Message::ai("hello")];
//! assert_eq!(get_buffer_string(&history, "Human", "AI"), "Human: hi\nAI: hello");
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label used for system messages in transcripts
pub const SYSTEM_LABEL: &str = "System";

/// Role of the message sender in a conversation.
///
/// Serialized in lowercase: `"human"`, `"ai"`, `"system"`, and
/// `{"custom": "<label>"}` for application-specific roles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Input from the end user
    Human,

    /// Response generated by the model
    Ai,

    /// Instructions or context for the model
    System,

    /// Generic chat role carrying its own label
    Custom(String),
}

impl MessageRole {
    /// Transcript label for this role.
    ///
    /// Human and AI use the caller-supplied labels, system messages use
    /// [`SYSTEM_LABEL`] and custom roles use their own label.
    pub fn label<'a>(&'a self, human_label: &'a str, ai_label: &'a str) -> &'a str {
        match self {
            MessageRole::Human => human_label,
            MessageRole::Ai => ai_label,
            MessageRole::System => SYSTEM_LABEL,
            MessageRole::Custom(label) => label,
        }
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for this message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Role of the message sender
    pub role: MessageRole,

    /// Text content
    pub content: String,

    /// Optional participant name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// Create a new message with the given role and content
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            role,
            content: content.into(),
            name: None,
        }
    }

    /// Create a human message
    pub fn human(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Human, content)
    }

    /// Create an AI message
    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Ai, content)
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a message with an application-specific role
    pub fn custom(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(MessageRole::Custom(role.into()), content)
    }

    /// Set the message ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the participant name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Render messages as a `"<label>: <content>"` transcript.
///
/// Lines are joined with a single `\n` and there is no trailing newline. An
/// empty slice renders as the empty string.
pub fn get_buffer_string(messages: &[Message], human_label: &str, ai_label: &str) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.label(human_label, ai_label), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}
