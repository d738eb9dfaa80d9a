//! Message types for model communication.

use serde::{Deserialize, Serialize};

/// A message in a conversation.
///
/// Serializes as `{"role": "...", "content": "..."}`, which is both the
/// on-disk history format and the chat-completions wire shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
        }
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }

    /// Build the per-cycle user turn from the turtle state and operator input.
    pub fn turtle_turn(state: &str, operator_input: &str) -> Self {
        Self::user(format!(
            "Turtle State: {state}\nUser Command: {operator_input}"
        ))
    }
}

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Ordered message log; insertion order is temporal order.
pub type Conversation = Vec<Message>;
