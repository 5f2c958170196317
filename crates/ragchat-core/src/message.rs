use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The author of a [`ConversationTurn`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human asking questions.
    User,
    /// The answering assistant.
    Assistant,
}

impl Role {
    /// Label used when a history is rendered as a plain transcript.
    pub fn transcript_label(self) -> &'static str {
        match self {
            Role::User => "Human",
            Role::Assistant => "Assistant",
        }
    }
}

/// One entry of a session's conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    /// Who produced the text.
    pub role: Role,
    /// The question or answer text.
    pub text: String,
    /// UTC timestamp of when the turn was recorded.
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Creates a turn with the given role and text.
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a [`Role::User`] turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Creates a [`Role::Assistant`] turn.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}
