use ragchat_core::ConversationTurn;
use serde::{Deserialize, Serialize};

/// Ordered, append-only log of the turns of one conversation.
///
/// Turns are never edited or removed; the only way to obtain an empty
/// history is to start a new one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a turn at the end.
    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// All turns in chronological order.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Number of recorded turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turn has been recorded.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The full history in the form handed to a generator.
    pub fn as_prompt_context(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// The history as `Human: ...` / `Assistant: ...` lines.
    pub fn render_transcript(&self) -> String {
        render_transcript(&self.turns)
    }
}

/// Renders turns as a plain transcript, one line per turn.
pub fn render_transcript(turns: &[ConversationTurn]) -> String {
    let mut out = String::new();
    for turn in turns {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(turn.role.transcript_label());
        out.push_str(": ");
        out.push_str(&turn.text);
    }
    out
}
