use crate::generator::{GenerationRequest, RequestKind};
use crate::prompt;
use ragchat_core::ConversationTurn;
use ragchat_memory::SearchResult;

/// Decides which part of the conversation goes into each prompt.
///
/// The stored history is never modified; `max_turns` only limits how many of
/// the most recent turns are rendered, always starting at a user turn.
#[derive(Debug, Clone)]
pub struct ContextWindow {
    system_prompt: Option<String>,
    max_turns: Option<usize>,
}

impl ContextWindow {
    /// A window rendering at most `max_turns` recent turns, or all of them.
    pub fn new(max_turns: Option<usize>) -> Self {
        Self {
            system_prompt: None,
            max_turns,
        }
    }

    /// Sets the instruction attached to every request.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = Some(prompt.into());
    }

    /// The configured instruction.
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// The turns that fit the window, oldest first.
    pub fn select<'a>(&self, turns: &'a [ConversationTurn]) -> &'a [ConversationTurn] {
        let Some(max) = self.max_turns else {
            return turns;
        };
        if turns.len() <= max {
            return turns;
        }
        // Keep whole exchanges by starting on an even offset.
        let mut start = turns.len() - max;
        if start % 2 == 1 {
            start += 1;
        }
        &turns[start.min(turns.len())..]
    }

    /// Request that answers `question` from the retrieved `sources`.
    pub fn answer_request(
        &self,
        question: &str,
        sources: &[SearchResult],
        history: &[ConversationTurn],
    ) -> GenerationRequest {
        let context: Vec<String> = sources.iter().map(|s| s.chunk.text.clone()).collect();
        GenerationRequest {
            kind: RequestKind::Answer,
            system: self.system_prompt.clone(),
            history: self.select(history).to_vec(),
            question: question.to_string(),
            prompt: prompt::answer_prompt(&context, question),
            context,
        }
    }

    /// Request that rephrases `question` using the conversation so far.
    pub fn condense_request(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> GenerationRequest {
        let window = self.select(history);
        GenerationRequest {
            kind: RequestKind::Condense,
            system: None,
            history: Vec::new(),
            question: question.to_string(),
            context: Vec::new(),
            prompt: prompt::condense_prompt(window, question),
        }
    }

    /// Rough token estimation (4 chars ≈ 1 token).
    pub fn estimated_tokens(request: &GenerationRequest) -> usize {
        let sys_tokens = request.system.as_ref().map_or(0, |s| s.len() / 4);
        let history_tokens: usize = request.history.iter().map(|t| t.text.len() / 4).sum();
        sys_tokens + history_tokens + request.prompt.len() / 4
    }
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new(None)
    }
}
