use async_trait::async_trait;
use ragchat_core::{ConversationTurn, RagResult};

/// What a [`GenerationRequest`] asks the generator to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Answer the question from the supplied context.
    Answer,
    /// Rephrase a follow-up into a standalone question.
    Condense,
}

/// Everything a generator needs for one call.
///
/// `prompt` is the fully rendered user message. `question` and `context`
/// carry the same information unrendered for generators that work on the
/// parts directly.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// What the completion is for.
    pub kind: RequestKind,
    /// System instruction, if any.
    pub system: Option<String>,
    /// Prior turns, oldest first.
    pub history: Vec<ConversationTurn>,
    /// The user's question as asked.
    pub question: String,
    /// Retrieved chunk texts, best match first.
    pub context: Vec<String>,
    /// Rendered user message.
    pub prompt: String,
}

/// Capability that turns a prompt plus context into text.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce a completion for `request`.
    async fn generate(&self, request: &GenerationRequest) -> RagResult<String>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}
