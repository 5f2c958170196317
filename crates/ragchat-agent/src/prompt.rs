//! Prompt templates for answering and question condensing.

use ragchat_core::ConversationTurn;
use ragchat_session::render_transcript;

/// System instruction used when none is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You answer questions about the documents the user \
uploaded. Ground every answer in the provided context and keep it concise.";

/// Renders the answer prompt: retrieved context followed by the question.
pub fn answer_prompt(context: &[String], question: &str) -> String {
    format!(
        "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
{}\n\nQuestion: {question}\nHelpful Answer:",
        context.join("\n\n")
    )
}

/// Renders the prompt asking for a standalone version of a follow-up.
pub fn condense_prompt(history: &[ConversationTurn], question: &str) -> String {
    format!(
        "Given the following conversation and a follow up question, rephrase the follow up \
question to be a standalone question, in its original language.\n\n\
Chat History:\n{}\nFollow Up Input: {question}\nStandalone question:",
        render_transcript(history)
    )
}
