use crate::history::ConversationHistory;
use chrono::{DateTime, Utc};
use ragchat_core::ConversationTurn;
use ragchat_memory::VectorIndex;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Per-session retrieval state: the active index and the conversation.
///
/// A session is *ready* once an index is installed. Installing a new index
/// always starts a fresh conversation.
pub struct SessionState {
    /// Session identifier.
    pub id: Uuid,
    index: Option<Arc<dyn VectorIndex>>,
    history: ConversationHistory,
    documents: Vec<String>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last mutated.
    pub updated_at: DateTime<Utc>,
}

/// Read-only summary of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// Session identifier.
    pub id: Uuid,
    /// Whether questions can be asked.
    pub ready: bool,
    /// Chunks in the active index.
    pub chunks: usize,
    /// Names of the documents behind the active index.
    pub documents: Vec<String>,
    /// Turns recorded since the index was installed.
    pub history_len: usize,
    /// When the session was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    /// Creates an empty, not-ready session.
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            index: None,
            history: ConversationHistory::new(),
            documents: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether an index is installed.
    pub fn is_ready(&self) -> bool {
        self.index.is_some()
    }

    /// The active index, if any.
    pub fn index(&self) -> Option<&dyn VectorIndex> {
        self.index.as_deref()
    }

    /// The conversation so far.
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Names of the documents behind the active index.
    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    /// Replaces the index wholesale and clears the history.
    pub fn install_index(&mut self, index: Arc<dyn VectorIndex>, documents: Vec<String>) {
        self.index = Some(index);
        self.documents = documents;
        self.history = ConversationHistory::new();
        self.updated_at = Utc::now();
    }

    /// Records a completed question/answer exchange, user turn first.
    pub fn record_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.history.append(ConversationTurn::user(question));
        self.history.append(ConversationTurn::assistant(answer));
        self.updated_at = Utc::now();
    }

    /// Summary of the session.
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            id: self.id,
            ready: self.is_ready(),
            chunks: self.index.as_ref().map_or(0, |i| i.len()),
            documents: self.documents.clone(),
            history_len: self.history.len(),
            updated_at: self.updated_at,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(Uuid::new_v4())
    }
}
