use crate::config::RagConfig;
use crate::context::ContextWindow;
use crate::extract::{Document, DocumentExtractor, TextExtractor};
use crate::generator::Generator;
use crate::prompt::DEFAULT_SYSTEM_PROMPT;
use ragchat_core::{ConversationTurn, RagError, RagResult};
use ragchat_memory::{
    build, search, Chunker, EmbeddingProvider, FlatIndex, SearchResult, VectorIndex,
};
use ragchat_session::{SessionRegistry, SessionState, SessionStatus};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Summary of a successful ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    /// Session the index was installed into.
    pub session_id: Uuid,
    /// Documents whose text went into the index.
    pub documents: Vec<String>,
    /// Documents dropped because extraction failed or produced no text.
    pub skipped: Vec<SkippedDocument>,
    /// Characters of aggregated text.
    pub characters: usize,
    /// Chunks in the new index.
    pub chunks: usize,
}

/// A document left out of an ingestion and the reason.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedDocument {
    /// Document name.
    pub name: String,
    /// Why it was skipped.
    pub reason: String,
}

/// A grounded answer.
#[derive(Debug, Clone)]
pub struct Answer {
    /// The generated reply.
    pub answer: String,
    /// Retrieved chunks the answer was conditioned on, best first.
    pub sources: Vec<SearchResult>,
    /// The rephrased question used for retrieval, when condensing ran.
    pub standalone_question: Option<String>,
    /// The full history after this exchange.
    pub history: Vec<ConversationTurn>,
}

/// Result of [`Orchestrator::ask`].
#[derive(Debug, Clone)]
pub enum AskOutcome {
    /// The question was answered and recorded.
    Answered(Answer),
    /// The question was blank; nothing happened.
    Ignored {
        /// The unchanged history.
        history: Vec<ConversationTurn>,
    },
}

impl AskOutcome {
    /// The history after the call.
    pub fn history(&self) -> &[ConversationTurn] {
        match self {
            AskOutcome::Answered(answer) => &answer.history,
            AskOutcome::Ignored { history } => history,
        }
    }
}

/// The retrieval-augmented conversation loop.
///
/// Every operation takes a session id. Work on one session is serialized by
/// that session's lock, held for the whole call; different sessions proceed
/// independently. Session state is only written after every collaborator
/// call has succeeded, so failures, timeouts and dropped futures leave it
/// untouched.
pub struct Orchestrator {
    chunker: Chunker,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn Generator>,
    extractor: Arc<dyn TextExtractor>,
    sessions: Arc<SessionRegistry>,
    window: ContextWindow,
    top_k: usize,
    condense_question: bool,
    timeout: Option<Duration>,
}

impl Orchestrator {
    /// Creates an orchestrator with its own session registry and the
    /// default PDF and plain-text extractor.
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn Generator>,
    ) -> RagResult<Self> {
        let chunker = Chunker::new(config.chunk_size, config.chunk_overlap)?;
        let mut window = ContextWindow::new(config.max_history_turns);
        window.set_system_prompt(
            config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        );

        Ok(Self {
            chunker,
            embedder,
            generator,
            extractor: Arc::new(DocumentExtractor),
            sessions: Arc::new(SessionRegistry::new()),
            window,
            top_k: config.top_k,
            condense_question: config.condense_question,
            timeout: config
                .request_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        })
    }

    /// Replaces the text extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Shares an existing session registry.
    pub fn with_sessions(mut self, sessions: Arc<SessionRegistry>) -> Self {
        self.sessions = sessions;
        self
    }

    /// Overrides the per-call timeout.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The session registry.
    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Builds a fresh index from `documents` and installs it, resetting the
    /// session's history.
    ///
    /// Any failure is returned as [`RagError::Ingestion`] and leaves the
    /// session exactly as it was. An unknown session is registered only when
    /// its first ingestion succeeds.
    pub async fn ingest(
        &self,
        session_id: Uuid,
        documents: Vec<Document>,
    ) -> RagResult<IngestReport> {
        let existing = self.sessions.get(session_id);
        let mut guard = match &existing {
            Some(handle) => Some(handle.lock().await),
            None => None,
        };

        info!(
            session_id = %session_id,
            documents = documents.len(),
            new_session = guard.is_none(),
            "Ingesting documents"
        );

        let (index, report) = match self.build_index(session_id, documents).await {
            Ok(built) => built,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Ingestion failed, session unchanged");
                return Err(RagError::ingestion(e));
            }
        };

        let index = Arc::new(index);
        match guard.as_mut() {
            Some(state) => state.install_index(index, report.documents.clone()),
            None => {
                let handle = self.sessions.handle(session_id);
                handle
                    .lock()
                    .await
                    .install_index(index, report.documents.clone());
            }
        }
        info!(
            session_id = %session_id,
            chunks = report.chunks,
            skipped = report.skipped.len(),
            "Documents processed, history reset"
        );
        Ok(report)
    }

    async fn build_index(
        &self,
        session_id: Uuid,
        documents: Vec<Document>,
    ) -> RagResult<(FlatIndex, IngestReport)> {
        let mut text = String::new();
        let mut names = Vec::new();
        let mut skipped = Vec::new();

        for document in &documents {
            match self.extractor.extract(document) {
                Ok(extracted) if !extracted.trim().is_empty() => {
                    text.push_str(&extracted);
                    if !extracted.ends_with('\n') {
                        text.push('\n');
                    }
                    names.push(document.name.clone());
                }
                Ok(_) => {
                    warn!(document = %document.name, "No text extracted, skipping");
                    skipped.push(SkippedDocument {
                        name: document.name.clone(),
                        reason: "no text extracted".into(),
                    });
                }
                Err(e) => {
                    warn!(document = %document.name, error = %e, "Extraction failed, skipping");
                    skipped.push(SkippedDocument {
                        name: document.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if text.trim().is_empty() {
            return Err(RagError::EmptyDocument(
                "no text could be extracted from the documents".into(),
            ));
        }

        let chunks = self.chunker.split(&text);
        debug!(session_id = %session_id, chunks = chunks.len(), "Text chunked");

        let index = self
            .bounded(build(chunks, self.embedder.as_ref()), RagError::Embedding)
            .await?;

        let report = IngestReport {
            session_id,
            documents: names,
            skipped,
            characters: text.chars().count(),
            chunks: index.len(),
        };
        Ok((index, report))
    }

    /// Answers `question` from the session's documents and conversation.
    ///
    /// Fails with [`RagError::NotReady`] before any ingestion, even for a
    /// blank question. A blank question on a ready session is a no-op. On
    /// success the question and answer are appended to the history; on
    /// failure the history is unchanged.
    pub async fn ask(&self, session_id: Uuid, question: &str) -> RagResult<AskOutcome> {
        let handle = self.sessions.get(session_id).ok_or(RagError::NotReady)?;
        let mut state = handle.lock().await;

        if !state.is_ready() {
            return Err(RagError::NotReady);
        }

        let question = question.trim();
        if question.is_empty() {
            debug!(session_id = %session_id, "Blank question ignored");
            return Ok(AskOutcome::Ignored {
                history: state.history().turns().to_vec(),
            });
        }

        info!(session_id = %session_id, "Answering question");
        let (answer, sources, standalone) =
            self.answer(&state, question).await.inspect_err(|e| {
                warn!(
                    session_id = %session_id,
                    error = %e,
                    kind = e.kind(),
                    "Question failed, history unchanged"
                );
            })?;

        state.record_exchange(question, answer.clone());
        info!(
            session_id = %session_id,
            history_len = state.history().len(),
            "Question answered"
        );

        Ok(AskOutcome::Answered(Answer {
            answer,
            sources,
            standalone_question: standalone,
            history: state.history().turns().to_vec(),
        }))
    }

    async fn answer(
        &self,
        state: &SessionState,
        question: &str,
    ) -> RagResult<(String, Vec<SearchResult>, Option<String>)> {
        let history = state.history().as_prompt_context();

        let standalone = if self.condense_question && !history.is_empty() {
            let request = self.window.condense_request(question, history);
            let rephrased = self
                .bounded(self.generator.generate(&request), RagError::Generation)
                .await
                .map_err(as_generation)?;
            let rephrased = rephrased.trim().to_string();
            debug!(session_id = %state.id, standalone = %rephrased, "Question condensed");
            (!rephrased.is_empty()).then_some(rephrased)
        } else {
            None
        };

        let retrieval_query = standalone.as_deref().unwrap_or(question);
        let sources = self
            .bounded(
                search(state.index(), retrieval_query, self.embedder.as_ref(), self.top_k),
                RagError::Embedding,
            )
            .await?;

        let request = self.window.answer_request(question, &sources, history);
        debug!(
            session_id = %state.id,
            sources = sources.len(),
            estimated_tokens = ContextWindow::estimated_tokens(&request),
            generator = self.generator.name(),
            "Generating answer"
        );

        let answer = self
            .bounded(self.generator.generate(&request), RagError::Generation)
            .await
            .map_err(as_generation)?;
        if answer.trim().is_empty() {
            return Err(RagError::Generation("generator returned an empty answer".into()));
        }

        Ok((answer, sources, standalone))
    }

    /// The session's conversation so far; empty for unknown sessions.
    pub async fn history(&self, session_id: Uuid) -> Vec<ConversationTurn> {
        match self.sessions.get(session_id) {
            Some(handle) => handle.lock().await.history().turns().to_vec(),
            None => Vec::new(),
        }
    }

    /// Readiness and size of the session, if it exists.
    pub async fn status(&self, session_id: Uuid) -> Option<SessionStatus> {
        self.sessions.status(session_id).await
    }

    /// Applies the configured timeout to a collaborator call, reporting an
    /// elapsed timer through `on_timeout`.
    async fn bounded<T, F>(&self, call: F, on_timeout: fn(String) -> RagError) -> RagResult<T>
    where
        F: Future<Output = RagResult<T>>,
    {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| on_timeout(format!("timed out after {}ms", limit.as_millis())))?,
            None => call.await,
        }
    }
}

/// Any generator failure surfaces as a generation error.
fn as_generation(err: RagError) -> RagError {
    match err {
        RagError::Generation(_) => err,
        other => RagError::Generation(other.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::backends::ExtractiveGenerator;
    use ragchat_memory::LocalEmbedding;

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(
            &RagConfig::default(),
            Arc::new(LocalEmbedding::default()),
            Arc::new(ExtractiveGenerator::default()),
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_chunking_config() {
        let config = RagConfig {
            chunk_size: 100,
            chunk_overlap: 100,
            ..RagConfig::default()
        };
        let result = Orchestrator::new(
            &config,
            Arc::new(LocalEmbedding::default()),
            Arc::new(ExtractiveGenerator::default()),
        );
        assert!(matches!(result, Err(RagError::Chunking(_))));
    }

    #[tokio::test]
    async fn test_ask_unknown_session_is_not_ready() {
        let orch = orchestrator();
        let err = orch.ask(Uuid::new_v4(), "anything?").await.unwrap_err();
        assert!(matches!(err, RagError::NotReady));
    }

    #[tokio::test]
    async fn test_skipped_documents_are_reported() {
        let orch = orchestrator();
        let id = Uuid::new_v4();
        let report = orch
            .ingest(
                id,
                vec![
                    Document::new("empty.txt", Vec::new()),
                    Document::new("blob.bin", vec![0u8; 32]),
                    Document::new("scan.pdf", b"%PDF-1.7 truncated".to_vec()),
                    Document::new("policy.txt", b"Refunds within 30 days.".to_vec()),
                ],
            )
            .await
            .unwrap();
        assert_eq!(report.documents, vec!["policy.txt".to_string()]);
        assert_eq!(report.skipped.len(), 3);
        assert_eq!(report.chunks, 1);
        assert!(orch.status(id).await.unwrap().ready);
    }

    #[tokio::test]
    async fn test_documents_do_not_merge_lines() {
        let orch = orchestrator();
        let id = Uuid::new_v4();
        orch.ingest(
            id,
            vec![
                Document::new("a.txt", b"first document".to_vec()),
                Document::new("b.txt", b"second document".to_vec()),
            ],
        )
        .await
        .unwrap();
        let outcome = orch.ask(id, "second").await.unwrap();
        let AskOutcome::Answered(answer) = outcome else {
            panic!("expected an answer");
        };
        assert_eq!(answer.sources[0].chunk.text, "first document\nsecond document\n");
        assert_eq!(answer.answer, "second document");
    }

    #[tokio::test]
    async fn test_failed_first_ingest_registers_nothing() {
        let orch = orchestrator();
        let id = Uuid::new_v4();
        let err = orch
            .ingest(id, vec![Document::new("blank.txt", b"   \n\n".to_vec())])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Ingestion(_)));
        assert!(orch.status(id).await.is_none());
        assert!(orch.sessions().is_empty());

        orch.ingest(id, vec![Document::new("a.txt", b"some text".to_vec())])
            .await
            .unwrap();
        assert_eq!(orch.sessions().len(), 1);

        orch.ingest(id, vec![Document::new("blank.txt", Vec::new())])
            .await
            .unwrap_err();
        let status = orch.status(id).await.unwrap();
        assert!(status.ready);
        assert_eq!(orch.sessions().len(), 1);
    }
}
