//! Retrieval-augmented conversation over uploaded documents.
//!
//! Ties chunking, embedding and retrieval from `ragchat-memory` to the
//! per-session state of `ragchat-session`, and drives answer generation
//! through pluggable [`Generator`] backends.
//!
//! # Main types
//!
//! - [`Orchestrator`]: Ingests document sets and answers questions per session.
//! - [`Generator`]: Trait for answer-generation backends.
//! - [`OpenAiGenerator`]: OpenAI-compatible chat completions backend.
//! - [`ExtractiveGenerator`]: Offline backend quoting the best context lines.
//! - [`FailoverGenerator`]: Retries and falls back across generators.
//! - [`ContextWindow`]: Selects the history rendered into each prompt.
//! - [`TextExtractor`]: Trait for turning document bytes into text.
//! - [`DocumentExtractor`]: Default extractor for PDF and plain-text files.

/// Generator backends.
pub mod backends;
/// Generator and retrieval configuration.
pub mod config;
/// Prompt assembly and history windowing.
pub mod context;
/// Document text extraction.
pub mod extract;
/// Failover and retry across generators.
pub mod failover;
/// Generator trait and request type.
pub mod generator;
/// The conversation orchestrator.
pub mod orchestrator;
/// Prompt templates.
pub mod prompt;

pub use backends::{build_generator, ExtractiveGenerator, OpenAiGenerator};
pub use config::{LlmProvider, ModelConfig, RagConfig};
pub use context::ContextWindow;
pub use extract::{Document, DocumentExtractor, PdfExtractor, PlainTextExtractor, TextExtractor};
pub use failover::{is_retryable, FailoverGenerator, RetryPolicy};
pub use generator::{GenerationRequest, Generator, RequestKind};
pub use orchestrator::{Answer, AskOutcome, IngestReport, Orchestrator, SkippedDocument};
