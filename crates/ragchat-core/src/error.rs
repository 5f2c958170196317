use thiserror::Error;

/// A convenience `Result` alias using [`RagError`].
pub type RagResult<T> = Result<T, RagError>;

/// Top-level error type for the retrieval-augmented conversation pipeline.
///
/// Every variant is recoverable: none of them leaves session state
/// partially updated.
#[derive(Error, Debug)]
pub enum RagError {
    /// The document set produced no usable text.
    #[error("Empty document: {0}")]
    EmptyDocument(String),

    /// Invalid chunking parameters.
    #[error("Chunking error: {0}")]
    Chunking(String),

    /// The embedding collaborator failed or returned malformed vectors.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// A search was attempted without an index.
    #[error("Index is empty: no documents have been processed")]
    EmptyIndex,

    /// The generation collaborator failed or timed out.
    #[error("Generation error: {0}")]
    Generation(String),

    /// A question was asked before any document set was processed.
    #[error("Session not ready: process documents before asking questions")]
    NotReady,

    /// Ingestion failed; the session keeps its previous state.
    #[error("Ingestion failed: {0}")]
    Ingestion(#[source] Box<RagError>),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An error from an outbound HTTP request.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Wraps `cause` as an ingestion failure. Already-wrapped errors are
    /// returned unchanged.
    pub fn ingestion(cause: RagError) -> Self {
        match cause {
            RagError::Ingestion(_) => cause,
            other => RagError::Ingestion(Box::new(other)),
        }
    }

    /// Stable snake_case name of the error kind, for logs and callers that
    /// branch on the failure category.
    pub fn kind(&self) -> &'static str {
        match self {
            RagError::EmptyDocument(_) => "empty_document",
            RagError::Chunking(_) => "chunking",
            RagError::Embedding(_) => "embedding",
            RagError::EmptyIndex => "empty_index",
            RagError::Generation(_) => "generation",
            RagError::NotReady => "not_ready",
            RagError::Ingestion(_) => "ingestion",
            RagError::Config(_) => "config",
            RagError::Http(_) => "http",
            RagError::Json(_) => "json",
            RagError::Io(_) => "io",
        }
    }

    /// The underlying cause of an ingestion failure, if this is one.
    pub fn ingestion_cause(&self) -> Option<&RagError> {
        match self {
            RagError::Ingestion(cause) => Some(cause),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_ingestion_wraps_cause() {
        let err = RagError::ingestion(RagError::EmptyDocument("no text".into()));
        assert_eq!(err.kind(), "ingestion");
        assert_eq!(err.ingestion_cause().unwrap().kind(), "empty_document");
        assert!(err.source().is_some());
        assert!(err.to_string().contains("no text"));
    }

    #[test]
    fn test_ingestion_does_not_double_wrap() {
        let once = RagError::ingestion(RagError::Embedding("boom".into()));
        let twice = RagError::ingestion(once);
        assert_eq!(twice.ingestion_cause().unwrap().kind(), "embedding");
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: RagError = parse.unwrap_err().into();
        assert_eq!(err.kind(), "json");
    }

    #[test]
    fn test_display_messages() {
        assert!(RagError::NotReady.to_string().contains("not ready"));
        assert!(RagError::EmptyIndex.to_string().contains("empty"));
    }
}
