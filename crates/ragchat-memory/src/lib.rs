//! Chunking, embedding and similarity search for document retrieval.
//!
//! Raw document text is split into overlapping line-aligned chunks, each
//! chunk is embedded once, and questions are answered by cosine similarity
//! against the stored vectors.
//!
//! # Main types
//!
//! - [`Chunker`]: Line-oriented splitter with overlapping windows.
//! - [`EmbeddingProvider`]: Trait for computing text embeddings.
//! - [`LocalEmbedding`]: Offline hashing embedder.
//! - [`OpenAiEmbedding`]: Embedder for OpenAI-compatible `/embeddings` APIs.
//! - [`VectorIndex`]: Trait for immutable similarity indexes.
//! - [`FlatIndex`]: Exact linear-scan index.

/// Text chunking.
pub mod chunk;
/// Embedding provider trait and implementations.
pub mod embedding;
/// Vector index construction and search.
pub mod index;

pub use chunk::{split, Chunk, Chunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use embedding::{
    EmbeddingBackend, EmbeddingConfig, EmbeddingProvider, LocalEmbedding, OpenAiEmbedding,
};
pub use index::{
    build, cosine_similarity, search, EmbeddedChunk, FlatIndex, SearchResult, VectorIndex,
    DEFAULT_TOP_K,
};
