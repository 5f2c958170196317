use crate::chunk::Chunk;
use crate::embedding::EmbeddingProvider;
use ragchat_core::{RagError, RagResult};
use std::cmp::Ordering;
use tracing::{debug, info};

/// Number of chunks retrieved per question unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 4;

/// A chunk together with its embedding vector.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    /// The indexed chunk.
    pub chunk: Chunk,
    /// Its embedding.
    pub vector: Vec<f32>,
}

/// A retrieved chunk and its cosine similarity to the query.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
}

/// Immutable similarity index over embedded chunks.
///
/// Implementations must order results by descending score with ties broken
/// by ascending chunk index, so identical queries return identical results.
pub trait VectorIndex: Send + Sync {
    /// Number of indexed chunks. Never zero for a built index.
    fn len(&self) -> usize;

    /// Whether the index holds no chunks.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension shared by every stored vector.
    fn dimension(&self) -> usize;

    /// Top `k` chunks for an already embedded query.
    fn search_vector(&self, query: &[f32], k: usize) -> RagResult<Vec<SearchResult>>;
}

/// Exact index that scores every stored vector on each query.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    entries: Vec<EmbeddedChunk>,
    dimension: usize,
}

impl FlatIndex {
    /// Validates and wraps pre-computed embeddings.
    pub fn from_embedded(entries: Vec<EmbeddedChunk>) -> RagResult<Self> {
        let first = entries
            .first()
            .ok_or_else(|| RagError::EmptyDocument("no chunks to index".into()))?;
        let dimension = first.vector.len();
        for entry in &entries {
            validate_vector(&entry.vector, dimension, entry.chunk.index)?;
        }
        Ok(Self { entries, dimension })
    }

    /// The stored chunks in index order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }
}

impl VectorIndex for FlatIndex {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn search_vector(&self, query: &[f32], k: usize) -> RagResult<Vec<SearchResult>> {
        if query.len() != self.dimension {
            return Err(RagError::Embedding(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dimension
            )));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f32, &EmbeddedChunk)> = self
            .entries
            .iter()
            .map(|e| (cosine_similarity(query, &e.vector), e))
            .collect();

        scored.sort_by(|a, b| rank(a.0, a.1.chunk.index, b.0, b.1.chunk.index));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, e)| SearchResult {
                chunk: e.chunk.clone(),
                score,
            })
            .collect())
    }
}

/// Descending score, then ascending chunk index.
fn rank(score_a: f32, index_a: usize, score_b: f32, index_b: usize) -> Ordering {
    score_b
        .total_cmp(&score_a)
        .then_with(|| index_a.cmp(&index_b))
}

fn validate_vector(vector: &[f32], dimension: usize, chunk: usize) -> RagResult<()> {
    if vector.is_empty() {
        return Err(RagError::Embedding(format!(
            "empty embedding for chunk {chunk}"
        )));
    }
    if vector.len() != dimension {
        return Err(RagError::Embedding(format!(
            "chunk {chunk} has dimension {}, expected {dimension}",
            vector.len()
        )));
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(RagError::Embedding(format!(
            "non-finite value in embedding for chunk {chunk}"
        )));
    }
    Ok(())
}

/// Embeds every chunk in one batch and builds a [`FlatIndex`].
///
/// Fails with [`RagError::EmptyDocument`] for zero chunks and with
/// [`RagError::Embedding`] when the provider errors or returns malformed
/// vectors.
pub async fn build(chunks: Vec<Chunk>, embedder: &dyn EmbeddingProvider) -> RagResult<FlatIndex> {
    if chunks.is_empty() {
        return Err(RagError::EmptyDocument("no chunks to index".into()));
    }

    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    let vectors = embedder.embed_batch(&texts).await.map_err(as_embedding)?;
    if vectors.len() != chunks.len() {
        return Err(RagError::Embedding(format!(
            "provider returned {} vectors for {} chunks",
            vectors.len(),
            chunks.len()
        )));
    }

    let entries: Vec<EmbeddedChunk> = chunks
        .into_iter()
        .zip(vectors)
        .map(|(chunk, vector)| EmbeddedChunk { chunk, vector })
        .collect();
    let index = FlatIndex::from_embedded(entries)?;

    info!(
        chunks = index.len(),
        dimension = index.dimension(),
        "Vector index built"
    );
    Ok(index)
}

/// Embeds `query` and returns the `k` most similar chunks.
///
/// `index` is `None` when no document set has been processed, which yields
/// [`RagError::EmptyIndex`].
pub async fn search(
    index: Option<&dyn VectorIndex>,
    query: &str,
    embedder: &dyn EmbeddingProvider,
    k: usize,
) -> RagResult<Vec<SearchResult>> {
    let index = index.ok_or(RagError::EmptyIndex)?;
    let vector = embedder.embed(query).await.map_err(as_embedding)?;
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(RagError::Embedding("non-finite value in query embedding".into()));
    }
    let results = index.search_vector(&vector, k)?;
    debug!(k, hits = results.len(), "Index searched");
    Ok(results)
}

/// Any provider failure surfaces as an embedding error.
fn as_embedding(err: RagError) -> RagError {
    match err {
        RagError::Embedding(_) => err,
        other => RagError::Embedding(other.to_string()),
    }
}

/// Cosine similarity; `0.0` for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn chunk(index: usize, text: &str) -> Chunk {
        Chunk {
            index,
            text: text.to_string(),
            start: 0,
            end: text.len(),
        }
    }

    /// Returns canned vectors keyed by the first word of the text.
    struct TableEmbedder;

    #[async_trait]
    impl EmbeddingProvider for TableEmbedder {
        async fn embed(&self, text: &str) -> RagResult<Vec<f32>> {
            Ok(match text.split_whitespace().next() {
                Some("north") => vec![1.0, 0.0, 0.0],
                Some("east") => vec![0.0, 1.0, 0.0],
                Some("northeast") => vec![0.7, 0.7, 0.0],
                Some("nan") => vec![f32::NAN, 0.0, 0.0],
                Some("short") => vec![1.0],
                _ => vec![0.0, 0.0, 1.0],
            })
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_build_rejects_zero_chunks() {
        let err = build(Vec::new(), &TableEmbedder).await.unwrap_err();
        assert!(matches!(err, RagError::EmptyDocument(_)));
    }

    #[tokio::test]
    async fn test_build_rejects_bad_vectors() {
        let nan = build(vec![chunk(0, "nan value")], &TableEmbedder).await;
        assert!(matches!(nan, Err(RagError::Embedding(_))));

        let mixed = build(
            vec![chunk(0, "north pole"), chunk(1, "short one")],
            &TableEmbedder,
        )
        .await;
        assert!(matches!(mixed, Err(RagError::Embedding(_))));
    }

    #[tokio::test]
    async fn test_search_orders_by_score() {
        let index = build(
            vec![
                chunk(0, "east coast"),
                chunk(1, "north pole"),
                chunk(2, "northeast corner"),
            ],
            &TableEmbedder,
        )
        .await
        .unwrap();

        let hits = search(Some(&index), "north", &TableEmbedder, 3).await.unwrap();
        let order: Vec<usize> = hits.iter().map(|h| h.chunk.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert!(hits[0].score >= hits[1].score && hits[1].score >= hits[2].score);
    }

    #[tokio::test]
    async fn test_ties_break_by_chunk_index() {
        let index = build(
            vec![chunk(0, "east a"), chunk(1, "north a"), chunk(2, "north b")],
            &TableEmbedder,
        )
        .await
        .unwrap();
        let hits = search(Some(&index), "north", &TableEmbedder, 2).await.unwrap();
        assert_eq!(hits[0].chunk.index, 1);
        assert_eq!(hits[1].chunk.index, 2);
    }

    #[tokio::test]
    async fn test_k_bounds() {
        let index = build(vec![chunk(0, "north"), chunk(1, "east")], &TableEmbedder)
            .await
            .unwrap();
        assert!(search(Some(&index), "north", &TableEmbedder, 0)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            search(Some(&index), "north", &TableEmbedder, 10)
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_search_without_index() {
        let err = search(None, "north", &TableEmbedder, 4).await.unwrap_err();
        assert!(matches!(err, RagError::EmptyIndex));
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch() {
        let index = build(vec![chunk(0, "north")], &TableEmbedder).await.unwrap();
        let err = search(Some(&index), "short query", &TableEmbedder, 4)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
    }
}
