use async_trait::async_trait;
use ragchat_core::{RagError, RagResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Capability that maps text to a fixed-dimension vector.
///
/// The same provider must be used to build an index and to query it.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Compute the embedding vector for a single text.
    async fn embed(&self, text: &str) -> RagResult<Vec<f32>>;

    /// Compute embeddings for a batch of texts, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> RagResult<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Dimension of the vectors produced by this provider.
    fn dimension(&self) -> usize;
}

/// Deterministic bag-of-words embedding that needs no network.
///
/// Each word's term frequency is hashed into three positions of a
/// fixed-size vector, which is then L2 normalized.
pub struct LocalEmbedding {
    dimension: usize,
}

impl LocalEmbedding {
    /// Creates an embedder producing vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }
}

impl Default for LocalEmbedding {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedding {
    async fn embed(&self, text: &str) -> RagResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(RagError::Embedding("cannot embed empty text".to_string()));
        }

        let mut vector = vec![0.0f32; self.dimension];

        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 1)
            .collect();

        let mut freq: HashMap<&str, f32> = HashMap::new();
        for word in &words {
            *freq.entry(word).or_insert(0.0) += 1.0;
        }

        let total = words.len() as f32;
        if total == 0.0 {
            return Ok(vector);
        }

        for (word, count) in &freq {
            let tf = count / total;
            let bytes = word.as_bytes();
            vector[fnv1a(bytes, None) as usize % self.dimension] += tf;
            vector[fnv1a(bytes, Some(1)) as usize % self.dimension] += tf * 0.7;
            vector[fnv1a(bytes, Some(2)) as usize % self.dimension] += tf * 0.5;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// FNV-1a over `data`, optionally salted with one trailing byte.
fn fnv1a(data: &[u8], salt: Option<u8>) -> u32 {
    let mut hash: u32 = 2166136261;
    for &byte in data.iter().chain(salt.as_ref()) {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

/// Embedding provider speaking the OpenAI `/embeddings` API.
///
/// Works with OpenAI, Google's OpenAI-compatible Gemini endpoint, Ollama,
/// and other servers implementing the same request shape.
pub struct OpenAiEmbedding {
    base_url: String,
    model: String,
    api_key: String,
    dimension: usize,
    http: reqwest::Client,
}

impl OpenAiEmbedding {
    /// Creates a provider posting to `{base_url}/embeddings`.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            dimension,
            http: reqwest::Client::new(),
        }
    }

    async fn request(&self, input: &[&str]) -> RagResult<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "input": input,
        });

        let mut request = self
            .http
            .post(&url)
            .header("Content-Type", "application/json");
        if !self.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let resp = request
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        let status = resp.status();
        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        if !status.is_success() {
            return Err(RagError::Embedding(format!(
                "embedding API error {status}: {resp_body}"
            )));
        }

        debug!(model = %self.model, inputs = input.len(), "Embedding batch received");
        parse_embedding_response(&resp_body, input.len())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> RagResult<Vec<f32>> {
        let mut vectors = self.request(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("empty embedding response".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> RagResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Extracts `data[*].embedding` ordered by each item's `index`.
pub fn parse_embedding_response(
    body: &serde_json::Value,
    expected: usize,
) -> RagResult<Vec<Vec<f32>>> {
    let data = body["data"]
        .as_array()
        .ok_or_else(|| RagError::Embedding("response has no `data` array".into()))?;

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for (position, item) in data.iter().enumerate() {
        let index = item["index"]
            .as_u64()
            .map_or(position, |i| i as usize);
        let values = item["embedding"]
            .as_array()
            .ok_or_else(|| RagError::Embedding(format!("item {index} has no embedding")))?;
        let vector = values
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Option<Vec<f32>>>()
            .ok_or_else(|| RagError::Embedding(format!("item {index} is not numeric")))?;
        let slot = slots
            .get_mut(index)
            .ok_or_else(|| RagError::Embedding(format!("unexpected item index {index}")))?;
        if slot.is_some() {
            return Err(RagError::Embedding(format!("duplicate item index {index}")));
        }
        *slot = Some(vector);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(i, v)| v.ok_or_else(|| RagError::Embedding(format!("missing embedding {i}"))))
        .collect()
}

/// Which embedding backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// [`LocalEmbedding`].
    #[default]
    Local,
    /// [`OpenAiEmbedding`] against any OpenAI-compatible server.
    OpenAi,
}

/// Embedding settings, typically the `[embedding]` table of the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Backend to use.
    #[serde(default)]
    pub backend: EmbeddingBackend,
    /// Model identifier sent to remote backends.
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Vector dimension.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    /// API key for remote backends.
    #[serde(default)]
    pub api_key: String,
    /// Base URL of the remote API, including its version prefix.
    #[serde(default = "default_embedding_base_url")]
    pub api_base_url: String,
}

fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}

fn default_dimension() -> usize {
    256
}

fn default_embedding_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            model: default_embedding_model(),
            dimension: default_dimension(),
            api_key: String::new(),
            api_base_url: default_embedding_base_url(),
        }
    }
}

impl EmbeddingConfig {
    /// Builds the configured provider.
    pub fn build(&self) -> Arc<dyn EmbeddingProvider> {
        match self.backend {
            EmbeddingBackend::Local => Arc::new(LocalEmbedding::new(self.dimension)),
            EmbeddingBackend::OpenAi => Arc::new(OpenAiEmbedding::new(
                self.api_base_url.clone(),
                self.model.clone(),
                self.api_key.clone(),
                self.dimension,
            )),
        }
    }
}
