use crate::failover::RetryPolicy;
use ragchat_memory::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_TOP_K};
use serde::{Deserialize, Serialize};

/// Answer-generation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Offline extractive answers built from the retrieved chunks.
    Extractive,
    OpenAi,
    /// Google Gemini through its OpenAI-compatible endpoint.
    Gemini,
    OpenRouter,
    /// Groq cloud inference, OpenAI-compatible API.
    Groq,
    /// A local Ollama server.
    Ollama,
}

/// Generator settings, the `[model]` table of the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Backend family.
    pub provider: LlmProvider,
    /// Model name; empty selects the provider default.
    #[serde(default)]
    pub model_id: String,
    /// Bearer token for hosted providers.
    #[serde(default)]
    pub api_key: String,
    /// Overrides the provider's endpoint.
    pub api_base_url: Option<String>,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Completion length cap.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Generators tried in order when this one fails.
    #[serde(default)]
    pub fallback_models: Vec<ModelConfig>,
    /// Retries before falling back.
    #[serde(default)]
    pub retry_policy: Option<RetryPolicy>,
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    1024
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Extractive,
            model_id: String::new(),
            api_key: String::new(),
            api_base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            fallback_models: Vec::new(),
            retry_policy: None,
        }
    }
}

impl ModelConfig {
    /// API root including the version prefix; requests append
    /// `/chat/completions`.
    pub fn base_url(&self) -> &str {
        if let Some(url) = &self.api_base_url {
            url.trim_end_matches('/')
        } else {
            match self.provider {
                LlmProvider::Extractive => "local://extractive",
                LlmProvider::OpenAi => "https://api.openai.com/v1",
                LlmProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
                LlmProvider::OpenRouter => "https://openrouter.ai/api/v1",
                LlmProvider::Groq => "https://api.groq.com/openai/v1",
                LlmProvider::Ollama => "http://localhost:11434/v1",
            }
        }
    }

    /// Model id, or the provider's usual default when unset.
    pub fn model(&self) -> &str {
        if !self.model_id.is_empty() {
            return &self.model_id;
        }
        match self.provider {
            LlmProvider::Extractive => "extractive",
            LlmProvider::OpenAi => "gpt-4o-mini",
            LlmProvider::Gemini => "gemini-1.5-flash",
            LlmProvider::OpenRouter => "openai/gpt-4o-mini",
            LlmProvider::Groq => "llama-3.1-8b-instant",
            LlmProvider::Ollama => "llama3.1",
        }
    }
}

/// Retrieval and conversation settings, the `[rag]` table of the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Chunk window in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters shared by adjacent chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Chunks retrieved per question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Bound on each collaborator call; `0` waits indefinitely.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: Option<u64>,
    /// Rephrase follow-up questions into standalone ones before retrieval.
    #[serde(default)]
    pub condense_question: bool,
    /// Most recent turns rendered into a prompt; `None` renders all of them.
    /// The stored history is never truncated.
    #[serde(default)]
    pub max_history_turns: Option<usize>,
    /// Replaces the default system instruction.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_request_timeout_secs() -> Option<u64> {
    Some(120)
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            request_timeout_secs: default_request_timeout_secs(),
            condense_question: false,
            max_history_turns: None,
            system_prompt: None,
        }
    }
}
