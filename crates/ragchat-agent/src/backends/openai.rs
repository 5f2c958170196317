use crate::config::{LlmProvider, ModelConfig};
use crate::generator::{GenerationRequest, Generator};
use async_trait::async_trait;
use ragchat_core::{RagError, RagResult, Role};
use tracing::debug;

/// OpenAI-compatible chat completions backend.
///
/// Works with OpenAI, Gemini's compatibility endpoint, OpenRouter, Groq,
/// Ollama, and any other provider implementing the same API.
pub struct OpenAiGenerator {
    config: ModelConfig,
    http: reqwest::Client,
}

impl OpenAiGenerator {
    /// Creates a generator for `config`.
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn build_messages(&self, request: &GenerationRequest) -> Vec<serde_json::Value> {
        let mut api_messages = Vec::with_capacity(request.history.len() + 2);

        if let Some(sys) = &request.system {
            api_messages.push(serde_json::json!({
                "role": "system",
                "content": sys
            }));
        }

        for turn in &request.history {
            api_messages.push(serde_json::json!({
                "role": match turn.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                "content": turn.text
            }));
        }

        api_messages.push(serde_json::json!({
            "role": "user",
            "content": request.prompt
        }));

        api_messages
    }

    fn add_provider_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header("Content-Type", "application/json");
        let request = if self.config.api_key.is_empty() {
            request
        } else {
            request.header("Authorization", format!("Bearer {}", self.config.api_key))
        };

        if matches!(self.config.provider, LlmProvider::OpenRouter) {
            request.header("X-Title", "ragchat")
        } else {
            request
        }
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> RagResult<String> {
        let url = format!("{}/chat/completions", self.config.base_url());
        let body = serde_json::json!({
            "model": self.config.model(),
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "messages": self.build_messages(request),
        });

        let resp = self
            .add_provider_headers(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::Http(e.to_string()))?;

        let status = resp.status();
        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| RagError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(RagError::Http(format!(
                "chat API error {status}: {resp_body}"
            )));
        }

        debug!(model = %self.config.model(), "Chat completion received");
        parse_chat_response(&resp_body)
    }

    fn name(&self) -> &str {
        self.config.model()
    }
}

/// Extracts `choices[0].message.content`, rejecting empty completions.
pub fn parse_chat_response(body: &serde_json::Value) -> RagResult<String> {
    let content = body["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or_default()
        .trim();
    if content.is_empty() {
        let reason = body["choices"][0]["finish_reason"]
            .as_str()
            .unwrap_or("missing content");
        return Err(RagError::Generation(format!(
            "empty completion ({reason})"
        )));
    }
    Ok(content.to_string())
}
