use ragchat_agent::{ModelConfig, RagConfig};
use ragchat_memory::EmbeddingConfig;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Environment variables consulted, in order, for an unset API key.
const API_KEY_VARS: &[&str] = &["RAGCHAT_API_KEY", "GOOGLE_API_KEY"];

#[derive(Debug, Default, Deserialize)]
pub struct RagchatConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub rag: RagConfig,
}

impl RagchatConfig {
    /// Reads `path`. A missing file is only accepted when `required` is false,
    /// in which case the offline defaults are used.
    pub async fn load(path: &Path, required: bool) -> anyhow::Result<Self> {
        let mut config = match tokio::fs::read_to_string(path).await {
            Ok(text) => toml::from_str::<Self>(&text).map_err(|e| {
                anyhow::anyhow!("Failed to parse config file '{}': {e}", path.display())
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                info!(path = %path.display(), "No config file, using offline defaults");
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Failed to read config file '{}': {e}",
                    path.display()
                ))
            }
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Fills empty API keys from the environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let key = API_KEY_VARS
            .iter()
            .find_map(|name| lookup(name).filter(|v| !v.is_empty()));
        let Some(key) = key else {
            return;
        };
        if self.model.api_key.is_empty() {
            self.model.api_key = key.clone();
        }
        for fallback in &mut self.model.fallback_models {
            if fallback.api_key.is_empty() {
                fallback.api_key = key.clone();
            }
        }
        if self.embedding.api_key.is_empty() {
            self.embedding.api_key = key;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use ragchat_agent::LlmProvider;
    use ragchat_memory::EmbeddingBackend;

    #[tokio::test]
    async fn test_missing_optional_config_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = RagchatConfig::load(&tmp.path().join("ragchat.toml"), false)
            .await
            .unwrap();
        assert_eq!(config.model.provider, LlmProvider::Extractive);
        assert_eq!(config.embedding.backend, EmbeddingBackend::Local);
        assert_eq!(config.rag.chunk_size, 1000);
    }

    #[tokio::test]
    async fn test_missing_required_config_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(RagchatConfig::load(&tmp.path().join("nope.toml"), true)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_full_config_parses() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ragchat.toml");
        std::fs::write(
            &path,
            r#"
            [model]
            provider = "gemini"
            api_key = "from-file"

            [embedding]
            backend = "openai"
            model = "text-embedding-004"
            dimension = 768

            [rag]
            chunk_size = 800
            chunk_overlap = 100
            condense_question = true
            "#,
        )
        .unwrap();

        let config = RagchatConfig::load(&path, true).await.unwrap();
        assert_eq!(config.model.provider, LlmProvider::Gemini);
        assert_eq!(config.model.api_key, "from-file");
        assert_eq!(config.embedding.backend, EmbeddingBackend::OpenAi);
        assert_eq!(config.embedding.dimension, 768);
        assert_eq!(config.rag.chunk_overlap, 100);
        assert!(config.rag.condense_question);
    }

    #[test]
    fn test_apply_env_fills_only_empty_keys() {
        let mut config = RagchatConfig::default();
        config.model.api_key = "explicit".into();
        config.model.fallback_models = vec![ModelConfig::default()];
        config.apply_env(|name| (name == "GOOGLE_API_KEY").then(|| "env-key".to_string()));

        assert_eq!(config.model.api_key, "explicit");
        assert_eq!(config.model.fallback_models[0].api_key, "env-key");
        assert_eq!(config.embedding.api_key, "env-key");
    }
}
