/// Offline extractive generator.
pub mod extractive;
/// OpenAI-compatible chat completions generator.
pub mod openai;

use crate::config::{LlmProvider, ModelConfig};
use crate::failover::FailoverGenerator;
use crate::generator::Generator;
use ragchat_core::RagResult;
use std::sync::Arc;

pub use extractive::ExtractiveGenerator;
pub use openai::OpenAiGenerator;

/// Builds the generator described by `config`.
///
/// When fallback models are configured the primary and its fallbacks are
/// wrapped in a [`FailoverGenerator`].
pub fn build_generator(config: &ModelConfig) -> RagResult<Arc<dyn Generator>> {
    if config.fallback_models.is_empty() && config.retry_policy.is_none() {
        return Ok(single(config));
    }

    let mut generators = vec![single(config)];
    generators.extend(config.fallback_models.iter().map(single));
    let policy = config.retry_policy.clone().unwrap_or_default();
    Ok(Arc::new(FailoverGenerator::new(generators, policy)?))
}

fn single(config: &ModelConfig) -> Arc<dyn Generator> {
    match config.provider {
        LlmProvider::Extractive => Arc::new(ExtractiveGenerator::default()),
        _ => Arc::new(OpenAiGenerator::new(config.clone())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_build_single_and_failover() {
        let plain = build_generator(&ModelConfig::default()).unwrap();
        assert_eq!(plain.name(), "extractive");

        let chained = ModelConfig {
            provider: LlmProvider::Groq,
            fallback_models: vec![ModelConfig::default()],
            ..ModelConfig::default()
        };
        assert_eq!(build_generator(&chained).unwrap().name(), "failover");
    }
}
