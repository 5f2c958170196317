use crate::generator::{GenerationRequest, Generator, RequestKind};
use async_trait::async_trait;
use ragchat_core::{RagError, RagResult};
use std::collections::HashSet;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "about", "can", "did", "do", "does", "for", "from", "how", "in",
    "is", "it", "many", "much", "of", "on", "or", "the", "there", "this", "to", "was", "what",
    "when", "where", "which", "who", "why", "with", "you",
];

/// Generator that answers with the context lines sharing the most terms
/// with the question. Needs no model and is fully deterministic.
///
/// Condense requests return the question unchanged.
#[derive(Debug, Clone)]
pub struct ExtractiveGenerator {
    max_lines: usize,
}

impl ExtractiveGenerator {
    /// Creates a generator quoting at most `max_lines` lines per answer.
    pub fn new(max_lines: usize) -> Self {
        Self {
            max_lines: max_lines.max(1),
        }
    }
}

impl Default for ExtractiveGenerator {
    fn default() -> Self {
        Self::new(3)
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Exact match, or a shared stem for words of four or more characters.
fn matches(word: &str, term: &str) -> bool {
    word == term
        || (term.len() >= 4 && word.starts_with(term))
        || (word.len() >= 4 && term.starts_with(word))
}

fn score(line: &str, query: &HashSet<String>) -> usize {
    let words = terms(line);
    query
        .iter()
        .filter(|term| words.iter().any(|w| matches(w, term)))
        .count()
}

#[async_trait]
impl Generator for ExtractiveGenerator {
    async fn generate(&self, request: &GenerationRequest) -> RagResult<String> {
        if request.kind == RequestKind::Condense {
            return Ok(request.question.clone());
        }

        let query = terms(&request.question);
        let mut seen = HashSet::new();
        let mut candidates: Vec<(usize, usize, &str)> = Vec::new();
        for line in request.context.iter().flat_map(|c| c.lines()) {
            let line = line.trim();
            if line.is_empty() || !seen.insert(line) {
                continue;
            }
            candidates.push((score(line, &query), candidates.len(), line));
        }

        let fallback = candidates.first().map(|c| c.2.to_string());
        candidates.retain(|c| c.0 > 0);
        candidates.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        candidates.truncate(self.max_lines);
        candidates.sort_by_key(|c| c.1);

        if candidates.is_empty() {
            return fallback.ok_or_else(|| {
                RagError::Generation("no context available to answer from".into())
            });
        }
        Ok(candidates
            .iter()
            .map(|c| c.2)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn name(&self) -> &str {
        "extractive"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn answer_request(question: &str, context: &[&str]) -> GenerationRequest {
        GenerationRequest {
            kind: RequestKind::Answer,
            system: None,
            history: Vec::new(),
            question: question.into(),
            context: context.iter().map(|s| s.to_string()).collect(),
            prompt: String::new(),
        }
    }

    #[tokio::test]
    async fn test_picks_matching_line() {
        let gen = ExtractiveGenerator::default();
        let req = answer_request(
            "How many days for a refund?",
            &["Shipping takes a week.\nPolicy: refunds within 30 days.\nPolicy: refunds within 30 days."],
        );
        assert_eq!(
            gen.generate(&req).await.unwrap(),
            "Policy: refunds within 30 days."
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_first_line() {
        let gen = ExtractiveGenerator::default();
        let req = answer_request("zebra?", &["alpha beta\ngamma"]);
        assert_eq!(gen.generate(&req).await.unwrap(), "alpha beta");
    }

    #[tokio::test]
    async fn test_no_context_is_generation_error() {
        let gen = ExtractiveGenerator::default();
        let err = gen.generate(&answer_request("q", &[])).await.unwrap_err();
        assert!(matches!(err, RagError::Generation(_)));
    }

    #[tokio::test]
    async fn test_condense_echoes_question() {
        let gen = ExtractiveGenerator::default();
        let mut req = answer_request("and for exchanges?", &[]);
        req.kind = RequestKind::Condense;
        assert_eq!(gen.generate(&req).await.unwrap(), "and for exchanges?");
    }
}
