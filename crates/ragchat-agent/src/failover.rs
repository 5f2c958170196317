use crate::generator::{GenerationRequest, Generator};
use async_trait::async_trait;
use ragchat_core::{RagError, RagResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Type alias for the injectable sleep function used in tests.
#[cfg(test)]
type SleepFn = Box<
    dyn Fn(u64) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> + Send + Sync,
>;

/// Configures retry behaviour for failover across generators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retries per generator before moving to the next one.
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub backoff_base_ms: u64,
    /// Maximum delay in milliseconds (cap for exponential backoff).
    pub backoff_max_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base_ms: 500,
            backoff_max_ms: 10_000,
        }
    }
}

/// Whether an error is transient and worth retrying.
///
/// Rate limits (429), authentication hiccups (401), timeouts and server
/// errors (5xx) are retryable. A 400 never is.
pub fn is_retryable(err: &RagError) -> bool {
    let lower = err.to_string().to_lowercase();

    if lower.contains("400") {
        return false;
    }

    lower.contains("429")
        || lower.contains("401")
        || lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("5xx")
        || lower.contains("500")
        || lower.contains("502")
        || lower.contains("503")
        || lower.contains("504")
}

fn compute_backoff(policy: &RetryPolicy, attempt: u32) -> u64 {
    let delay = policy
        .backoff_base_ms
        .saturating_mul(2u64.saturating_pow(attempt));
    delay.min(policy.backoff_max_ms)
}

/// A [`Generator`] that tries several generators in order with
/// exponential-backoff retries.
///
/// Within each generator it retries transient errors up to `max_retries`
/// times. A non-retryable error, or exhausted retries, moves on to the next
/// generator. If every generator fails the last error is returned.
pub struct FailoverGenerator {
    generators: Vec<Arc<dyn Generator>>,
    policy: RetryPolicy,
    #[cfg(test)]
    sleep_fn: Option<SleepFn>,
}

impl FailoverGenerator {
    /// Creates a failover chain. At least one generator is required.
    pub fn new(generators: Vec<Arc<dyn Generator>>, policy: RetryPolicy) -> RagResult<Self> {
        if generators.is_empty() {
            return Err(RagError::Config(
                "failover requires at least one generator".into(),
            ));
        }
        Ok(Self {
            generators,
            policy,
            #[cfg(test)]
            sleep_fn: None,
        })
    }

    async fn do_sleep(&self, ms: u64) {
        #[cfg(test)]
        if let Some(ref f) = self.sleep_fn {
            f(ms).await;
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
    }
}

#[async_trait]
impl Generator for FailoverGenerator {
    async fn generate(&self, request: &GenerationRequest) -> RagResult<String> {
        let mut last_err: Option<RagError> = None;

        for (idx, generator) in self.generators.iter().enumerate() {
            for attempt in 0..=self.policy.max_retries {
                match generator.generate(request).await {
                    Ok(text) => return Ok(text),
                    Err(e) => {
                        if !is_retryable(&e) {
                            warn!(
                                generator = idx,
                                name = generator.name(),
                                attempt,
                                error = %e,
                                "Non-retryable error, moving to next generator"
                            );
                            last_err = Some(e);
                            break;
                        }

                        if attempt < self.policy.max_retries {
                            let delay = compute_backoff(&self.policy, attempt);
                            info!(
                                generator = idx,
                                attempt,
                                delay_ms = delay,
                                error = %e,
                                "Retryable error, backing off"
                            );
                            self.do_sleep(delay).await;
                        }
                        last_err = Some(e);
                    }
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| RagError::Generation("all failover generators exhausted".into())))
    }

    fn name(&self) -> &str {
        "failover"
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::generator::RequestKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// A generator that returns a scripted sequence of results.
    struct ScriptedGenerator {
        results: tokio::sync::Mutex<Vec<RagResult<String>>>,
        calls: AtomicU32,
    }

    impl ScriptedGenerator {
        fn new(results: Vec<RagResult<String>>) -> Arc<Self> {
            Arc::new(Self {
                results: tokio::sync::Mutex::new(results),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(&self, _request: &GenerationRequest) -> RagResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut results = self.results.lock().await;
            if results.is_empty() {
                Err(RagError::Generation("script exhausted".into()))
            } else {
                results.remove(0)
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            kind: RequestKind::Answer,
            system: None,
            history: Vec::new(),
            question: "q".into(),
            context: Vec::new(),
            prompt: "q".into(),
        }
    }

    fn instant(generators: Vec<Arc<dyn Generator>>) -> FailoverGenerator {
        let mut failover = FailoverGenerator::new(
            generators,
            RetryPolicy {
                max_retries: 3,
                backoff_base_ms: 0,
                backoff_max_ms: 0,
            },
        )
        .unwrap();
        failover.sleep_fn = Some(Box::new(|_| Box::pin(async {})));
        failover
    }

    #[tokio::test]
    async fn retry_succeeds_on_second_try() {
        let first = ScriptedGenerator::new(vec![
            Err(RagError::Http("429 Too Many Requests".into())),
            Ok("ok".into()),
        ]);
        let failover = instant(vec![first.clone()]);

        assert_eq!(failover.generate(&request()).await.unwrap(), "ok");
        assert_eq!(first.calls(), 2);
    }

    #[tokio::test]
    async fn all_generators_fail_returns_last_error() {
        let failing = |code: &str| {
            ScriptedGenerator::new(
                (0..4)
                    .map(|_| Err(RagError::Http(format!("{code} Server Error"))))
                    .collect(),
            )
        };
        let failover = instant(vec![failing("500"), failing("503")]);

        let err = failover.generate(&request()).await.unwrap_err().to_string();
        assert!(err.contains("503"), "expected last error (503), got: {err}");
    }

    #[tokio::test]
    async fn non_retryable_skips_to_next_generator() {
        let first = ScriptedGenerator::new(vec![
            Err(RagError::Http("400 Bad Request".into())),
            Ok("should not reach".into()),
        ]);
        let second = ScriptedGenerator::new(vec![Ok("fallback ok".into())]);
        let failover = instant(vec![first.clone(), second]);

        assert_eq!(failover.generate(&request()).await.unwrap(), "fallback ok");
        assert_eq!(first.calls(), 1);
    }

    #[test]
    fn empty_chain_is_config_error() {
        let result = FailoverGenerator::new(Vec::new(), RetryPolicy::default());
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    fn backoff_computation() {
        let policy = RetryPolicy {
            max_retries: 5,
            backoff_base_ms: 500,
            backoff_max_ms: 10_000,
        };
        assert_eq!(compute_backoff(&policy, 0), 500);
        assert_eq!(compute_backoff(&policy, 1), 1000);
        assert_eq!(compute_backoff(&policy, 4), 8000);
        assert_eq!(compute_backoff(&policy, 5), 10_000);
    }

    #[test]
    fn is_retryable_classification() {
        assert!(is_retryable(&RagError::Http("429 Too Many Requests".into())));
        assert!(is_retryable(&RagError::Http("401 Unauthorized".into())));
        assert!(is_retryable(&RagError::Generation("timed out after 30s".into())));
        assert!(is_retryable(&RagError::Http("502 Bad Gateway".into())));
        assert!(!is_retryable(&RagError::Http("400 Bad Request".into())));
        assert!(!is_retryable(&RagError::Generation("empty completion".into())));
    }
}
