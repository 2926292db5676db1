//! Retry with exponential backoff for transient provider failures.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::error::{EmbeddingError, Result};
use crate::provider::EmbeddingProvider;
use crate::Embedding;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first call.
    pub max_retries: u32,
    /// Base delay between retries (doubled per attempt).
    #[serde(with = "crate::serde_millis")]
    pub base_delay: Duration,
    /// Upper bound for a single delay, including `Retry-After` hints.
    #[serde(with = "crate::serde_millis")]
    pub max_delay: Duration,
    /// Whether to add up to 50% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `attempt + 1`.
    ///
    /// A provider `Retry-After` hint wins over the computed backoff but is
    /// still capped at `max_delay`.
    pub(crate) fn delay_for(&self, attempt: u32, error: &EmbeddingError) -> Duration {
        if let EmbeddingError::RateLimited {
            retry_after_secs: Some(secs),
        } = error
        {
            return Duration::from_secs(*secs).min(self.max_delay);
        }

        let base = self.base_delay.as_millis() as u64;
        let exponential = base.saturating_mul(2_u64.saturating_pow(attempt));
        let delay = exponential.min(self.max_delay.as_millis() as u64);

        if self.jitter {
            let jitter = fastrand::u64(0..=delay / 2);
            Duration::from_millis(delay + jitter)
        } else {
            Duration::from_millis(delay)
        }
    }
}

/// Wraps a provider and retries calls that fail with a retryable error.
pub struct RetryingProvider {
    inner: Arc<dyn EmbeddingProvider>,
    config: RetryConfig,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl EmbeddingProvider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut attempt = 0;
        loop {
            match self.inner.embed(text).await {
                Ok(embedding) => return Ok(embedding),
                Err(err) if attempt < self.config.max_retries && err.is_retryable() => {
                    let delay = self.config.delay_for(attempt, &err);
                    warn!(
                        provider = self.inner.name(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying embedding call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails `failures` times with `error`, then succeeds.
    struct Flaky {
        calls: AtomicU32,
        failures: u32,
        error: EmbeddingError,
    }

    #[async_trait]
    impl EmbeddingProvider for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        fn dimension(&self) -> usize {
            2
        }

        async fn embed(&self, _text: &str) -> Result<Embedding> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(self.error.clone())
            } else {
                Ok(vec![1.0, 0.0])
            }
        }
    }

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig::default()
            .with_max_retries(max_retries)
            .with_base_delay(Duration::from_millis(1))
            .with_jitter(false)
    }

    #[tokio::test]
    async fn retry_succeeds_eventually() {
        let flaky = Arc::new(Flaky {
            calls: AtomicU32::new(0),
            failures: 2,
            error: EmbeddingError::Transport("connection reset".into()),
        });
        let provider = RetryingProvider::new(flaky.clone(), fast_config(3));

        let embedding = provider.embed("text").await.unwrap();
        assert_eq!(embedding, vec![1.0, 0.0]);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_attempts() {
        let flaky = Arc::new(Flaky {
            calls: AtomicU32::new(0),
            failures: u32::MAX,
            error: EmbeddingError::Api {
                status: 503,
                body: "busy".into(),
            },
        });
        let provider = RetryingProvider::new(flaky.clone(), fast_config(2));

        let err = provider.embed("text").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Api { status: 503, .. }));
        // Initial call + 2 retries
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_immediately() {
        let flaky = Arc::new(Flaky {
            calls: AtomicU32::new(0),
            failures: u32::MAX,
            error: EmbeddingError::Authentication { status: 401 },
        });
        let provider = RetryingProvider::new(flaky.clone(), fast_config(5));

        assert!(provider.embed("text").await.is_err());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let cfg = RetryConfig::default()
            .with_base_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(350))
            .with_jitter(false);
        let err = EmbeddingError::Transport("timeout".into());

        assert_eq!(cfg.delay_for(0, &err), Duration::from_millis(100));
        assert_eq!(cfg.delay_for(1, &err), Duration::from_millis(200));
        assert_eq!(cfg.delay_for(2, &err), Duration::from_millis(350));
        assert_eq!(cfg.delay_for(40, &err), Duration::from_millis(350));
    }

    #[test]
    fn retry_after_hint_is_honoured_but_capped() {
        let cfg = RetryConfig::default()
            .with_max_delay(Duration::from_secs(5))
            .with_jitter(false);

        let short = EmbeddingError::RateLimited {
            retry_after_secs: Some(2),
        };
        assert_eq!(cfg.delay_for(0, &short), Duration::from_secs(2));

        let long = EmbeddingError::RateLimited {
            retry_after_secs: Some(60),
        };
        assert_eq!(cfg.delay_for(0, &long), Duration::from_secs(5));
    }

    #[test]
    fn jitter_stays_within_half_delay() {
        let cfg = RetryConfig::default()
            .with_base_delay(Duration::from_millis(100))
            .with_jitter(true);
        let err = EmbeddingError::Transport("reset".into());

        for _ in 0..50 {
            let delay = cfg.delay_for(0, &err);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(150));
        }
    }

    #[test]
    fn config_deserializes_millis() {
        let cfg: RetryConfig =
            serde_json::from_str(r#"{"max_retries":1,"base_delay":50,"max_delay":1000}"#).unwrap();
        assert_eq!(cfg.max_retries, 1);
        assert_eq!(cfg.base_delay, Duration::from_millis(50));
        assert_eq!(cfg.max_delay, Duration::from_secs(1));
        assert!(cfg.jitter);
    }
}
