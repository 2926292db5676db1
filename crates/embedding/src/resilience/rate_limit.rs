//! Client-side rate limiting for embedding providers.
//!
//! A token bucket placed in front of the provider keeps a batch from
//! exceeding the provider's request quota.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{EmbeddingError, Result};
use crate::provider::EmbeddingProvider;
use crate::Embedding;

/// Configuration for rate limiting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Sustained request rate.
    pub requests_per_second: f64,
    /// Requests that may be made instantly from a full bucket.
    pub burst_size: u64,
    /// Longest a caller waits for a token (0 = fail immediately).
    #[serde(with = "crate::serde_millis")]
    pub max_wait: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10.0,
            burst_size: 20,
            max_wait: Duration::from_secs(5),
        }
    }
}

impl RateLimitConfig {
    pub fn with_requests_per_second(mut self, rps: f64) -> Self {
        self.requests_per_second = rps;
        self
    }

    pub fn with_burst_size(mut self, burst: u64) -> Self {
        self.burst_size = burst;
        self
    }

    pub fn with_max_wait(mut self, wait: Duration) -> Self {
        self.max_wait = wait;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.requests_per_second.is_finite() && self.requests_per_second > 0.0) {
            return Err(EmbeddingError::InvalidConfig(
                "rate_limit.requests_per_second must be a positive number".into(),
            ));
        }
        if self.burst_size == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "rate_limit.burst_size must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_update: Instant,
}

/// Async token bucket.
#[derive(Debug)]
pub struct TokenBucket {
    config: RateLimitConfig,
    state: Mutex<BucketState>,
    total_requests: AtomicU64,
    total_waited: AtomicU64,
    total_rejected: AtomicU64,
}

impl TokenBucket {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(BucketState {
                tokens: config.burst_size as f64,
                last_update: Instant::now(),
            }),
            total_requests: AtomicU64::new(0),
            total_waited: AtomicU64::new(0),
            total_rejected: AtomicU64::new(0),
        }
    }

    /// Refill, then take a token if one is available. On failure returns the
    /// time until the next token.
    fn take(&self) -> std::result::Result<(), Duration> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let now = Instant::now();
        let elapsed = now.duration_since(state.last_update).as_secs_f64();
        state.last_update = now;
        state.tokens = (state.tokens + elapsed * self.config.requests_per_second)
            .min(self.config.burst_size as f64);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            Ok(())
        } else {
            let missing = 1.0 - state.tokens;
            Err(Duration::from_secs_f64(
                missing / self.config.requests_per_second,
            ))
        }
    }

    /// Try to acquire a token without waiting.
    #[cfg(test)]
    pub(crate) fn try_acquire(&self) -> bool {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        match self.take() {
            Ok(()) => true,
            Err(_) => {
                self.total_rejected.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Acquire a token, sleeping up to `max_wait`. Returns false on timeout.
    pub async fn acquire(&self) -> bool {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        let start = Instant::now();
        let mut waited = false;
        loop {
            let wait = match self.take() {
                Ok(()) => {
                    if waited {
                        self.total_waited.fetch_add(1, Ordering::Relaxed);
                    }
                    return true;
                }
                Err(wait) => wait,
            };

            let remaining = self.config.max_wait.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                self.total_rejected.fetch_add(1, Ordering::Relaxed);
                return false;
            }

            waited = true;
            tokio::time::sleep(wait.min(remaining).min(Duration::from_millis(100))).await;
        }
    }

    pub fn stats(&self) -> RateLimitStats {
        let available_tokens = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tokens;
        RateLimitStats {
            available_tokens,
            total_requests: self.total_requests.load(Ordering::Relaxed),
            total_waited: self.total_waited.load(Ordering::Relaxed),
            total_rejected: self.total_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Statistics for rate limiter.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitStats {
    pub available_tokens: f64,
    pub total_requests: u64,
    pub total_waited: u64,
    pub total_rejected: u64,
}

impl RateLimitStats {
    /// Fraction of requests that never got a token.
    pub fn rejection_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.total_rejected as f64 / self.total_requests as f64
        }
    }
}

/// Gates every `embed` call on a token from a shared bucket.
pub struct RateLimitedProvider {
    inner: Arc<dyn EmbeddingProvider>,
    bucket: TokenBucket,
}

impl RateLimitedProvider {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, config: RateLimitConfig) -> Self {
        Self {
            inner,
            bucket: TokenBucket::new(config),
        }
    }

    #[cfg(test)]
    pub(crate) fn stats(&self) -> RateLimitStats {
        self.bucket.stats()
    }
}

#[async_trait]
impl EmbeddingProvider for RateLimitedProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        if !self.bucket.acquire().await {
            let stats = self.bucket.stats();
            debug!(
                provider = self.inner.name(),
                total_requests = stats.total_requests,
                total_rejected = stats.total_rejected,
                rejection_rate = stats.rejection_rate(),
                "client-side rate limit exhausted"
            );
            return Err(EmbeddingError::RateLimited {
                retry_after_secs: None,
            });
        }
        self.inner.embed(text).await
    }
}
