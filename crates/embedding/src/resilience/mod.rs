//! Caller-side resilience layers: rate limiting and retry with backoff.
//!
//! Both wrap an existing [`EmbeddingProvider`](crate::EmbeddingProvider) and
//! leave the adapter underneath untouched, so the adapter keeps its
//! one-call-per-embed contract.

mod rate_limit;
mod retry;

pub use rate_limit::{RateLimitConfig, RateLimitStats, RateLimitedProvider, TokenBucket};
pub use retry::{RetryConfig, RetryingProvider};
