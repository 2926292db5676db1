//! semdiff embedding providers
//!
//! Turns a string into a fixed-length vector by calling out to an embedding
//! service. Everything that talks to a provider goes through the
//! [`EmbeddingProvider`] trait, so the comparison engine never knows which
//! backend it is using.
//!
//! Backends:
//!
//! - **Azure OpenAI** - `POST {endpoint}/openai/deployments/{deployment}/embeddings?api-version=...`
//!   with an `api-key` header. This is the default.
//! - **OpenAI** - any OpenAI-compatible `/embeddings` endpoint, bearer auth.
//! - **Custom** - plain `{"text": ...}` POST to a URL of your choosing.
//! - **Stub** - deterministic bag-of-words hashing, no network. Handy for tests
//!   and benches.
//!
//! Retry and client-side rate limiting are opt-in wrappers (see
//! [`resilience`]); [`build_provider`] stacks them for you from config.
//!
//! ## Quick example
//!
//! ```
//! use embedding::{build_provider, EmbeddingConfig};
//!
//! # tokio_test_block_on(async {
//! let provider = build_provider(&EmbeddingConfig::stub(32)).unwrap();
//! let vector = provider.embed("The cat sat on the mat.").await.unwrap();
//! assert_eq!(vector.len(), 32);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

pub mod config;
pub mod error;
pub mod provider;
pub mod resilience;
mod serde_millis;

mod api;
mod normalize;
mod stub;

use std::sync::Arc;

use tracing::info;

pub use api::ApiEmbedder;
pub use config::{default_dimension, EmbeddingConfig, ProviderKind};
pub use error::{EmbeddingError, Result};
pub use provider::EmbeddingProvider;
pub use resilience::{RateLimitConfig, RateLimitedProvider, RetryConfig, RetryingProvider};
pub use stub::StubEmbedder;

/// A dense embedding vector.
pub type Embedding = Vec<f32>;

/// Build the configured provider, wrapped in rate limiting and retry when
/// those sections are present.
///
/// The retry layer sits outermost so every retry attempt also waits for a
/// rate-limit token.
pub fn build_provider(cfg: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    cfg.validate()?;

    let mut provider: Arc<dyn EmbeddingProvider> = match cfg.provider {
        ProviderKind::Stub => Arc::new(StubEmbedder::new(cfg.resolved_dimension()?)),
        _ => Arc::new(ApiEmbedder::new(cfg)?),
    };

    if let Some(rate_limit) = cfg.rate_limit {
        provider = Arc::new(RateLimitedProvider::new(provider, rate_limit));
    }
    if let Some(retry) = cfg.retry.filter(|r| r.max_retries > 0) {
        provider = Arc::new(RetryingProvider::new(provider, retry));
    }

    info!(
        provider = provider.name(),
        dimension = provider.dimension(),
        retry = cfg.retry.is_some(),
        rate_limit = cfg.rate_limit.is_some(),
        "embedding provider ready"
    );
    Ok(provider)
}
