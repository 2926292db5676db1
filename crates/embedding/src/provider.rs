//! The provider seam every embedding backend sits behind.

use async_trait::async_trait;

use crate::error::Result;
use crate::Embedding;

/// A remote (or local) capability turning a string into a fixed-length vector.
///
/// Implementations are immutable after construction and shared behind an
/// `Arc` by concurrently running comparisons. Each `embed` call makes at most
/// one outbound request; nothing is cached and nothing is retried inside the
/// provider itself.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short provider label used in logs and metrics.
    fn name(&self) -> &str;

    /// Length of every vector this provider returns.
    fn dimension(&self) -> usize;

    /// Embed a single text. The empty string is valid input.
    async fn embed(&self, text: &str) -> Result<Embedding>;
}
