//! Workspace umbrella crate for semdiff.
//!
//! This crate stitches the embedding providers and the batch comparator
//! together so callers can go from configuration to scored records with a
//! single API entry point. The HTTP service lives in the `semdiff-server`
//! crate and is built on the same functions.
//!
//! ```
//! use semdiff::{build_comparator, compare_json, CompareConfig, EmbeddingConfig};
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let comparator = build_comparator(&EmbeddingConfig::stub(64), CompareConfig::default()).unwrap();
//! let body = br#"{"records":[{"id":"1","originalText":"cat","updatedText":"cat"}]}"#;
//!
//! let response = compare_json(&comparator, body).await.unwrap();
//! let results: serde_json::Value = serde_json::from_slice(&response).unwrap();
//! assert_eq!(results[0]["id"], "1");
//! # });
//! ```

pub mod config;

pub use comparator::{
    assembler, cosine_similarity, BatchComparator, BatchSummary, CompareConfig,
    CompareConfigError, ComparedRecord, ComparisonError, ComparisonMetrics,
    ComparisonRequestRecord, ComparisonResultRecord, RecordError, RecordFailure, Side,
    Similarity, ValidationError,
};
pub use config::{ConfigLoadError, PipelineConfig};
pub use embedding::{
    build_provider, Embedding, EmbeddingConfig, EmbeddingError, EmbeddingProvider, ProviderKind,
    RateLimitConfig, RetryConfig, StubEmbedder,
};

use std::error::Error;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

use tracing::info;

/// Errors from building a pipeline or running a raw JSON batch through it.
#[derive(Debug)]
pub enum PipelineError {
    Embedding(EmbeddingError),
    Compare(CompareConfigError),
    Validation(ValidationError),
    Serialize(serde_json::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Embedding(err) => write!(f, "embedding provider: {err}"),
            PipelineError::Compare(err) => write!(f, "comparator: {err}"),
            PipelineError::Validation(err) => write!(f, "invalid request: {err}"),
            PipelineError::Serialize(err) => write!(f, "failed to serialize results: {err}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Embedding(err) => Some(err),
            PipelineError::Compare(err) => Some(err),
            PipelineError::Validation(err) => Some(err),
            PipelineError::Serialize(err) => Some(err),
        }
    }
}

impl From<EmbeddingError> for PipelineError {
    fn from(value: EmbeddingError) -> Self {
        PipelineError::Embedding(value)
    }
}

impl From<CompareConfigError> for PipelineError {
    fn from(value: CompareConfigError) -> Self {
        PipelineError::Compare(value)
    }
}

impl From<ValidationError> for PipelineError {
    fn from(value: ValidationError) -> Self {
        PipelineError::Validation(value)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(value: serde_json::Error) -> Self {
        PipelineError::Serialize(value)
    }
}

/// Install or clear the metrics observer attached to comparators built by
/// [`build_comparator`] from now on.
pub fn set_pipeline_metrics(recorder: Option<Arc<dyn ComparisonMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn ComparisonMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn ComparisonMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn ComparisonMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Build the provider stack described by `embedding` and a comparator on top.
///
/// Fails with the first missing or invalid setting, e.g.
/// `embedding provider: endpoint is required`.
pub fn build_comparator(
    embedding: &EmbeddingConfig,
    compare: CompareConfig,
) -> Result<BatchComparator, PipelineError> {
    let provider = build_provider(embedding)?;
    let mut comparator = BatchComparator::new(provider, compare)?;
    if let Some(recorder) = metrics_recorder() {
        comparator = comparator.with_metrics(recorder);
    }

    info!(
        provider = embedding.provider.as_str(),
        max_concurrency = compare.max_concurrency,
        include_embeddings = compare.include_embeddings,
        "comparison pipeline ready"
    );
    Ok(comparator)
}

/// Compare a batch and convert the outcomes into wire records, in input order.
pub async fn compare_batch(
    comparator: &BatchComparator,
    records: Vec<ComparisonRequestRecord>,
) -> Vec<ComparisonResultRecord> {
    assembler::to_result_records(comparator.compare(records).await)
}

/// Score a single pair of texts.
pub async fn compare_texts(
    comparator: &BatchComparator,
    original: &str,
    updated: &str,
) -> Result<f64, RecordFailure> {
    let record = ComparisonRequestRecord::new("", original, updated);
    comparator
        .compare_record(&record)
        .await
        .map(|similarity| similarity.score)
}

/// Run a raw `{"records": [...]}` body through the comparator and return the
/// serialized result array.
pub async fn compare_json(
    comparator: &BatchComparator,
    body: &[u8],
) -> Result<Vec<u8>, PipelineError> {
    let records = assembler::parse_request(body)?;
    let results = compare_batch(comparator, records).await;
    Ok(assembler::serialize_response(&results)?)
}
