use std::sync::Arc;
use std::time::Instant;

use embedding::{Embedding, EmbeddingProvider};
use futures::stream::{self, StreamExt};
use tracing::{debug, error, warn};

use crate::config::CompareConfig;
use crate::error::{outcome_label, CompareConfigError, ComparisonError, RecordFailure};
use crate::metrics::ComparisonMetrics;
use crate::similarity::cosine_similarity;
use crate::types::{ComparedRecord, ComparisonRequestRecord, Side, Similarity};


/// Runs a batch of records through the embedding provider and the similarity
/// engine.
///
/// Each record is independent: a failure only marks that record. Up to
/// `max_concurrency` records are in flight at once and results come back in
/// input order. Dropping the future returned by [`compare`](Self::compare)
/// drops every in-flight provider call.
pub struct BatchComparator {
    provider: Arc<dyn EmbeddingProvider>,
    config: CompareConfig,
    metrics: Option<Arc<dyn ComparisonMetrics>>,
}

impl BatchComparator {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        config: CompareConfig,
    ) -> Result<Self, CompareConfigError> {
        config.validate()?;
        Ok(Self {
            provider,
            config,
            metrics: None,
        })
    }

    /// Attach a metrics observer.
    pub fn with_metrics(mut self, metrics: Arc<dyn ComparisonMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// Compare every record. The output has one entry per input, same order.
    pub async fn compare(&self, records: Vec<ComparisonRequestRecord>) -> Vec<ComparedRecord> {
        let started = Instant::now();
        let size = records.len();

        let mut indexed: Vec<(usize, ComparedRecord)> = stream::iter(records.into_iter().enumerate())
            .map(|(index, record)| async move {
                let outcome = self.compare_one(index, &record).await;
                if let Some(metrics) = &self.metrics {
                    metrics.record_outcome(outcome_label(&outcome));
                }
                (index, ComparedRecord { record, outcome })
            })
            .buffer_unordered(self.config.max_concurrency)
            .collect()
            .await;

        indexed.sort_unstable_by_key(|(index, _)| *index);

        let elapsed = started.elapsed();
        if let Some(metrics) = &self.metrics {
            metrics.record_batch(size, elapsed);
        }
        debug!(
            records = size,
            provider = self.provider.name(),
            duration_ms = elapsed.as_millis() as u64,
            "batch compared"
        );

        indexed.into_iter().map(|(_, result)| result).collect()
    }

    /// Compare a single record outside of a batch.
    pub async fn compare_record(
        &self,
        record: &ComparisonRequestRecord,
    ) -> Result<Similarity, RecordFailure> {
        let outcome = self.compare_one(0, record).await;
        if let Some(metrics) = &self.metrics {
            metrics.record_outcome(outcome_label(&outcome));
        }
        outcome
    }

    async fn compare_one(
        &self,
        index: usize,
        record: &ComparisonRequestRecord,
    ) -> Result<Similarity, RecordFailure> {
        let original = self.embed_side(index, record, Side::Original).await?;
        let updated = self.embed_side(index, record, Side::Updated).await?;

        let score = cosine_similarity(&original, &updated).map_err(|err| {
            match err {
                ComparisonError::DimensionMismatch { .. } => error!(
                    record_id = %record.id,
                    index,
                    provider = self.provider.name(),
                    error = %err,
                    "provider returned embeddings of different lengths"
                ),
                _ => warn!(record_id = %record.id, index, error = %err, "similarity undefined"),
            }
            RecordFailure::Comparison(err)
        })?;

        let embeddings = self.config.include_embeddings.then(|| (original, updated));
        Ok(Similarity { score, embeddings })
    }

    async fn embed_side(
        &self,
        index: usize,
        record: &ComparisonRequestRecord,
        side: Side,
    ) -> Result<Embedding, RecordFailure> {
        let text = match side {
            Side::Original => &record.original_text,
            Side::Updated => &record.updated_text,
        };

        let started = Instant::now();
        let result = self.provider.embed(text).await;
        if let Some(metrics) = &self.metrics {
            metrics.record_embedding(side, started.elapsed(), result.is_ok());
        }

        result.map_err(|source| {
            warn!(
                record_id = %record.id,
                index,
                side = side.as_str(),
                provider = self.provider.name(),
                code = source.code(),
                error = %source,
                "embedding failed"
            );
            RecordFailure::Provider { side, source }
        })
    }
}
