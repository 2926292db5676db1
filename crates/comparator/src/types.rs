use std::fmt;

use embedding::Embedding;
use serde::{Deserialize, Serialize};

use crate::error::{outcome_label, RecordFailure};

/// One input pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRequestRecord {
    /// Opaque caller identifier, echoed back. Uniqueness is not enforced.
    pub id: String,
    pub original_text: String,
    pub updated_text: String,
}

impl ComparisonRequestRecord {
    pub fn new(
        id: impl Into<String>,
        original_text: impl Into<String>,
        updated_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            original_text: original_text.into(),
            updated_text: updated_text.into(),
        }
    }
}

/// One output entry, as serialized on the wire.
///
/// Exactly one of `comparison` and `error` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResultRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<f64>,
    pub original_text: String,
    pub updated_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_embedding: Option<Embedding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_embedding: Option<Embedding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RecordError>,
}

/// Inline per-record error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordError {
    pub code: String,
    pub message: String,
}

impl From<&RecordFailure> for RecordError {
    fn from(failure: &RecordFailure) -> Self {
        Self {
            code: failure.code().to_string(),
            message: failure.to_string(),
        }
    }
}

/// Which text of a record is being embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Original,
    Updated,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Original => "original",
            Side::Updated => "updated",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful comparison of one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Similarity {
    /// Cosine similarity in [-1, 1].
    pub score: f64,
    /// `(original, updated)`, kept only when the comparator is configured to
    /// return embeddings.
    pub embeddings: Option<(Embedding, Embedding)>,
}

/// A request record paired with its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparedRecord {
    pub record: ComparisonRequestRecord,
    pub outcome: Result<Similarity, RecordFailure>,
}

impl ComparedRecord {
    pub fn score(&self) -> Option<f64> {
        self.outcome.as_ref().ok().map(|s| s.score)
    }

    pub fn outcome_label(&self) -> &'static str {
        outcome_label(&self.outcome)
    }
}

/// Aggregate view of a processed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub provider_failures: usize,
    /// Provider failures caused by an unavailable provider rather than by the text.
    pub provider_outages: usize,
    pub comparison_failures: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[ComparedRecord]) -> Self {
        results.iter().fold(
            BatchSummary {
                total: results.len(),
                ..Default::default()
            },
            |mut summary, result| {
                match &result.outcome {
                    Ok(_) => summary.succeeded += 1,
                    Err(failure) if failure.is_provider() => {
                        summary.provider_failures += 1;
                        if failure.is_outage() {
                            summary.provider_outages += 1;
                        }
                    }
                    Err(_) => summary.comparison_failures += 1,
                }
                summary
            },
        )
    }

    pub fn failed(&self) -> usize {
        self.provider_failures + self.comparison_failures
    }

    /// Every record of a non-empty batch failed because the provider was
    /// unavailable. Per-text rejections (4xx, auth, malformed output) never
    /// count, so those batches are answered with inline errors.
    pub fn is_provider_outage(&self) -> bool {
        self.total > 0 && self.provider_outages == self.total
    }
}
