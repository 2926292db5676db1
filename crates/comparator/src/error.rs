use embedding::EmbeddingError;
use thiserror::Error;

use crate::types::Side;

/// Failures of the similarity computation itself.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ComparisonError {
    /// The two embeddings have different lengths. Indicates a provider bug.
    #[error("embedding dimensions differ ({left} vs {right})")]
    DimensionMismatch { left: usize, right: usize },
    /// At least one embedding is the zero vector, so the angle is undefined.
    #[error("cosine similarity is undefined for a zero-norm embedding")]
    ZeroNorm,
    /// An embedding contains NaN or an infinity.
    #[error("embedding contains non-finite values")]
    NonFinite,
}

impl ComparisonError {
    pub fn code(&self) -> &'static str {
        match self {
            ComparisonError::DimensionMismatch { .. } => "dimension_mismatch",
            ComparisonError::ZeroNorm => "zero-norm-embedding",
            ComparisonError::NonFinite => "non-finite-embedding",
        }
    }
}

/// Why a single record has no `comparison` value.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RecordFailure {
    #[error("failed to embed {side} text: {source}")]
    Provider {
        side: Side,
        #[source]
        source: EmbeddingError,
    },
    #[error(transparent)]
    Comparison(#[from] ComparisonError),
}

impl RecordFailure {
    /// Stable code reported in the record's `error.code`.
    pub fn code(&self) -> &'static str {
        match self {
            RecordFailure::Provider { source, .. } => source.code(),
            RecordFailure::Comparison(err) => err.code(),
        }
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, RecordFailure::Provider { .. })
    }

    /// The provider itself was unreachable, throttling or failing (transport,
    /// 429, 5xx). Rejections of a particular text are not outages.
    pub fn is_outage(&self) -> bool {
        match self {
            RecordFailure::Provider { source, .. } => source.is_retryable(),
            RecordFailure::Comparison(_) => false,
        }
    }
}

/// Metrics/log label for one record's outcome: `"ok"` or the failure code.
pub fn outcome_label<T>(outcome: &Result<T, RecordFailure>) -> &'static str {
    match outcome {
        Ok(_) => "ok",
        Err(failure) => failure.code(),
    }
}

/// The request body is not a well-formed comparison batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("request body is not valid JSON: {0}")]
    NotJson(String),
    #[error("request body must be a JSON object")]
    NotAnObject,
    #[error("request body is missing the `records` field")]
    MissingRecords,
    #[error("`records` must be an array")]
    RecordsNotArray,
    #[error("records[{index}] must be an object")]
    RecordNotObject { index: usize },
    #[error("records[{index}].{field} {reason}")]
    InvalidField {
        index: usize,
        field: &'static str,
        reason: &'static str,
    },
}

/// Raised for any verb other than POST, before the body is read.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("method {method} is not supported; use POST")]
pub struct MethodNotSupported {
    pub method: String,
}

/// Invalid [`CompareConfig`](crate::CompareConfig).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid compare config: {0}")]
pub struct CompareConfigError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_failure_codes() {
        let provider = RecordFailure::Provider {
            side: Side::Updated,
            source: EmbeddingError::Authentication { status: 403 },
        };
        assert_eq!(provider.code(), "provider_auth_failed");
        assert!(provider.is_provider());
        assert!(!provider.is_outage());
        assert_eq!(
            provider.to_string(),
            "failed to embed updated text: embedding provider rejected credentials (HTTP 403)"
        );

        let zero: RecordFailure = ComparisonError::ZeroNorm.into();
        assert_eq!(zero.code(), "zero-norm-embedding");
        assert!(!zero.is_provider());
        assert!(!zero.is_outage());
        assert_eq!(outcome_label(&Err::<(), _>(zero)), "zero-norm-embedding");
        assert_eq!(outcome_label(&Ok::<_, RecordFailure>(())), "ok");

        let throttled = RecordFailure::Provider {
            side: Side::Original,
            source: EmbeddingError::RateLimited { retry_after_secs: Some(2) },
        };
        assert!(throttled.is_outage());
    }

    #[test]
    fn validation_messages_name_index_and_field() {
        let err = ValidationError::InvalidField {
            index: 3,
            field: "updatedText",
            reason: "must be a string",
        };
        assert_eq!(err.to_string(), "records[3].updatedText must be a string");
    }
}
