use std::sync::Arc;

use async_trait::async_trait;
use semdiff::{
    compare_batch, compare_json, BatchComparator, CompareConfig, ComparisonRequestRecord,
    Embedding, EmbeddingError, EmbeddingProvider, PipelineError, RecordFailure, Side,
    ValidationError,
};

/// Provider whose behaviour is keyed off the input text.
struct Faulty;

#[async_trait]
impl EmbeddingProvider for Faulty {
    fn name(&self) -> &str {
        "faulty"
    }

    fn dimension(&self) -> usize {
        4
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        match text {
            "down" => Err(EmbeddingError::Transport("connection reset by peer".into())),
            "throttled" => Err(EmbeddingError::RateLimited {
                retry_after_secs: Some(2),
            }),
            "zero" => Ok(vec![0.0; 4]),
            "nan" => Ok(vec![f32::NAN, 0.0, 0.0, 1.0]),
            "wide" => Ok(vec![1.0; 8]),
            _ => Ok(vec![1.0, 0.0, 0.0, 0.0]),
        }
    }
}

fn faulty_comparator() -> BatchComparator {
    BatchComparator::new(Arc::new(Faulty), CompareConfig::default()).unwrap()
}

#[tokio::test]
async fn failures_are_isolated_per_record() {
    let comparator = faulty_comparator();
    let records = vec![
        ComparisonRequestRecord::new("ok", "a", "b"),
        ComparisonRequestRecord::new("down", "down", "b"),
        ComparisonRequestRecord::new("throttled", "a", "throttled"),
        ComparisonRequestRecord::new("zero", "zero", "a"),
        ComparisonRequestRecord::new("nan", "a", "nan"),
        ComparisonRequestRecord::new("wide", "a", "wide"),
    ];

    let results = compare_batch(&comparator, records).await;
    let codes: Vec<Option<&str>> = results
        .iter()
        .map(|r| r.error.as_ref().map(|e| e.code.as_str()))
        .collect();

    assert_eq!(
        codes,
        vec![
            None,
            Some("provider_error"),
            Some("provider_rate_limited"),
            Some("zero-norm-embedding"),
            Some("non-finite-embedding"),
            Some("dimension_mismatch"),
        ]
    );
    assert_eq!(results[0].comparison, Some(1.0));
    assert!(results[1..].iter().all(|r| r.comparison.is_none()));
    // Failed records still echo their input.
    assert_eq!(results[1].original_text, "down");
}

#[tokio::test]
async fn provider_failure_names_the_side() {
    let comparator = faulty_comparator();
    let outcome = comparator
        .compare_record(&ComparisonRequestRecord::new("x", "a", "down"))
        .await;

    match outcome {
        Err(RecordFailure::Provider { side, source }) => {
            assert_eq!(side, Side::Updated);
            assert!(source.is_retryable());
        }
        other => panic!("expected provider failure, got {other:?}"),
    }
}

async fn validation_error(body: &[u8]) -> ValidationError {
    match compare_json(&faulty_comparator(), body).await {
        Err(PipelineError::Validation(err)) => err,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_bodies_are_rejected() {
    assert!(matches!(
        validation_error(b"not json").await,
        ValidationError::NotJson(_)
    ));
    assert_eq!(validation_error(b"[1,2]").await, ValidationError::NotAnObject);
    assert_eq!(validation_error(b"{}").await, ValidationError::MissingRecords);
    assert_eq!(
        validation_error(br#"{"records":{}}"#).await,
        ValidationError::RecordsNotArray
    );
    assert_eq!(
        validation_error(br#"{"records":[1]}"#).await,
        ValidationError::RecordNotObject { index: 0 }
    );

    let missing = validation_error(br#"{"records":[{"id":"1","originalText":"a"}]}"#).await;
    assert_eq!(missing.to_string(), "records[0].updatedText is required");

    let wrong_type =
        validation_error(br#"{"records":[{"id":1,"originalText":"a","updatedText":"b"}]}"#).await;
    assert_eq!(wrong_type.to_string(), "records[0].id must be a string");
}
