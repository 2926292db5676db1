use semdiff::{
    compare_batch, compare_json, BatchComparator, ComparisonRequestRecord, PipelineConfig,
    PipelineError,
};
use serde_json::Value;

fn pipeline() -> Result<BatchComparator, PipelineError> {
    let config = PipelineConfig::from_yaml(
        r#"
version: "1.0"
name: "integration"
embedding:
  provider: stub
  dimensions: 128
compare:
  max_concurrency: 4
"#,
    )
    .expect("valid yaml");
    config.build_pipeline()
}

#[tokio::test]
async fn yaml_pipeline_scores_a_revision_batch() -> Result<(), PipelineError> {
    let comparator = pipeline()?;
    let records = vec![
        ComparisonRequestRecord::new(
            "unchanged",
            "The tenant shall pay rent on the first day of each month.",
            "The tenant shall pay rent on the first day of each month.",
        ),
        ComparisonRequestRecord::new(
            "reworded",
            "The tenant shall pay rent on the first day of each month.",
            "Rent is due from the tenant on the first day of every month.",
        ),
        ComparisonRequestRecord::new(
            "rewritten",
            "The tenant shall pay rent on the first day of each month.",
            "Quarterly dividends are distributed to shareholders.",
        ),
    ];

    let results = compare_batch(&comparator, records).await;

    assert_eq!(results.len(), 3, "one result per input record");
    let scores: Vec<f64> = results
        .iter()
        .map(|r| r.comparison.expect("stub never fails"))
        .collect();
    assert!((scores[0] - 1.0).abs() < 1e-6, "identical text should score 1");
    assert!(
        scores[1] > scores[2],
        "a rewording should stay closer than an unrelated rewrite"
    );
    for result in &results {
        assert!(result.error.is_none());
        assert!(result.original_embedding.is_none());
    }

    Ok(())
}

#[tokio::test]
async fn raw_json_round_trip_matches_wire_format() -> Result<(), PipelineError> {
    let comparator = pipeline()?;
    let body = br#"{"records":[
        {"id":"7","originalText":"cat","updatedText":"cat"},
        {"id":"8","originalText":"","updatedText":""}
    ]}"#;

    let response = compare_json(&comparator, body).await?;
    let value: Value = serde_json::from_slice(&response).expect("valid json");

    let array = value.as_array().expect("bare array");
    assert_eq!(array.len(), 2);
    assert_eq!(array[0]["id"], "7");
    assert_eq!(array[0]["originalText"], "cat");
    assert_eq!(array[0]["updatedText"], "cat");
    assert!(array[1]["comparison"].is_number(), "empty strings still score");

    Ok(())
}

#[tokio::test]
async fn empty_batch_yields_empty_array() -> Result<(), PipelineError> {
    let comparator = pipeline()?;
    let response = compare_json(&comparator, br#"{"records":[]}"#).await?;
    assert_eq!(response, b"[]");
    Ok(())
}
