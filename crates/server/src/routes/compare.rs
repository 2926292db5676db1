use crate::error::{ServerError, ServerResult};
use crate::state::{Pipeline, ServerState};
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use comparator::{assembler, BatchSummary};
use std::sync::Arc;

/// Compare a batch of original/updated text pairs.
///
/// Served on `POST /api/generateReport` and `POST /api/v1/compare`.
///
/// # Example
/// ```json
/// // Request
/// { "records": [ { "id": "1", "originalText": "cat", "updatedText": "cat" } ] }
///
/// // Response
/// [ { "id": "1", "comparison": 1.0, "originalText": "cat", "updatedText": "cat" } ]
/// ```
///
/// Records that fail carry an `error` object instead of `comparison`. When
/// every record of a non-empty batch fails because the embedding provider is
/// unavailable (transport error, 429, 5xx) the whole request is answered with
/// 502. Texts the provider rejects are reported inline.
pub async fn generate_report(
    State(state): State<Arc<ServerState>>,
    body: Result<Bytes, BytesRejection>,
) -> ServerResult<Response> {
    let comparator = match &state.pipeline {
        Pipeline::Ready(comparator) => comparator.clone(),
        Pipeline::Unconfigured(message) => return Err(ServerError::Config(message.clone())),
    };

    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge(state.config.max_body_size_mb)
        } else {
            ServerError::BadRequest(rejection.body_text())
        }
    })?;

    let records = assembler::parse_request(&body)?;
    let results = comparator.compare(records).await;

    let summary = BatchSummary::from_results(&results);
    if summary.is_provider_outage() {
        let reason = results
            .iter()
            .find_map(|r| r.outcome.as_ref().err())
            .map(|failure| failure.to_string())
            .unwrap_or_default();
        tracing::error!(records = summary.total, error = %reason, "embedding provider unavailable for every record");
        return Err(ServerError::ProviderUnavailable(reason));
    }

    tracing::info!(
        records = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed(),
        "batch compared"
    );

    let payload = assembler::serialize_response(&assembler::to_result_records(results))?;
    Ok(([(CONTENT_TYPE, "application/json")], payload).into_response())
}

/// Any verb other than POST on a comparison route. The body is never read.
pub async fn method_not_supported(method: Method) -> ServerError {
    match assembler::accept_method(method.as_str()) {
        Err(err) => err.into(),
        // Only reachable if POST were routed here by mistake.
        Ok(()) => ServerError::Internal("POST routed to the method fallback".to_string()),
    }
}
