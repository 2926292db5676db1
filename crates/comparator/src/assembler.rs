//! Wire format: request validation and response assembly.

use serde_json::{Map, Value};

use crate::error::{MethodNotSupported, ValidationError};
use crate::types::{ComparedRecord, ComparisonRequestRecord, ComparisonResultRecord, RecordError};

/// Only POST carries a batch.
pub fn accept_method(method: &str) -> Result<(), MethodNotSupported> {
    if method.eq_ignore_ascii_case("POST") {
        Ok(())
    } else {
        Err(MethodNotSupported {
            method: method.to_string(),
        })
    }
}

/// Parse and validate a `{"records": [...]}` body.
///
/// Every record must be an object with non-null string `id`, `originalText`
/// and `updatedText`; unknown fields are ignored. The first problem found is
/// reported with the record index and field name.
pub fn parse_request(body: &[u8]) -> Result<Vec<ComparisonRequestRecord>, ValidationError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ValidationError::NotJson(e.to_string()))?;

    let Value::Object(mut root) = value else {
        return Err(ValidationError::NotAnObject);
    };
    let records = match root.remove("records") {
        None => return Err(ValidationError::MissingRecords),
        Some(Value::Array(records)) => records,
        Some(_) => return Err(ValidationError::RecordsNotArray),
    };

    records
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(mut fields) => Ok(ComparisonRequestRecord {
                id: take_string(&mut fields, index, "id")?,
                original_text: take_string(&mut fields, index, "originalText")?,
                updated_text: take_string(&mut fields, index, "updatedText")?,
            }),
            _ => Err(ValidationError::RecordNotObject { index }),
        })
        .collect()
}

fn take_string(
    fields: &mut Map<String, Value>,
    index: usize,
    field: &'static str,
) -> Result<String, ValidationError> {
    let invalid = |reason| ValidationError::InvalidField {
        index,
        field,
        reason,
    };
    match fields.remove(field) {
        Some(Value::String(s)) => Ok(s),
        Some(Value::Null) => Err(invalid("must not be null")),
        Some(_) => Err(invalid("must be a string")),
        None => Err(invalid("is required")),
    }
}

/// Turn engine outcomes into wire records, preserving order.
pub fn to_result_records(results: Vec<ComparedRecord>) -> Vec<ComparisonResultRecord> {
    results
        .into_iter()
        .map(|ComparedRecord { record, outcome }| {
            let mut out = ComparisonResultRecord {
                id: record.id,
                comparison: None,
                original_text: record.original_text,
                updated_text: record.updated_text,
                original_embedding: None,
                updated_embedding: None,
                error: None,
            };
            match outcome {
                Ok(similarity) => {
                    out.comparison = Some(similarity.score);
                    if let Some((original, updated)) = similarity.embeddings {
                        out.original_embedding = Some(original);
                        out.updated_embedding = Some(updated);
                    }
                }
                Err(failure) => out.error = Some(RecordError::from(&failure)),
            }
            out
        })
        .collect()
}

/// Serialize results as a bare JSON array.
pub fn serialize_response(results: &[ComparisonResultRecord]) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(results)
}
