//! # semdiff comparator (`comparator`)
//!
//! The batch comparison core. Given records of `{id, originalText,
//! updatedText}`, it embeds both texts of every record through an
//! [`EmbeddingProvider`](embedding::EmbeddingProvider), scores them with
//! cosine similarity and hands back one result per record, in input order.
//!
//! ## Modules
//!
//! - [`similarity`]: [`cosine_similarity`] with typed failures for zero-norm,
//!   non-finite and mismatched vectors.
//! - [`engine`]: [`BatchComparator`], bounded-concurrency fan-out with
//!   per-record failure isolation.
//! - [`assembler`]: request validation and response serialization for the
//!   `{"records": [...]}` wire format.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use comparator::{assembler, BatchComparator, CompareConfig};
//! use embedding::StubEmbedder;
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let body = br#"{"records":[{"id":"1","originalText":"cat","updatedText":"cat"}]}"#;
//! let records = assembler::parse_request(body).unwrap();
//!
//! let engine = BatchComparator::new(Arc::new(StubEmbedder::new(64)), CompareConfig::default()).unwrap();
//! let results = assembler::to_result_records(engine.compare(records).await);
//!
//! assert!((results[0].comparison.unwrap() - 1.0).abs() < 1e-6);
//! # });
//! ```

pub mod assembler;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod similarity;
pub mod types;

pub use config::CompareConfig;
pub use engine::BatchComparator;
pub use error::{
    CompareConfigError, ComparisonError, MethodNotSupported, RecordFailure, ValidationError,
};
pub use metrics::ComparisonMetrics;
pub use similarity::cosine_similarity;
pub use types::{
    BatchSummary, ComparedRecord, ComparisonRequestRecord, ComparisonResultRecord, RecordError,
    Side, Similarity,
};
