//! semdiff server - HTTP API for batch semantic text comparison
//!
//! Exposes the `comparator` engine over HTTP. Callers POST a batch of
//! `{id, originalText, updatedText}` records and get back one cosine
//! similarity score per record.
//!
//! # Features
//!
//! - **Function keys**: optional key auth with a per-key rate limit
//! - **Middleware**: CORS, request ID tracking, structured logging, timeouts
//! - **Configuration**: `.env`, optional `server.toml` and `SEMDIFF__*` environment variables
//! - **Metrics**: Prometheus text format on `/metrics`
//! - **Graceful Shutdown**: SIGTERM and Ctrl+C
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! ## Public Endpoints (No Authentication)
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe (503 until the provider is configured)
//! - `GET /metrics` - Prometheus metrics
//!
//! ## Comparison Endpoints (Function Key Required When Configured)
//!
//! - `POST /api/generateReport` - Compare a batch of records
//! - `POST /api/v1/compare` - Same, versioned path

pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, init_tracing, start_server};
pub use state::{Pipeline, ServerState};
