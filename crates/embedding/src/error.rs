use thiserror::Error;

/// Result alias used across the embedding crate.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors surfaced by embedding providers and their wrappers.
///
/// Everything except [`InvalidConfig`](EmbeddingError::InvalidConfig) is a
/// provider failure scoped to a single `embed` call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmbeddingError {
    /// Configuration is incomplete or inconsistent (missing endpoint, key, dimension...).
    #[error("invalid embedding config: {0}")]
    InvalidConfig(String),
    /// The request never produced an HTTP response (DNS, TLS, connect, timeout).
    #[error("embedding request failed: {0}")]
    Transport(String),
    /// The provider rejected the credentials (HTTP 401/403).
    #[error("embedding provider rejected credentials (HTTP {status})")]
    Authentication { status: u16 },
    /// The provider (or the local token bucket) refused the request.
    #[error("embedding provider rate limited the request{}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },
    /// Any other non-success HTTP status.
    #[error("embedding provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    /// The provider answered 2xx but the payload was not a usable embedding.
    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    retry_after_secs
        .map(|secs| format!(", retry after {secs}s"))
        .unwrap_or_default()
}

impl EmbeddingError {
    /// Whether a caller-side retry layer may try the same call again.
    ///
    /// Transport failures, throttling and 5xx answers are transient; auth,
    /// 4xx and malformed payloads will fail the same way next time.
    pub fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::Transport(_) | EmbeddingError::RateLimited { .. } => true,
            EmbeddingError::Api { status, .. } => *status >= 500 || *status == 408,
            EmbeddingError::InvalidConfig(_)
            | EmbeddingError::Authentication { .. }
            | EmbeddingError::MalformedResponse(_) => false,
        }
    }

    /// Stable machine-readable code, reported inline for failed records.
    pub fn code(&self) -> &'static str {
        match self {
            EmbeddingError::InvalidConfig(_) => "provider_not_configured",
            EmbeddingError::Transport(_) | EmbeddingError::Api { .. } => "provider_error",
            EmbeddingError::Authentication { .. } => "provider_auth_failed",
            EmbeddingError::RateLimited { .. } => "provider_rate_limited",
            EmbeddingError::MalformedResponse(_) => "provider_malformed_response",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_rate_limited_mentions_retry_after() {
        let err = EmbeddingError::RateLimited {
            retry_after_secs: Some(12),
        };
        assert!(err.to_string().contains("retry after 12s"));

        let bare = EmbeddingError::RateLimited {
            retry_after_secs: None,
        };
        assert_eq!(
            bare.to_string(),
            "embedding provider rate limited the request"
        );
    }

    #[test]
    fn error_api_includes_status_and_body() {
        let err = EmbeddingError::Api {
            status: 500,
            body: "upstream exploded".into(),
        };
        assert!(err.to_string().contains("HTTP 500"));
        assert!(err.to_string().contains("upstream exploded"));
    }

    #[test]
    fn retryable_classification() {
        assert!(EmbeddingError::Transport("connection reset".into()).is_retryable());
        assert!(EmbeddingError::RateLimited {
            retry_after_secs: None
        }
        .is_retryable());
        assert!(EmbeddingError::Api {
            status: 503,
            body: String::new()
        }
        .is_retryable());

        assert!(!EmbeddingError::Authentication { status: 401 }.is_retryable());
        assert!(!EmbeddingError::Api {
            status: 400,
            body: String::new()
        }
        .is_retryable());
        assert!(!EmbeddingError::MalformedResponse("no data".into()).is_retryable());
        assert!(!EmbeddingError::InvalidConfig("missing key".into()).is_retryable());
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            EmbeddingError::Authentication { status: 403 }.code(),
            "provider_auth_failed"
        );
        assert_eq!(
            EmbeddingError::MalformedResponse("x".into()).code(),
            "provider_malformed_response"
        );
        assert_eq!(
            EmbeddingError::Transport("x".into()).code(),
            "provider_error"
        );
    }
}
