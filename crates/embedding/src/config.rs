use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{EmbeddingError, Result};
use crate::resilience::{RateLimitConfig, RetryConfig};

/// Which remote API shape the adapter speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Azure OpenAI deployment: `{endpoint}/openai/deployments/{deployment}/embeddings?api-version=...`
    /// authenticated with an `api-key` header.
    #[default]
    AzureOpenai,
    /// OpenAI-compatible `/embeddings` endpoint with a bearer token.
    Openai,
    /// Any endpoint accepting `{"text": ...}`; `api_key` is sent verbatim as `Authorization`.
    Custom,
    /// Deterministic offline embedder, no network.
    Stub,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::AzureOpenai => "azure_openai",
            ProviderKind::Openai => "openai",
            ProviderKind::Custom => "custom",
            ProviderKind::Stub => "stub",
        }
    }
}

/// Everything needed to construct an embedding provider once at start-up.
///
/// # Example
/// ```
/// use embedding::{EmbeddingConfig, ProviderKind};
///
/// let cfg = EmbeddingConfig {
///     provider: ProviderKind::AzureOpenai,
///     endpoint: Some("https://my-resource.openai.azure.com".into()),
///     api_version: Some("2023-05-15".into()),
///     api_key: Some("secret".into()),
///     ..Default::default()
/// };
///
/// assert!(cfg.validate().is_ok());
/// assert_eq!(cfg.resolved_dimension().unwrap(), 1536);
/// ```
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Remote API flavour.
    pub provider: ProviderKind,
    /// Base URL of the provider (Azure resource URL, OpenAI base URL, or full custom URL).
    pub endpoint: Option<String>,
    /// Azure OpenAI `api-version` query parameter.
    pub api_version: Option<String>,
    /// Credential; never logged.
    pub api_key: Option<String>,
    /// Azure deployment name.
    pub deployment: String,
    /// Model name sent to OpenAI-compatible providers; also used to look up
    /// the default dimensionality.
    pub model: String,
    /// Fixed output dimensionality. Falls back to the model's known size.
    pub dimensions: Option<usize>,
    /// Whole-request timeout for a single embedding call.
    pub timeout_secs: u64,
    /// TCP/TLS connect timeout.
    pub connect_timeout_secs: u64,
    /// Optional caller-side retry layer. Absent or `max_retries = 0` disables it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
    /// Optional client-side token bucket in front of the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            endpoint: None,
            api_version: None,
            api_key: None,
            deployment: "ada-embedding-002".into(),
            model: "text-embedding-ada-002".into(),
            dimensions: None,
            timeout_secs: 30,
            connect_timeout_secs: 10,
            retry: None,
            rate_limit: None,
        }
    }
}

// Hand-written so the credential never ends up in logs.
impl fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("deployment", &self.deployment)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("retry", &self.retry)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

/// Known output sizes of common embedding models.
pub fn default_dimension(model: &str) -> Option<usize> {
    match model {
        "text-embedding-ada-002" | "text-embedding-3-small" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

impl EmbeddingConfig {
    /// Offline configuration backed by the deterministic stub embedder.
    pub fn stub(dimensions: usize) -> Self {
        Self {
            provider: ProviderKind::Stub,
            dimensions: Some(dimensions),
            ..Default::default()
        }
    }

    /// Check that every field the selected provider needs is present.
    pub fn validate(&self) -> Result<()> {
        match self.provider {
            ProviderKind::AzureOpenai => {
                require(&self.endpoint, "endpoint")?;
                require(&self.api_version, "api_version")?;
                require(&self.api_key, "api_key")?;
                if self.deployment.trim().is_empty() {
                    return Err(EmbeddingError::InvalidConfig(
                        "deployment is required for azure_openai".into(),
                    ));
                }
            }
            ProviderKind::Openai => {
                require(&self.api_key, "api_key")?;
            }
            ProviderKind::Custom => {
                require(&self.endpoint, "endpoint")?;
            }
            ProviderKind::Stub => {}
        }

        if self.provider != ProviderKind::Stub && self.timeout_secs == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "timeout_secs must be > 0".into(),
            ));
        }
        if let Some(rate_limit) = &self.rate_limit {
            rate_limit.validate()?;
        }

        self.resolved_dimension().map(|_| ())
    }

    /// Dimensionality every embedding from this provider must have.
    pub fn resolved_dimension(&self) -> Result<usize> {
        match self.dimensions {
            Some(0) => Err(EmbeddingError::InvalidConfig(
                "dimensions must be > 0".into(),
            )),
            Some(dim) => Ok(dim),
            None => default_dimension(&self.model).ok_or_else(|| {
                EmbeddingError::InvalidConfig(format!(
                    "unknown model '{}': set `dimensions` explicitly",
                    self.model
                ))
            }),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn require(value: &Option<String>, field: &str) -> Result<()> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(()),
        _ => Err(EmbeddingError::InvalidConfig(format!("{field} is required"))),
    }
}
