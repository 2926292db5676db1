use async_trait::async_trait;
use reqwest::header::{HeaderMap, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::{EmbeddingConfig, ProviderKind};
use crate::error::{EmbeddingError, Result};
use crate::provider::EmbeddingProvider;
use crate::Embedding;

const OPENAI_DEFAULT_BASE: &str = "https://api.openai.com/v1";
const MAX_ERROR_BODY: usize = 512;

/// HTTP adapter for Azure OpenAI, OpenAI-compatible and custom endpoints.
///
/// Holds a single pooled [`reqwest::Client`] for the life of the process.
/// One `embed` call is exactly one POST.
#[derive(Debug)]
pub struct ApiEmbedder {
    client: Client,
    kind: ProviderKind,
    url: String,
    api_version: Option<String>,
    api_key: Option<String>,
    model: String,
    dimension: usize,
}

impl ApiEmbedder {
    /// Validate `cfg` and build the HTTP client.
    pub fn new(cfg: &EmbeddingConfig) -> Result<Self> {
        cfg.validate()?;
        if cfg.provider == ProviderKind::Stub {
            return Err(EmbeddingError::InvalidConfig(
                "stub provider has no HTTP endpoint".into(),
            ));
        }

        let client = Client::builder()
            .timeout(cfg.timeout())
            .connect_timeout(cfg.connect_timeout())
            .pool_max_idle_per_host(32)
            .build()
            .map_err(|e| EmbeddingError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            kind: cfg.provider,
            url: request_url(cfg),
            api_version: cfg.api_version.clone(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            dimension: cfg.resolved_dimension()?,
        })
    }

    /// Fully-qualified URL every request is posted to (without query string).
    #[cfg(test)]
    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    fn build_request(&self, text: &str) -> RequestBuilder {
        let request = self.client.post(&self.url);
        match self.kind {
            ProviderKind::AzureOpenai => {
                let mut request = request.json(&json!({ "input": text }));
                if let Some(version) = &self.api_version {
                    request = request.query(&[("api-version", version.as_str())]);
                }
                if let Some(key) = &self.api_key {
                    request = request.header("api-key", key);
                }
                request
            }
            ProviderKind::Openai => {
                let request = request.json(&json!({ "input": text, "model": self.model }));
                match &self.api_key {
                    Some(key) => request.bearer_auth(key),
                    None => request,
                }
            }
            ProviderKind::Custom | ProviderKind::Stub => {
                let request = request.json(&json!({ "text": text }));
                match &self.api_key {
                    Some(key) => request.header(AUTHORIZATION, key),
                    None => request,
                }
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for ApiEmbedder {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        let response = self
            .build_request(text)
            .send()
            .await
            .map_err(|e| EmbeddingError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            debug!(provider = self.name(), status = status.as_u16(), "embedding request rejected");
            return Err(status_error(status, retry_after_secs, body));
        }

        let value = response
            .json::<Value>()
            .await
            .map_err(|e| EmbeddingError::MalformedResponse(format!("invalid JSON: {e}")))?;

        let embedding = parse_embeddings_from_value(value)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                EmbeddingError::MalformedResponse("response did not contain an embedding".into())
            })?;

        if embedding.len() != self.dimension {
            return Err(EmbeddingError::MalformedResponse(format!(
                "expected {} dimensions, got {}",
                self.dimension,
                embedding.len()
            )));
        }
        Ok(embedding)
    }
}

fn request_url(cfg: &EmbeddingConfig) -> String {
    let endpoint = cfg.endpoint.as_deref().map(str::trim).unwrap_or_default();
    match cfg.provider {
        ProviderKind::AzureOpenai => format!(
            "{}/openai/deployments/{}/embeddings",
            endpoint.trim_end_matches('/'),
            cfg.deployment.trim()
        ),
        ProviderKind::Openai => {
            let base = if endpoint.is_empty() {
                OPENAI_DEFAULT_BASE
            } else {
                endpoint
            };
            format!("{}/embeddings", base.trim_end_matches('/'))
        }
        ProviderKind::Custom | ProviderKind::Stub => endpoint.to_string(),
    }
}

fn retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn status_error(status: StatusCode, retry_after_secs: Option<u64>, body: String) -> EmbeddingError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => EmbeddingError::RateLimited { retry_after_secs },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => EmbeddingError::Authentication {
            status: status.as_u16(),
        },
        _ => EmbeddingError::Api {
            status: status.as_u16(),
            body: truncate(body, MAX_ERROR_BODY),
        },
    }
}

fn truncate(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut cut = max;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

/// Accepts `{"data":[{"embedding":[...]}]}`, `{"embeddings":[[...]]}`,
/// `{"embedding":[...]}` and bare arrays.
fn parse_embeddings_from_value(value: Value) -> Result<Vec<Embedding>> {
    match value {
        Value::Object(mut map) => {
            if let Some(embeddings) = map.remove("embeddings") {
                return parse_embedding_collection(embeddings);
            }
            if let Some(embedding) = map.remove("embedding") {
                return parse_embedding_vector(embedding).map(|v| vec![v]);
            }

            match map.remove("data") {
                Some(Value::Array(items)) => items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(mut obj) => obj
                            .remove("embedding")
                            .ok_or_else(|| {
                                EmbeddingError::MalformedResponse(
                                    "missing `embedding` field in data item".into(),
                                )
                            })
                            .and_then(parse_embedding_vector),
                        _ => Err(EmbeddingError::MalformedResponse(
                            "unexpected entry inside `data` array".into(),
                        )),
                    })
                    .collect(),
                _ => Err(EmbeddingError::MalformedResponse(
                    "unsupported response shape".into(),
                )),
            }
        }
        other => parse_embedding_collection(other),
    }
}

fn parse_embedding_collection(value: Value) -> Result<Vec<Embedding>> {
    match value {
        Value::Array(items) if items.iter().all(|item| matches!(item, Value::Array(_))) => {
            items.into_iter().map(parse_embedding_vector).collect()
        }
        other => parse_embedding_vector(other).map(|v| vec![v]),
    }
}

fn parse_embedding_vector(value: Value) -> Result<Embedding> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num.as_f64().map(|f| f as f32).ok_or_else(|| {
                    EmbeddingError::MalformedResponse("non-numeric embedding value".into())
                }),
                other => Err(EmbeddingError::MalformedResponse(format!(
                    "embedding entries must be numbers, got {other}"
                ))),
            })
            .collect(),
        other => Err(EmbeddingError::MalformedResponse(format!(
            "embedding vector must be an array, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn azure_config(endpoint: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: ProviderKind::AzureOpenai,
            endpoint: Some(endpoint.to_string()),
            api_version: Some("2023-05-15".into()),
            api_key: Some("secret".into()),
            dimensions: Some(3),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn azure_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/ada-embedding-002/embeddings"))
            .and(query_param("api-version", "2023-05-15"))
            .and(header("api-key", "secret"))
            .and(body_json(json!({ "input": "hello" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "embedding": [0.1, 0.2, 0.3], "index": 0 }],
                "model": "ada"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let embedder = ApiEmbedder::new(&azure_config(&server.uri())).unwrap();
        let embedding = embedder.embed("hello").await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn openai_uses_bearer_and_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(json!({ "input": "", "model": "text-embedding-3-small" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": [{ "embedding": [1.0, 0.0] }] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cfg = EmbeddingConfig {
            provider: ProviderKind::Openai,
            endpoint: Some(format!("{}/v1/", server.uri())),
            api_key: Some("sk-test".into()),
            model: "text-embedding-3-small".into(),
            dimensions: Some(2),
            ..Default::default()
        };
        let embedder = ApiEmbedder::new(&cfg).unwrap();
        assert_eq!(embedder.embed("").await.unwrap(), vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn custom_endpoint_with_bare_array() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .and(header("authorization", "Token abc"))
            .and(body_json(json!({ "text": "cat" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([0.5, 0.5])))
            .mount(&server)
            .await;

        let cfg = EmbeddingConfig {
            provider: ProviderKind::Custom,
            endpoint: Some(format!("{}/embed", server.uri())),
            api_key: Some("Token abc".into()),
            dimensions: Some(2),
            ..Default::default()
        };
        let embedder = ApiEmbedder::new(&cfg).unwrap();
        assert_eq!(embedder.name(), "custom");
        assert_eq!(embedder.embed("cat").await.unwrap(), vec![0.5, 0.5]);
    }

    #[tokio::test]
    async fn status_codes_map_to_typed_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let embedder = ApiEmbedder::new(&azure_config(&server.uri())).unwrap();

        assert_eq!(
            embedder.embed("x").await.unwrap_err(),
            EmbeddingError::RateLimited {
                retry_after_secs: Some(7)
            }
        );
        assert_eq!(
            embedder.embed("x").await.unwrap_err(),
            EmbeddingError::Authentication { status: 401 }
        );
        assert_eq!(
            embedder.embed("x").await.unwrap_err(),
            EmbeddingError::Api {
                status: 500,
                body: "boom".into()
            }
        );
    }

    #[tokio::test]
    async fn wrong_dimension_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embedding": [1.0] })))
            .mount(&server)
            .await;

        let embedder = ApiEmbedder::new(&azure_config(&server.uri())).unwrap();
        let err = embedder.embed("x").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let cfg = EmbeddingConfig {
            connect_timeout_secs: 1,
            timeout_secs: 2,
            ..azure_config("http://127.0.0.1:9")
        };
        let embedder = ApiEmbedder::new(&cfg).unwrap();
        let err = embedder.embed("x").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Transport(_)));
    }

    #[test]
    fn azure_url_trims_trailing_slash() {
        let cfg = azure_config("https://res.openai.azure.com/");
        assert_eq!(
            request_url(&cfg),
            "https://res.openai.azure.com/openai/deployments/ada-embedding-002/embeddings"
        );
    }

    #[test]
    fn openai_url_defaults_to_public_api() {
        let cfg = EmbeddingConfig {
            provider: ProviderKind::Openai,
            api_key: Some("k".into()),
            ..Default::default()
        };
        assert_eq!(request_url(&cfg), "https://api.openai.com/v1/embeddings");
    }

    #[test]
    fn parse_various_formats() {
        let nested = parse_embeddings_from_value(json!({ "embeddings": [[1.0, 2.0], [3.0, 4.0]] }))
            .unwrap();
        assert_eq!(nested, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);

        let bare = parse_embeddings_from_value(json!([1.0, 2.0, 3.0])).unwrap();
        assert_eq!(bare, vec![vec![1.0, 2.0, 3.0]]);

        assert!(parse_embeddings_from_value(json!({ "data": [{ "vector": [1.0] }] })).is_err());
        assert!(parse_embeddings_from_value(json!({ "result": "ok" })).is_err());
        assert!(parse_embeddings_from_value(json!(["a", "b"])).is_err());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let body = "é".repeat(400);
        let cut = truncate(body, MAX_ERROR_BODY);
        assert!(cut.len() <= MAX_ERROR_BODY);
        assert!(cut.chars().all(|c| c == 'é'));
    }

    #[test]
    fn stub_kind_is_rejected() {
        assert!(ApiEmbedder::new(&EmbeddingConfig::stub(4)).is_err());
    }
}
