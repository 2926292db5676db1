use crate::config::ServerConfig;
use crate::metrics::PrometheusMetrics;
use comparator::BatchComparator;
use dashmap::DashMap;
use embedding::EmbeddingProvider;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::{Duration, Instant};
use subtle::ConstantTimeEq;

/// What the comparison routes run against.
#[derive(Clone)]
pub enum Pipeline {
    Ready(Arc<BatchComparator>),
    /// The provider could not be built; every comparison request gets this
    /// message back as a configuration error.
    Unconfigured(String),
}

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Rate limit tracking: function key -> (count, window_start)
    pub rate_limiter: Arc<DashMap<String, (u32, Instant)>>,

    /// Comparator built once at start-up
    pub pipeline: Pipeline,

    /// Prometheus render handle, present when a recorder was installed
    pub metrics_handle: Option<PrometheusHandle>,
}

impl ServerState {
    /// Build the provider and comparator from `config`.
    ///
    /// A provider that cannot be built does not stop the server; it is
    /// reported per request instead.
    pub fn new(config: ServerConfig) -> Self {
        let pipeline = match semdiff::build_comparator(&config.embedding, config.compare) {
            Ok(comparator) => Pipeline::Ready(Arc::new(Self::instrument(&config, comparator))),
            Err(err) => {
                tracing::warn!(error = %err, "embedding provider not configured; comparison requests will fail");
                Pipeline::Unconfigured(err.to_string())
            }
        };
        Self::with_pipeline(config, pipeline)
    }

    /// Use an already constructed provider instead of the configured one.
    pub fn with_provider(
        config: ServerConfig,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, comparator::CompareConfigError> {
        let comparator = BatchComparator::new(provider, config.compare)?;
        let pipeline = Pipeline::Ready(Arc::new(Self::instrument(&config, comparator)));
        Ok(Self::with_pipeline(config, pipeline))
    }

    fn with_pipeline(config: ServerConfig, pipeline: Pipeline) -> Self {
        Self {
            config: Arc::new(config),
            rate_limiter: Arc::new(DashMap::new()),
            pipeline,
            metrics_handle: None,
        }
    }

    fn instrument(config: &ServerConfig, comparator: BatchComparator) -> BatchComparator {
        if config.metrics_enabled {
            comparator.with_metrics(Arc::new(PrometheusMetrics))
        } else {
            comparator
        }
    }

    pub fn with_metrics_handle(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.pipeline, Pipeline::Ready(_))
    }

    /// Check a presented key against every configured key in constant time.
    pub fn is_valid_function_key(&self, key: &str) -> bool {
        self.config
            .function_keys
            .iter()
            .fold(subtle::Choice::from(0), |found, candidate| {
                found | candidate.as_bytes().ct_eq(key.as_bytes())
            })
            .into()
    }

    /// Fixed one-minute window per key.
    pub fn check_rate_limit(&self, key: &str) -> bool {
        let limit = self.config.rate_limit_per_minute;
        if limit == 0 {
            return true;
        }

        let now = Instant::now();
        let window = Duration::from_secs(60);

        let mut entry = self.rate_limiter.entry(key.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        // Reset if window has passed
        if now.duration_since(*window_start) > window {
            *count = 0;
            *window_start = now;
        }

        if *count >= limit {
            return false;
        }

        *count += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedding::StubEmbedder;

    fn state_with_keys(keys: &[&str], rate_limit_per_minute: u32) -> ServerState {
        let config = ServerConfig {
            function_keys: keys.iter().map(|k| k.to_string()).collect(),
            rate_limit_per_minute,
            metrics_enabled: false,
            ..Default::default()
        };
        ServerState::with_provider(config, Arc::new(StubEmbedder::new(8))).unwrap()
    }

    #[test]
    fn function_keys_are_matched_exactly() {
        let state = state_with_keys(&["alpha", "beta"], 10);
        assert!(state.is_valid_function_key("alpha"));
        assert!(state.is_valid_function_key("beta"));
        assert!(!state.is_valid_function_key("alph"));
        assert!(!state.is_valid_function_key("alphaa"));
        assert!(!state.is_valid_function_key(""));
    }

    #[test]
    fn rate_limit_window() {
        let state = state_with_keys(&["k"], 2);
        assert!(state.check_rate_limit("k"));
        assert!(state.check_rate_limit("k"));
        assert!(!state.check_rate_limit("k"));
        // Separate budget per key
        assert!(state.check_rate_limit("other"));
    }

    #[test]
    fn zero_rate_limit_means_unlimited() {
        let state = state_with_keys(&["k"], 0);
        for _ in 0..500 {
            assert!(state.check_rate_limit("k"));
        }
    }

    #[test]
    fn unconfigured_provider_is_not_ready() {
        let state = ServerState::new(ServerConfig::default());
        assert!(!state.is_ready());
        match &state.pipeline {
            Pipeline::Unconfigured(message) => assert!(message.contains("endpoint")),
            Pipeline::Ready(_) => panic!("default config has no endpoint"),
        }
    }
}
