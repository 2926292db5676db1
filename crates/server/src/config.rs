use comparator::CompareConfig;
use embedding::EmbeddingConfig;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::time::Duration;

/// Environment prefix for every setting, e.g. `SEMDIFF__PORT=9000` or
/// `SEMDIFF__EMBEDDING__API_KEY=...`.
pub const ENV_PREFIX: &str = "SEMDIFF";

/// Bare variable names used by earlier function deployments, mapped onto the
/// embedding section.
const LEGACY_ENV: [(&str, &str); 3] = [
    ("API_ENDPOINT", "embedding.endpoint"),
    ("API_VERSION", "embedding.api_version"),
    ("API_KEY", "embedding.api_key"),
];

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whole-request timeout in seconds, covering every provider call of a batch
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Function keys accepted on the comparison routes. Empty disables auth.
    #[serde(default)]
    pub function_keys: HashSet<String>,

    /// Requests per minute per function key (0 = unlimited)
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level / `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// JSON log lines instead of the compact human format
    #[serde(default = "default_true")]
    pub json_logs: bool,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Embedding provider
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Batch comparison tuning
    #[serde(default)]
    pub compare: CompareConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            function_keys: HashSet::new(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            json_logs: default_true(),
            metrics_enabled: default_true(),
            embedding: EmbeddingConfig::default(),
            compare: CompareConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, an optional `server.{toml,yaml,json}`
    /// file and the process environment.
    pub fn load() -> anyhow::Result<Self> {
        // A missing .env file is normal outside local development.
        dotenvy::dotenv().ok();
        Self::build(Some("server"), None)
    }

    /// Load from an explicit file and an explicit environment map instead of
    /// the process environment.
    pub fn load_from(file: Option<&str>, env: HashMap<String, String>) -> anyhow::Result<Self> {
        Self::build(file, Some(env))
    }

    fn build(file: Option<&str>, env: Option<HashMap<String, String>>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        // Load from file if exists
        if let Some(name) = file {
            builder = builder.add_source(config::File::with_name(name).required(false));
        }

        // Override with environment variables
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("function_keys")
                .try_parsing(true)
                .source(env.clone()),
        );

        for (var, key) in LEGACY_ENV {
            let value = match &env {
                Some(map) => map.get(var).cloned(),
                None => std::env::var(var).ok(),
            };
            builder = builder.set_override_option(key, value.filter(|v| !v.trim().is_empty()))?;
        }

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }

    pub fn auth_enabled(&self) -> bool {
        !self.function_keys.is_empty()
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_body_size_mb() -> usize {
    10
}

fn default_rate_limit_per_minute() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
