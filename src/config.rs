//! YAML configuration file support for semdiff pipelines.
//!
//! A single file describes the embedding provider and the batch comparator
//! so library users can build a ready [`BatchComparator`] without wiring the
//! crates by hand.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "contract-revisions"
//!
//! embedding:
//!   provider: azure_openai
//!   endpoint: "https://my-resource.openai.azure.com"
//!   api_version: "2023-05-15"
//!   api_key: "..."
//!   deployment: "ada-embedding-002"
//!   retry:
//!     max_retries: 3
//!     base_delay: 200
//!
//! compare:
//!   max_concurrency: 8
//!   include_embeddings: false
//! ```

use std::fs;
use std::path::Path;

use comparator::{BatchComparator, CompareConfig};
use embedding::EmbeddingConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{build_comparator, PipelineError};

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration for a comparison pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Configuration format version
    pub version: String,

    /// Optional configuration name/description
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub compare: CompareConfig,
}

impl PipelineConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the version and both sections.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => {}
            v => return Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }

        self.embedding
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("embedding: {e}")))?;
        self.compare
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("compare: {e}")))?;

        Ok(())
    }

    /// Build the provider stack and comparator this file describes.
    pub fn build_pipeline(&self) -> Result<BatchComparator, PipelineError> {
        build_comparator(&self.embedding, self.compare)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            embedding: EmbeddingConfig::default(),
            compare: CompareConfig::default(),
        }
    }
}
