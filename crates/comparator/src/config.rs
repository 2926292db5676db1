use serde::{Deserialize, Serialize};

use crate::error::CompareConfigError;

/// Tuning for [`BatchComparator`](crate::BatchComparator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Records processed at once. `1` gives strictly sequential processing.
    pub max_concurrency: usize,
    /// Echo both embeddings back in each successful result record.
    pub include_embeddings: bool,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            include_embeddings: false,
        }
    }
}

impl CompareConfig {
    pub fn sequential() -> Self {
        Self {
            max_concurrency: 1,
            ..Default::default()
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_include_embeddings(mut self, include: bool) -> Self {
        self.include_embeddings = include;
        self
    }

    pub fn validate(&self) -> Result<(), CompareConfigError> {
        if self.max_concurrency == 0 {
            return Err(CompareConfigError(
                "max_concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
