//! Configuration for the query pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Tunables for one query pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Number of candidates to retrieve from vector search.
    pub top_k: usize,
    /// Number of candidates to keep after reranking.
    pub rerank_top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { top_k: 10, rerank_top_k: 3 }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the number of candidates to retrieve from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the number of candidates to keep after reranking.
    pub fn rerank_top_k(mut self, k: usize) -> Self {
        self.config.rerank_top_k = k;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `top_k` or `rerank_top_k` is zero.
    pub fn build(self) -> Result<RagConfig> {
        if self.config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.config.rerank_top_k == 0 {
            return Err(RagError::ConfigError(
                "rerank_top_k must be greater than zero".to_string(),
            ));
        }
        Ok(self.config)
    }
}
