//! Voyage AI providers: asymmetric embeddings and cross-encoder reranking.
//!
//! Both clients call the Voyage REST API directly via `reqwest`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::document::SearchResult;
use crate::embedding::{EmbeddingMode, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::reranker::Reranker;

/// The Voyage AI embeddings endpoint.
const VOYAGE_EMBEDDINGS_URL: &str = "https://api.voyageai.com/v1/embeddings";

/// The Voyage AI rerank endpoint.
const VOYAGE_RERANK_URL: &str = "https://api.voyageai.com/v1/rerank";

/// The default model for Voyage embeddings.
const DEFAULT_EMBEDDING_MODEL: &str = "voyage-3";

/// The default dimensionality for `voyage-3`.
const DEFAULT_DIMENSIONS: usize = 1024;

/// The default model for Voyage reranking.
const DEFAULT_RERANK_MODEL: &str = "rerank-2-lite";

#[derive(Deserialize)]
struct ErrorResponse {
    detail: String,
}

/// Extract the API's error detail from a failure body, falling back to the
/// raw body text.
fn error_detail(body: String) -> String {
    serde_json::from_str::<ErrorResponse>(&body).map(|e| e.detail).unwrap_or(body)
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by the Voyage AI embeddings API.
///
/// The [`EmbeddingMode`] is forwarded as the API's `input_type`, so document
/// and query embeddings stay asymmetric end to end.
///
/// # Configuration
///
/// - `model` – defaults to `voyage-3`.
/// - `api_key` – from the constructor or the `VOYAGE_API_KEY` environment
///   variable.
///
/// # Example
///
/// ```rust,ignore
/// use ragpipe_core::voyage::VoyageEmbeddingProvider;
///
/// let provider = VoyageEmbeddingProvider::from_env()?;
/// let embedding = provider.embed("hello world", EmbeddingMode::Query).await?;
/// ```
pub struct VoyageEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl VoyageEmbeddingProvider {
    /// Create a new provider with the given API key.
    ///
    /// Uses the default model (`voyage-3`) and dimensions (1024).
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::EmbeddingError {
                provider: "Voyage".into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
        })
    }

    /// Create a new provider using the `VOYAGE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("VOYAGE_API_KEY").map_err(|_| RagError::EmbeddingError {
            provider: "Voyage".into(),
            message: "VOYAGE_API_KEY environment variable not set".into(),
        })?;
        Self::new(api_key)
    }

    /// Set the model name (e.g. `voyage-3-large`) and its dimensionality.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    input_type: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for VoyageEmbeddingProvider {
    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text], mode).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: "Voyage".into(),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str], mode: EmbeddingMode) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = "Voyage",
            batch_size = texts.len(),
            model = %self.model,
            input_type = mode.as_str(),
            "embedding batch"
        );

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            input_type: mode.as_str(),
        };

        let response = self
            .client
            .post(VOYAGE_EMBEDDINGS_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Voyage", error = %e, "request failed");
                RagError::EmbeddingError {
                    provider: "Voyage".into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = error_detail(response.text().await.unwrap_or_default());

            error!(provider = "Voyage", %status, "API error");
            return Err(RagError::EmbeddingError {
                provider: "Voyage".into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = "Voyage", error = %e, "failed to parse response");
            RagError::EmbeddingError {
                provider: "Voyage".into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        Ok(embedding_response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ── Reranking ──────────────────────────────────────────────────────

/// A [`Reranker`] backed by the Voyage AI rerank API.
///
/// Scores the literal candidate texts against the query with a
/// cross-encoder and maps the returned `(index, relevance_score)` pairs
/// back to the original candidates, so chunk ids survive reordering.
pub struct VoyageReranker {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl VoyageReranker {
    /// Create a new reranker with the given API key and the default model
    /// (`rerank-2-lite`).
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::RerankerError {
                reranker: "Voyage".into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_RERANK_MODEL.into(),
        })
    }

    /// Create a new reranker using the `VOYAGE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("VOYAGE_API_KEY").map_err(|_| RagError::RerankerError {
            reranker: "Voyage".into(),
            message: "VOYAGE_API_KEY environment variable not set".into(),
        })?;
        Self::new(api_key)
    }

    /// Set the rerank model name (e.g. `rerank-2`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<&'a str>,
    top_k: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    data: Vec<RerankData>,
}

#[derive(Deserialize)]
struct RerankData {
    index: usize,
    relevance_score: f32,
}

#[async_trait]
impl Reranker for VoyageReranker {
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<SearchResult>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if candidates.is_empty() {
            return Ok(candidates);
        }

        debug!(
            reranker = "Voyage",
            candidate_count = candidates.len(),
            top_k,
            model = %self.model,
            "reranking candidates"
        );

        let documents: Vec<&str> = candidates.iter().map(|c| c.chunk.text.as_str()).collect();
        let request_body = RerankRequest { model: &self.model, query, documents, top_k };

        let response = self
            .client
            .post(VOYAGE_RERANK_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(reranker = "Voyage", error = %e, "request failed");
                RagError::RerankerError {
                    reranker: "Voyage".into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = error_detail(response.text().await.unwrap_or_default());

            error!(reranker = "Voyage", %status, "API error");
            return Err(RagError::RerankerError {
                reranker: "Voyage".into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let rerank_response: RerankResponse = response.json().await.map_err(|e| {
            error!(reranker = "Voyage", error = %e, "failed to parse response");
            RagError::RerankerError {
                reranker: "Voyage".into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        rerank_response
            .data
            .into_iter()
            .map(|entry| {
                let candidate =
                    candidates.get(entry.index).ok_or_else(|| RagError::RerankerError {
                        reranker: "Voyage".into(),
                        message: format!(
                            "API returned index {} for {} candidates",
                            entry.index,
                            candidates.len()
                        ),
                    })?;
                Ok(SearchResult { chunk: candidate.chunk.clone(), score: entry.relevance_score })
            })
            .collect()
    }
}
