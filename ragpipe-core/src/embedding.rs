//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The embedding task mode.
///
/// Chunk texts are embedded in `Document` mode at ingestion time; query
/// texts are embedded in `Query` mode at retrieval time. The two modes are
/// distinct on purpose: providers that support asymmetric embeddings
/// produce different vectors for the same text depending on the mode, and
/// collapsing them silently degrades retrieval quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    /// Embedding of stored content (ingestion side).
    Document,
    /// Embedding of a search query (retrieval side).
    Query,
}

impl EmbeddingMode {
    /// The wire representation of this mode (`"document"` / `"query"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingMode::Document => "document",
            EmbeddingMode::Query => "query",
        }
    }
}

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends behind a unified async
/// interface. Batch output is order-preserving: vector *i* corresponds to
/// input text *i*. The default [`embed_batch`](EmbeddingProvider::embed_batch)
/// implementation calls [`embed`](EmbeddingProvider::embed) sequentially;
/// backends that support native batching should override it.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    ///
    /// The default implementation calls [`embed`](EmbeddingProvider::embed)
    /// sequentially for each input. Override this method if the backend
    /// supports native batch embedding for better throughput.
    async fn embed_batch(&self, texts: &[&str], mode: EmbeddingMode) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text, mode).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}
