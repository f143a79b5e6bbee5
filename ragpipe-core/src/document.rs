//! Data types for documents, chunks, search results, and query results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, String>,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

/// A segment of a [`Document`] with its vector embedding.
///
/// Chunks are the unit of storage, retrieval, and citation. For a single
/// document, chunks cover the sentence sequence exactly: contiguous,
/// non-overlapping, in original order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk (`{document_id}_{index}`).
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
    /// Key-value metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: HashMap<String, String>,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

/// A retrieved [`Chunk`] paired with a relevance score.
///
/// Produced by vector search (similarity score) and again by reranking
/// (the reranker's own relevance score). Ordered best-first in both cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The relevance score (higher is more relevant).
    pub score: f32,
}

/// The result of one query pipeline run.
///
/// Carries the generated answer together with the ordered chunk ids and
/// chunk texts that informed it, so every answer is traceable back to its
/// sources. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    /// Unique identifier for the query.
    pub query_id: String,
    /// The original query text.
    pub query_text: String,
    /// The generated answer to the query.
    pub answer: String,
    /// Ordered identifiers of the chunks that informed the answer.
    pub source_chunks: Vec<String>,
    /// The supporting text of those chunks, in the same order.
    pub source_text: Vec<String>,
}
