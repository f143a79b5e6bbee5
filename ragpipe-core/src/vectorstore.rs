//! Vector store trait for storing and searching vector embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;

/// A storage backend for vector embeddings with similarity search.
///
/// Implementations manage named collections of [`Chunk`]s and support
/// upserting, deleting, and searching by vector similarity.
///
/// # Example
///
/// ```rust,ignore
/// use ragpipe_core::{VectorStore, InMemoryVectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 1024).await?;
/// store.upsert("docs", &chunks).await?;
/// let results = store.search("docs", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Upsert chunks into a collection. Chunks must have embeddings set.
    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// Delete chunks by their IDs from a collection.
    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()>;

    /// Replace a collection's full contents with the given chunks.
    ///
    /// Ingestion is all-or-nothing: concurrent readers must observe either
    /// the previous generation of the collection or the new one, never a
    /// partially written state. Implementations with native atomicity
    /// should stage the new generation and swap it in as one operation.
    /// The default implementation falls back to delete + create + upsert
    /// and therefore requires external serialization of ingestion runs.
    async fn replace(&self, collection: &str, dimensions: usize, chunks: &[Chunk]) -> Result<()> {
        self.delete_collection(collection).await?;
        self.create_collection(collection, dimensions).await?;
        self.upsert(collection, chunks).await
    }

    /// Search for the `top_k` most similar chunks to the given embedding.
    ///
    /// Returns results ordered by descending similarity score. An empty
    /// result set is a valid outcome, not an error.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;
}
