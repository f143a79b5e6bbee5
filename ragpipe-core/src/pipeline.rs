//! Pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the full ingest-and-answer workflow by
//! composing an [`EmbeddingProvider`], a [`VectorStore`], a [`Chunker`],
//! a [`Reranker`], and a [`GenerationClient`].
//!
//! # Example
//!
//! ```rust,ignore
//! use ragpipe_core::{RagPipeline, RagConfig, InMemoryVectorStore, SemanticChunker};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(embedder.clone())
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .chunker(Arc::new(SemanticChunker::new(embedder)))
//!     .reranker(Arc::new(my_reranker))
//!     .generation_client(Arc::new(my_generator))
//!     .build()?;
//!
//! pipeline.ingest("docs", &document).await?;
//! let result = pipeline.answer("docs", "Q1", "What does Part A cover?").await?;
//! ```

use std::sync::Arc;

use tracing::{error, info};

use crate::chunking::Chunker;
use crate::config::RagConfig;
use crate::document::{Chunk, Document, QueryResult, SearchResult};
use crate::embedding::{EmbeddingMode, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::generation::{AnswerGenerator, GenerationClient};
use crate::reranker::Reranker;
use crate::vectorstore::VectorStore;

/// The pipeline orchestrator.
///
/// Coordinates document ingestion (chunk → embed → replace collection) and
/// query answering (retrieve → rerank → compose context → generate).
/// Strictly linear per run; holds no state across runs, so independent
/// queries may execute concurrently against the same pipeline. Construct
/// one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    reranker: Arc<dyn Reranker>,
    generator: AnswerGenerator,
}

impl std::fmt::Debug for RagPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagPipeline").field("config", &self.config).finish_non_exhaustive()
    }
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Create a named collection in the vector store.
    ///
    /// The collection is created with the dimensionality reported by the
    /// configured [`EmbeddingProvider`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if the vector store operation fails.
    pub async fn create_collection(&self, name: &str) -> Result<()> {
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.create_collection(name, dimensions).await.map_err(|e| {
            error!(collection = name, error = %e, "failed to create collection");
            RagError::PipelineError(format!("failed to create collection '{name}': {e}"))
        })
    }

    /// Delete a named collection from the vector store.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if the vector store operation fails.
    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        self.vector_store.delete_collection(name).await.map_err(|e| {
            error!(collection = name, error = %e, "failed to delete collection");
            RagError::PipelineError(format!("failed to delete collection '{name}': {e}"))
        })
    }

    /// Ingest a document: chunk → embed → replace the collection contents.
    ///
    /// One ingestion run defines the collection's new full contents; the
    /// staged chunks are swapped in as a whole via
    /// [`VectorStore::replace`], so the operation is all-or-nothing and a
    /// failure never commits a partial chunk set.
    ///
    /// Returns the chunks that were stored (with embeddings attached).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if chunking, embedding, or
    /// storage fails, including the document ID in the error message.
    pub async fn ingest(&self, collection: &str, document: &Document) -> Result<Vec<Chunk>> {
        // 1. Chunk the document
        let mut chunks = self.chunker.chunk(document).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "chunking failed during ingestion");
            RagError::PipelineError(format!("chunking failed for document '{}': {e}", document.id))
        })?;

        // 2. Collect chunk texts for batch embedding
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();

        // 3. Generate embeddings in document mode
        let embeddings = self
            .embedding_provider
            .embed_batch(&texts, EmbeddingMode::Document)
            .await
            .map_err(|e| {
                error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
                RagError::PipelineError(format!(
                    "embedding failed for document '{}': {e}",
                    document.id
                ))
            })?;

        // 4. Attach embeddings to chunks
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        // 5. Swap the staged chunks in as the collection's new generation
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.replace(collection, dimensions, &chunks).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "replace failed during ingestion");
            RagError::PipelineError(format!("replace failed for document '{}': {e}", document.id))
        })?;

        let chunk_count = chunks.len();
        info!(document.id = %document.id, collection, chunk_count, "ingested document");

        Ok(chunks)
    }

    /// Retrieve the `top_k` nearest chunks for a query.
    ///
    /// Embeds the query in query mode (distinct from the document mode used
    /// at ingestion) and searches the vector store. Candidates come back in
    /// similarity-descending order with their stable chunk ids; an empty
    /// candidate set is a valid outcome.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if embedding or search fails.
    pub async fn retrieve(
        &self,
        collection: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let query_embedding =
            self.embedding_provider.embed(query, EmbeddingMode::Query).await.map_err(|e| {
                error!(error = %e, "embedding failed during retrieval");
                RagError::PipelineError(format!("query embedding failed: {e}"))
            })?;

        self.vector_store.search(collection, &query_embedding, top_k).await.map_err(|e| {
            error!(collection, error = %e, "vector store search failed");
            RagError::PipelineError(format!("search failed in collection '{collection}': {e}"))
        })
    }

    /// Answer a question using the configured `top_k` / `rerank_top_k`.
    ///
    /// See [`answer_with`](RagPipeline::answer_with).
    pub async fn answer(
        &self,
        collection: &str,
        query_id: &str,
        query: &str,
    ) -> Result<QueryResult> {
        self.answer_with(collection, query_id, query, self.config.top_k, self.config.rerank_top_k)
            .await
    }

    /// Answer a question: retrieve → rerank → compose context → generate.
    ///
    /// Retrieval and reranking failures abort the run and propagate.
    /// Generation failures do not: the answer field carries a diagnostic
    /// placeholder instead (see [`AnswerGenerator`]), and the returned
    /// [`QueryResult`] still lists the reranked source chunks.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if embedding, search, or
    /// reranking fails.
    pub async fn answer_with(
        &self,
        collection: &str,
        query_id: &str,
        query: &str,
        top_k: usize,
        rerank_top_k: usize,
    ) -> Result<QueryResult> {
        // 1. Retrieve candidates by vector similarity
        let candidates = self.retrieve(collection, query, top_k).await?;

        // 2. Rerank against the literal query text
        let reranked =
            self.reranker.rerank(query, candidates, rerank_top_k).await.map_err(|e| {
                error!(error = %e, "reranking failed");
                RagError::PipelineError(format!("reranking failed: {e}"))
            })?;

        // 3. Compose the context block
        let context = compose_context(&reranked);

        // 4. Generate a grounded answer (placeholder on provider failure)
        let answer = self.generator.generate(query, &context).await;

        let source_chunks: Vec<String> = reranked.iter().map(|r| r.chunk.id.clone()).collect();
        let source_text: Vec<String> = reranked.iter().map(|r| r.chunk.text.clone()).collect();

        info!(query_id, source_count = source_chunks.len(), "query completed");

        Ok(QueryResult {
            query_id: query_id.to_string(),
            query_text: query.to_string(),
            answer,
            source_chunks,
            source_text,
        })
    }
}

/// Concatenate reranked chunk texts, separated by a blank line, into one
/// context block.
///
/// No truncation happens here; the caller already bounded the set via
/// `rerank_top_k`.
pub fn compose_context(results: &[SearchResult]) -> String {
    results.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

/// Builder for constructing a [`RagPipeline`].
///
/// All collaborators are injected explicitly; the pipeline owns no global
/// clients, so tests substitute deterministic fakes. Call
/// [`build()`](RagPipelineBuilder::build) to validate and produce the
/// pipeline.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .chunker(Arc::new(chunker))
///     .reranker(Arc::new(reranker))
///     .generation_client(Arc::new(generator))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    reranker: Option<Arc<dyn Reranker>>,
    generation_client: Option<Arc<dyn GenerationClient>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the reranker.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Set the generation client used for answer synthesis.
    pub fn generation_client(mut self, client: Arc<dyn GenerationClient>) -> Self {
        self.generation_client = Some(client);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker =
            self.chunker.ok_or_else(|| RagError::ConfigError("chunker is required".to_string()))?;
        let reranker = self
            .reranker
            .ok_or_else(|| RagError::ConfigError("reranker is required".to_string()))?;
        let generation_client = self
            .generation_client
            .ok_or_else(|| RagError::ConfigError("generation_client is required".to_string()))?;

        Ok(RagPipeline {
            config,
            embedding_provider,
            vector_store,
            chunker,
            reranker,
            generator: AnswerGenerator::new(generation_client),
        })
    }
}
