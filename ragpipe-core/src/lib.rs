//! Semantic chunking and a retrieve → rerank → generate pipeline for
//! grounded document Q&A.
//!
//! Ingestion splits a long-form document at embedding-distance breakpoints
//! ([`SemanticChunker`]) and replaces a vector-store collection with the
//! resulting chunks. Queries run through [`RagPipeline`]: embed the
//! question, fetch the nearest chunks, rerank them against the literal
//! query, compose a context block, and generate an answer that cites the
//! chunks it was grounded in.
//!
//! All external collaborators sit behind async traits
//! ([`EmbeddingProvider`], [`VectorStore`], [`Reranker`],
//! [`GenerationClient`]) and are injected through the pipeline builder, so
//! every stage can be exercised with deterministic fakes.

pub mod anthropic;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod inmemory;
pub mod pipeline;
pub mod reranker;
pub mod vectorstore;
pub mod voyage;

pub use anthropic::AnthropicGenerator;
pub use chunking::{Chunker, SemanticChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, QueryResult, SearchResult};
pub use embedding::{EmbeddingMode, EmbeddingProvider};
pub use error::{RagError, Result};
pub use generation::{AnswerGenerator, GenerationClient};
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{RagPipeline, RagPipelineBuilder, compose_context};
pub use reranker::{NoOpReranker, Reranker};
pub use vectorstore::VectorStore;
pub use voyage::{VoyageEmbeddingProvider, VoyageReranker};
