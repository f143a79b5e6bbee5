//! Tests for the retrieve → rerank → compose → generate pipeline.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use ragpipe_core::chunking::SemanticChunker;
use ragpipe_core::config::RagConfig;
use ragpipe_core::document::{Chunk, Document, SearchResult};
use ragpipe_core::embedding::{EmbeddingMode, EmbeddingProvider};
use ragpipe_core::error::RagError;
use ragpipe_core::generation::GenerationClient;
use ragpipe_core::inmemory::InMemoryVectorStore;
use ragpipe_core::pipeline::{RagPipeline, compose_context};
use ragpipe_core::reranker::{NoOpReranker, Reranker};
use ragpipe_core::vectorstore::VectorStore;

// ── Deterministic fakes ────────────────────────────────────────────

/// Hash-based embeddings that also record the mode of every call, so tests
/// can assert the document/query asymmetry at the call sites.
struct ModeRecordingEmbedder {
    dimensions: usize,
    modes: Mutex<Vec<EmbeddingMode>>,
}

impl ModeRecordingEmbedder {
    fn new(dimensions: usize) -> Self {
        Self { dimensions, modes: Mutex::new(Vec::new()) }
    }

    fn recorded_modes(&self) -> Vec<EmbeddingMode> {
        self.modes.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for ModeRecordingEmbedder {
    async fn embed(&self, text: &str, mode: EmbeddingMode) -> ragpipe_core::Result<Vec<f32>> {
        self.modes.lock().unwrap().push(mode);
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut emb = vec![0.0f32; self.dimensions];
        for (i, v) in emb.iter_mut().enumerate() {
            *v = ((hash.wrapping_add(i as u64)) as f32).sin();
        }
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(emb)
    }

    async fn embed_batch(
        &self,
        texts: &[&str],
        mode: EmbeddingMode,
    ) -> ragpipe_core::Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text, mode).await?);
        }
        Ok(results)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Embeds every text to the same fixed vector.
struct FixedEmbedder {
    vector: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    async fn embed(&self, _text: &str, _mode: EmbeddingMode) -> ragpipe_core::Result<Vec<f32>> {
        Ok(self.vector.clone())
    }

    fn dimensions(&self) -> usize {
        self.vector.len()
    }
}

/// Returns a canned answer.
struct CannedGenerator {
    answer: String,
}

#[async_trait]
impl GenerationClient for CannedGenerator {
    async fn generate(&self, _prompt: &str) -> ragpipe_core::Result<String> {
        Ok(self.answer.clone())
    }
}

/// Always fails, like a provider outage.
struct FailingGenerator;

#[async_trait]
impl GenerationClient for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> ragpipe_core::Result<String> {
        Err(RagError::GenerationError {
            provider: "Failing".into(),
            message: "simulated outage".into(),
        })
    }
}

/// Reverses the retrieval order before truncating; a reranker that
/// maximally disagrees with vector similarity.
struct ReversingReranker;

#[async_trait]
impl Reranker for ReversingReranker {
    async fn rerank(
        &self,
        _query: &str,
        mut candidates: Vec<SearchResult>,
        top_k: usize,
    ) -> ragpipe_core::Result<Vec<SearchResult>> {
        candidates.reverse();
        candidates.truncate(top_k);
        Ok(candidates)
    }
}

fn make_chunk(id: &str, text: &str, embedding: Vec<f32>) -> Chunk {
    Chunk {
        id: id.to_string(),
        text: text.to_string(),
        embedding,
        metadata: HashMap::new(),
        document_id: "doc".to_string(),
    }
}

fn build_pipeline(
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    reranker: Arc<dyn Reranker>,
    generator: Arc<dyn GenerationClient>,
) -> RagPipeline {
    RagPipeline::builder()
        .config(RagConfig::builder().top_k(10).rerank_top_k(3).build().unwrap())
        .embedding_provider(embedder.clone())
        .vector_store(store)
        .chunker(Arc::new(SemanticChunker::new(embedder)))
        .reranker(reranker)
        .generation_client(generator)
        .build()
        .unwrap()
}

// ── Retrieval ──────────────────────────────────────────────────────

#[tokio::test]
async fn retrieval_orders_candidates_by_similarity() {
    let store = Arc::new(InMemoryVectorStore::new());
    store.create_collection("docs", 2).await.unwrap();
    store
        .upsert(
            "docs",
            &[
                make_chunk("doc_0", "close to the query", vec![0.95, 0.05]),
                make_chunk("doc_1", "far from the query", vec![0.0, 1.0]),
            ],
        )
        .await
        .unwrap();

    let pipeline = build_pipeline(
        Arc::new(FixedEmbedder { vector: vec![1.0, 0.0] }),
        store,
        Arc::new(NoOpReranker),
        Arc::new(CannedGenerator { answer: "ok".into() }),
    );

    let candidates = pipeline.retrieve("docs", "anything", 10).await.unwrap();
    let ids: Vec<&str> = candidates.iter().map(|c| c.chunk.id.as_str()).collect();
    assert_eq!(ids, vec!["doc_0", "doc_1"]);
}

#[tokio::test]
async fn empty_collection_is_a_valid_zero_result() {
    let store = Arc::new(InMemoryVectorStore::new());
    store.create_collection("docs", 2).await.unwrap();

    let pipeline = build_pipeline(
        Arc::new(FixedEmbedder { vector: vec![1.0, 0.0] }),
        store,
        Arc::new(NoOpReranker),
        Arc::new(CannedGenerator { answer: "ok".into() }),
    );

    let candidates = pipeline.retrieve("docs", "anything", 10).await.unwrap();
    assert!(candidates.is_empty());

    // The full pipeline still completes with an answer and empty sources.
    let result = pipeline.answer("docs", "Q1", "anything").await.unwrap();
    assert!(result.source_chunks.is_empty());
    assert!(result.source_text.is_empty());
}

#[tokio::test]
async fn missing_collection_propagates_an_error() {
    let pipeline = build_pipeline(
        Arc::new(FixedEmbedder { vector: vec![1.0, 0.0] }),
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(NoOpReranker),
        Arc::new(CannedGenerator { answer: "ok".into() }),
    );

    let err = pipeline.answer("nope", "Q1", "anything").await.unwrap_err();
    assert!(matches!(err, RagError::PipelineError(_)));
}

// ── Reranking ──────────────────────────────────────────────────────

#[tokio::test]
async fn reranker_may_disagree_with_retrieval_order() {
    let store = Arc::new(InMemoryVectorStore::new());
    store.create_collection("docs", 2).await.unwrap();
    store
        .upsert(
            "docs",
            &[
                make_chunk("doc_0", "first by similarity", vec![1.0, 0.0]),
                make_chunk("doc_1", "second by similarity", vec![0.9, 0.1]),
                make_chunk("doc_2", "third by similarity", vec![0.5, 0.5]),
            ],
        )
        .await
        .unwrap();

    let pipeline = build_pipeline(
        Arc::new(FixedEmbedder { vector: vec![1.0, 0.0] }),
        store,
        Arc::new(ReversingReranker),
        Arc::new(CannedGenerator { answer: "ok".into() }),
    );

    let result = pipeline.answer_with("docs", "Q1", "anything", 10, 2).await.unwrap();

    // Size never exceeds min(rerank_top_k, candidates), and ids are a
    // subset of the retrieved ids, so attribution survives reordering.
    assert_eq!(result.source_chunks, vec!["doc_2", "doc_1"]);
    assert_eq!(result.source_text[0], "third by similarity");
}

#[tokio::test]
async fn rerank_top_k_above_candidate_count_returns_all() {
    let candidates = vec![
        SearchResult { chunk: make_chunk("a", "a text", vec![1.0]), score: 0.9 },
        SearchResult { chunk: make_chunk("b", "b text", vec![1.0]), score: 0.8 },
    ];

    let reranked = ReversingReranker.rerank("q", candidates, 10).await.unwrap();
    assert_eq!(reranked.len(), 2);

    let noop = NoOpReranker
        .rerank(
            "q",
            vec![SearchResult { chunk: make_chunk("a", "a text", vec![1.0]), score: 0.9 }],
            10,
        )
        .await
        .unwrap();
    assert_eq!(noop.len(), 1);
}

// ── Context composition ────────────────────────────────────────────

#[test]
fn context_joins_chunk_texts_with_blank_lines() {
    let results = vec![
        SearchResult { chunk: make_chunk("a", "First chunk.", vec![]), score: 1.0 },
        SearchResult { chunk: make_chunk("b", "Second chunk.", vec![]), score: 0.5 },
    ];
    assert_eq!(compose_context(&results), "First chunk.\n\nSecond chunk.");
    assert_eq!(compose_context(&[]), "");
}

// ── Generation fallback ────────────────────────────────────────────

#[tokio::test]
async fn generator_failure_degrades_to_placeholder_answer() {
    let store = Arc::new(InMemoryVectorStore::new());
    store.create_collection("docs", 2).await.unwrap();
    store
        .upsert("docs", &[make_chunk("doc_0", "useful context", vec![1.0, 0.0])])
        .await
        .unwrap();

    let pipeline = build_pipeline(
        Arc::new(FixedEmbedder { vector: vec![1.0, 0.0] }),
        store,
        Arc::new(NoOpReranker),
        Arc::new(FailingGenerator),
    );

    let result = pipeline.answer("docs", "Q7", "what is useful?").await.unwrap();

    assert!(result.answer.contains("Error"));
    assert_eq!(result.query_id, "Q7");
    assert_eq!(result.query_text, "what is useful?");
    assert_eq!(result.source_chunks, vec!["doc_0"]);
    assert_eq!(result.source_text, vec!["useful context"]);
}

// ── Embedding-mode asymmetry ───────────────────────────────────────

#[tokio::test]
async fn ingestion_embeds_documents_and_queries_embed_queries() {
    let embedder = Arc::new(ModeRecordingEmbedder::new(16));
    let store = Arc::new(InMemoryVectorStore::new());

    let pipeline = build_pipeline(
        embedder.clone(),
        store,
        Arc::new(NoOpReranker),
        Arc::new(CannedGenerator { answer: "ok".into() }),
    );

    let document = Document {
        id: "doc".to_string(),
        text: "Part A covers hospitals. Part B covers visits. Crabs live near the sea."
            .to_string(),
        metadata: HashMap::new(),
        source_uri: None,
    };
    pipeline.ingest("docs", &document).await.unwrap();

    let ingest_modes = embedder.recorded_modes();
    assert!(!ingest_modes.is_empty());
    assert!(ingest_modes.iter().all(|m| *m == EmbeddingMode::Document));

    pipeline.answer("docs", "Q1", "What does Part A cover?").await.unwrap();

    let all_modes = embedder.recorded_modes();
    let query_modes = &all_modes[ingest_modes.len()..];
    assert_eq!(query_modes, &[EmbeddingMode::Query]);
}

// ── Ingestion ──────────────────────────────────────────────────────

#[tokio::test]
async fn ingestion_replaces_the_previous_generation() {
    let embedder = Arc::new(ModeRecordingEmbedder::new(16));
    let store = Arc::new(InMemoryVectorStore::new());

    let pipeline = build_pipeline(
        embedder,
        store.clone(),
        Arc::new(NoOpReranker),
        Arc::new(CannedGenerator { answer: "ok".into() }),
    );

    let first = Document {
        id: "old".to_string(),
        text: "Old content about one topic. It spans two sentences.".to_string(),
        metadata: HashMap::new(),
        source_uri: None,
    };
    let second = Document {
        id: "new".to_string(),
        text: "Entirely new content. It also spans two sentences.".to_string(),
        metadata: HashMap::new(),
        source_uri: None,
    };

    pipeline.ingest("docs", &first).await.unwrap();
    let chunks = pipeline.ingest("docs", &second).await.unwrap();
    assert!(chunks.iter().all(|c| c.document_id == "new"));
    assert!(chunks.iter().all(|c| !c.embedding.is_empty()));

    // Nothing from the first generation survives the swap.
    let results = pipeline.retrieve("docs", "content", 50).await.unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.chunk.document_id == "new"));
}

#[tokio::test]
async fn builder_requires_every_collaborator() {
    let err = RagPipeline::builder().build().unwrap_err();
    assert!(matches!(err, RagError::ConfigError(_)));

    let err = RagPipeline::builder().config(RagConfig::default()).build().unwrap_err();
    assert!(matches!(err, RagError::ConfigError(_)));
}
