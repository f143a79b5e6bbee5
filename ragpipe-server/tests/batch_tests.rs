//! Tests for batch processing: per-item failure isolation and file handling.

use std::sync::Arc;

use async_trait::async_trait;
use ragpipe_core::chunking::SemanticChunker;
use ragpipe_core::config::RagConfig;
use ragpipe_core::embedding::{EmbeddingMode, EmbeddingProvider};
use ragpipe_core::error::RagError;
use ragpipe_core::generation::GenerationClient;
use ragpipe_core::inmemory::InMemoryVectorStore;
use ragpipe_core::pipeline::RagPipeline;
use ragpipe_core::reranker::NoOpReranker;
use ragpipe_server::batch::{BatchError, process_batch};

/// Hash-based embeddings that fail for any text containing "boom", so a
/// single batch item can be made to error.
struct TrippableEmbedder;

#[async_trait]
impl EmbeddingProvider for TrippableEmbedder {
    async fn embed(&self, text: &str, _mode: EmbeddingMode) -> ragpipe_core::Result<Vec<f32>> {
        if text.contains("boom") {
            return Err(RagError::EmbeddingError {
                provider: "Trippable".into(),
                message: "simulated provider failure".into(),
            });
        }
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut emb = vec![0.0f32; 8];
        for (i, v) in emb.iter_mut().enumerate() {
            *v = ((hash.wrapping_add(i as u64)) as f32).sin();
        }
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        8
    }
}

struct CannedGenerator;

#[async_trait]
impl GenerationClient for CannedGenerator {
    async fn generate(&self, _prompt: &str) -> ragpipe_core::Result<String> {
        Ok("a grounded answer".to_string())
    }
}

async fn build_pipeline() -> RagPipeline {
    let embedder = Arc::new(TrippableEmbedder);
    let pipeline = RagPipeline::builder()
        .config(RagConfig::default())
        .embedding_provider(embedder.clone())
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .chunker(Arc::new(SemanticChunker::new(embedder)))
        .reranker(Arc::new(NoOpReranker))
        .generation_client(Arc::new(CannedGenerator))
        .build()
        .unwrap();
    pipeline.create_collection("docs").await.unwrap();
    pipeline
}

#[tokio::test]
async fn one_failing_item_never_aborts_the_batch() {
    let pipeline = build_pipeline().await;
    let dir = tempfile::tempdir().unwrap();
    let queries_path = dir.path().join("queries.json");
    let answers_path = dir.path().join("out/answers.json");

    std::fs::write(
        &queries_path,
        r#"[
            {"id": "Q1", "text": "What does Part A cover?"},
            {"id": "Q2", "text": "boom goes the provider"},
            {"id": "Q3"}
        ]"#,
    )
    .unwrap();

    let summary = process_batch(&pipeline, "docs", &queries_path, &answers_path).await.unwrap();

    assert_eq!(summary.status, "success");
    assert_eq!(summary.query_count, 3);
    assert_eq!(summary.processed_count, 3);

    let written: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(&answers_path).unwrap()).unwrap();
    assert_eq!(written.len(), 3);

    // Q1 succeeded and carries the generated answer.
    assert_eq!(written[0]["query_id"], "Q1");
    assert_eq!(written[0]["answer"], "a grounded answer");

    // Q2 failed and is recorded with an error marker in place.
    assert_eq!(written[1]["id"], "Q2");
    assert_eq!(written[1]["status"], "failed");
    assert!(written[1]["error"].as_str().unwrap().contains("simulated provider failure"));

    // Q3 had no text; it still processes with an empty question.
    assert_eq!(written[2]["query_id"], "Q3");
}

#[tokio::test]
async fn missing_queries_file_is_reported_as_not_found() {
    let pipeline = build_pipeline().await;
    let dir = tempfile::tempdir().unwrap();

    let err = process_batch(
        &pipeline,
        "docs",
        &dir.path().join("nope.json"),
        &dir.path().join("answers.json"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, BatchError::QueriesNotFound(_)));
}

#[tokio::test]
async fn malformed_queries_file_is_an_invalid_format_error() {
    let pipeline = build_pipeline().await;
    let dir = tempfile::tempdir().unwrap();
    let queries_path = dir.path().join("queries.json");
    std::fs::write(&queries_path, "{ not json ]").unwrap();

    let err = process_batch(&pipeline, "docs", &queries_path, &dir.path().join("answers.json"))
        .await
        .unwrap_err();

    assert!(matches!(err, BatchError::InvalidFormat(_)));
}
