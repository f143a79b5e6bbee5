//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`SemanticChunker`], which
//! splits a document at embedding-distance breakpoints: sentences whose
//! surrounding context drifts sharply from the next sentence's context start
//! a new chunk. The stages are exposed as free functions
//! ([`split_into_sentences`], [`combine_sentences`], [`distance_profile`],
//! [`detect_breakpoints`], [`assemble_chunks`]) so each boundary policy can
//! be exercised on its own.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::document::{Chunk, Document};
use crate::embedding::{EmbeddingMode, EmbeddingProvider};
use crate::error::{RagError, Result};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no
/// embeddings. Embeddings are attached later by the pipeline.
#[async_trait]
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Each returned chunk has an empty embedding vector.
    async fn chunk(&self, document: &Document) -> Result<Vec<Chunk>>;
}

/// Splits a document into semantically coherent chunks using
/// embedding-distance breakpoints.
///
/// For each sentence a context window of `2 * buffer_size + 1` neighboring
/// sentences is embedded; the cosine distance between adjacent windows forms
/// a distance profile, and every distance strictly above the configured
/// percentile of that profile marks a chunk boundary. The cut line is taken
/// from the document's own distance distribution, not from a fixed absolute
/// threshold.
///
/// Chunk IDs are generated as `{document_id}_{chunk_index}`. Each chunk
/// inherits the parent document's metadata plus a `chunk_index` field.
///
/// # Example
///
/// ```rust,ignore
/// use ragpipe_core::SemanticChunker;
///
/// let chunker = SemanticChunker::new(embedding_provider)
///     .with_buffer_size(1)
///     .with_breakpoint_percentile(95.0)?;
/// let chunks = chunker.chunk(&document).await?;
/// ```
pub struct SemanticChunker {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    buffer_size: usize,
    breakpoint_percentile: f64,
}

impl SemanticChunker {
    /// Create a new `SemanticChunker` with the default tunables
    /// (`buffer_size = 1`, `breakpoint_percentile = 95.0`).
    pub fn new(embedding_provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedding_provider, buffer_size: 1, breakpoint_percentile: 95.0 }
    }

    /// Set the number of sentences combined on each side of a sentence when
    /// building its context window.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Set the percentile of the distance profile above which a jump counts
    /// as a chunk boundary.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] unless `0 < percentile < 100`.
    pub fn with_breakpoint_percentile(mut self, percentile: f64) -> Result<Self> {
        if !(percentile > 0.0 && percentile < 100.0) {
            return Err(RagError::ConfigError(format!(
                "breakpoint_percentile must be within (0, 100), got {percentile}"
            )));
        }
        self.breakpoint_percentile = percentile;
        Ok(self)
    }
}

#[async_trait]
impl Chunker for SemanticChunker {
    async fn chunk(&self, document: &Document) -> Result<Vec<Chunk>> {
        let sentences = split_into_sentences(&document.text);

        // No internal structure to detect; keep the document as one chunk.
        if sentences.len() < 2 {
            return Ok(make_chunks(document, vec![document.text.clone()]));
        }

        let windows = combine_sentences(&sentences, self.buffer_size);
        let window_refs: Vec<&str> = windows.iter().map(String::as_str).collect();
        let embeddings =
            self.embedding_provider.embed_batch(&window_refs, EmbeddingMode::Document).await?;

        if embeddings.len() != windows.len() {
            return Err(RagError::ChunkingError(format!(
                "provider returned {} embeddings for {} windows",
                embeddings.len(),
                windows.len()
            )));
        }

        let distances = distance_profile(&embeddings);
        let breakpoints = detect_breakpoints(&distances, self.breakpoint_percentile);

        debug!(
            document.id = %document.id,
            sentence_count = sentences.len(),
            breakpoint_count = breakpoints.len(),
            "detected semantic breakpoints"
        );

        Ok(make_chunks(document, assemble_chunks(&sentences, &breakpoints)))
    }
}

/// Wrap chunk texts into [`Chunk`]s carrying ids and metadata.
fn make_chunks(document: &Document, texts: Vec<String>) -> Vec<Chunk> {
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let mut metadata = document.metadata.clone();
            metadata.insert("chunk_index".to_string(), i.to_string());
            Chunk {
                id: format!("{}_{i}", document.id),
                text,
                embedding: Vec::new(),
                metadata,
                document_id: document.id.clone(),
            }
        })
        .collect()
}

static SENTENCE_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[.!?]\s+").expect("unreachable error: failed to parse sentence boundary pattern")
});

/// Split raw text into trimmed, non-empty sentences.
///
/// A sentence ends at `.`, `!`, or `?` followed by whitespace; the
/// punctuation stays with its sentence. An empty document yields an empty
/// sequence. Joining the sentences with single spaces reproduces the
/// document's content up to whitespace normalization.
pub fn split_into_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for boundary in SENTENCE_BOUNDARY.find_iter(text) {
        // The match begins at the terminating punctuation character, which
        // is ASCII, so `+ 1` lands on a char boundary.
        let end = boundary.start() + 1;
        let sentence = text[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        start = boundary.end();
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Combine each sentence with its neighbors into a context window.
///
/// Window *i* spans sentences `[max(0, i - buffer_size),
/// min(n, i + buffer_size + 1))`, joined by spaces: one window per
/// sentence, in sentence order. Windows near the document edges are shorter;
/// that asymmetry is intentional.
pub fn combine_sentences(sentences: &[String], buffer_size: usize) -> Vec<String> {
    (0..sentences.len())
        .map(|i| {
            let start = i.saturating_sub(buffer_size);
            let end = (i + buffer_size + 1).min(sentences.len());
            sentences[start..end].join(" ")
        })
        .collect()
}

/// Compute the cosine distance (`1 - similarity`) between each adjacent
/// pair of embeddings.
///
/// The profile has length `n - 1`; index *i* measures the dissimilarity
/// between window *i* and window *i + 1*. Fewer than two embeddings yield
/// an empty profile.
pub fn distance_profile(embeddings: &[Vec<f32>]) -> Vec<f32> {
    embeddings.windows(2).map(|pair| 1.0 - cosine_similarity(&pair[0], &pair[1])).collect()
}

/// Flag the indices of the distance profile that mark chunk boundaries.
///
/// The threshold is the linearly interpolated value at `percentile` of the
/// distance distribution; only distances strictly greater than it count as
/// breakpoints, so distances clustering exactly at the percentile value
/// never split. An empty profile yields no breakpoints. Returned indices
/// are strictly increasing.
pub fn detect_breakpoints(distances: &[f32], percentile: f64) -> Vec<usize> {
    if distances.is_empty() {
        return Vec::new();
    }
    let threshold = percentile_value(distances, percentile);
    distances
        .iter()
        .enumerate()
        .filter(|(_, d)| f64::from(**d) > threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Linearly interpolated percentile over an unsorted sample.
fn percentile_value(values: &[f32], percentile: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().map(|v| f64::from(*v)).collect();
    sorted.sort_by(f64::total_cmp);

    let rank = percentile / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = rank - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

/// Partition the sentence sequence at the given breakpoints.
///
/// Each breakpoint index *b* closes a chunk spanning `[start, b]`
/// (inclusive); the remainder after the last breakpoint forms the final
/// chunk. Chunk text is the space-joined sentences of its range. The chunks
/// are contiguous, non-overlapping, exhaustive, and in sentence order.
pub fn assemble_chunks(sentences: &[String], breakpoints: &[usize]) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut start = 0;
    for &breakpoint in breakpoints {
        chunks.push(sentences[start..=breakpoint].join(" "));
        start = breakpoint + 1;
    }
    if start < sentences.len() {
        chunks.push(sentences[start..].join(" "));
    }
    chunks
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
