//! Reranker trait for re-scoring retrieval candidates.

use async_trait::async_trait;

use crate::document::SearchResult;
use crate::error::Result;

/// A reranker that re-scores and reorders retrieval candidates against the
/// literal query text.
///
/// Implementations can use cross-encoder models, LLM-based scoring, or
/// other strategies to improve precision beyond initial vector similarity.
/// The reranker's ordering is independent of (and not required to agree
/// with) the similarity order of the input candidates, but every returned
/// result must keep its original chunk identity so source attribution
/// survives reordering.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Rerank candidates given the original query, keeping at most `top_k`.
    ///
    /// Returns results in the reranker's own relevance order, best first.
    /// If `top_k` exceeds the candidate count, all candidates are returned
    /// reordered.
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<SearchResult>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;
}

/// A no-op reranker that keeps the retrieval order and truncates to `top_k`.
///
/// Useful as a default when no cross-encoder is available.
///
/// # Example
///
/// ```rust,ignore
/// use ragpipe_core::NoOpReranker;
///
/// let reranker = NoOpReranker;
/// let reranked = reranker.rerank("query", candidates, 3).await?;
/// // same order as the input, at most 3 results
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReranker;

#[async_trait]
impl Reranker for NoOpReranker {
    async fn rerank(
        &self,
        _query: &str,
        mut candidates: Vec<SearchResult>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        candidates.truncate(top_k);
        Ok(candidates)
    }
}
