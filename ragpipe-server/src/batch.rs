//! Batch query processing with per-item failure isolation.
//!
//! Reads a JSON array of `{id, text}` query items, answers each one through
//! the pipeline, and writes the results array to the answers file. One
//! failing item is recorded with an error marker and processing continues:
//! a single failure never aborts the whole batch.

use std::path::{Path, PathBuf};

use ragpipe_core::RagPipeline;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

/// Errors that abort a whole batch run (as opposed to per-item failures,
/// which are recorded in the output and skipped over).
#[derive(Debug, Error)]
pub enum BatchError {
    /// The queries file does not exist.
    #[error("queries file not found at: {}", .0.display())]
    QueriesNotFound(PathBuf),

    /// The queries file is not a JSON array of query items.
    #[error("invalid JSON in queries file: {0}")]
    InvalidFormat(String),

    /// Reading the queries file or writing the answers file failed.
    #[error("batch I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding the answers file failed.
    #[error("failed to encode answers: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One query item from the batch input file.
#[derive(Debug, Deserialize)]
pub struct QueryItem {
    /// Query identifier; `"unknown"` when absent.
    #[serde(default = "unknown_id")]
    pub id: String,
    /// The question text; empty when absent.
    #[serde(default)]
    pub text: String,
}

fn unknown_id() -> String {
    "unknown".to_string()
}

/// Summary of a completed batch run.
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub status: String,
    pub message: String,
    pub query_count: usize,
    pub processed_count: usize,
    pub queries_path: String,
    pub answers_path: String,
}

/// Process a batch of queries from `queries_path`, writing the results
/// array to `answers_path`.
///
/// Successful items serialize as [`QueryResult`](ragpipe_core::QueryResult)
/// objects; failed items serialize as
/// `{id, text, error, status: "failed"}` markers in the same array.
///
/// # Errors
///
/// Returns [`BatchError`] only for whole-batch failures: missing or
/// malformed input file, or an unwritable answers file.
pub async fn process_batch(
    pipeline: &RagPipeline,
    collection: &str,
    queries_path: &Path,
    answers_path: &Path,
) -> Result<BatchSummary, BatchError> {
    let raw = tokio::fs::read_to_string(queries_path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BatchError::QueriesNotFound(queries_path.to_path_buf())
        } else {
            BatchError::Io(e)
        }
    })?;

    let items: Vec<QueryItem> =
        serde_json::from_str(&raw).map_err(|e| BatchError::InvalidFormat(e.to_string()))?;

    let mut results = Vec::with_capacity(items.len());
    for item in &items {
        match pipeline.answer(collection, &item.id, &item.text).await {
            Ok(result) => match serde_json::to_value(&result) {
                Ok(value) => results.push(value),
                Err(e) => {
                    results.push(failure_marker(item, &format!("failed to encode result: {e}")))
                }
            },
            Err(e) => {
                error!(query_id = %item.id, error = %e, "query failed during batch processing");
                results.push(failure_marker(item, &e.to_string()));
            }
        }
    }

    if let Some(parent) = answers_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(answers_path, serde_json::to_string_pretty(&results)?).await?;

    info!(
        query_count = items.len(),
        answers_path = %answers_path.display(),
        "batch processing complete"
    );

    Ok(BatchSummary {
        status: "success".to_string(),
        message: "Successfully processed batch queries".to_string(),
        query_count: items.len(),
        processed_count: results.len(),
        queries_path: queries_path.display().to_string(),
        answers_path: answers_path.display().to_string(),
    })
}

fn failure_marker(item: &QueryItem, error: &str) -> serde_json::Value {
    json!({
        "id": item.id,
        "text": item.text,
        "error": error,
        "status": "failed",
    })
}
