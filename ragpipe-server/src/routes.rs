//! HTTP routes: ingest, query, and batch processing.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use ragpipe_core::{Document, QueryResult, RagError, RagPipeline};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::batch::{self, BatchError, BatchSummary};
use crate::settings::Settings;

/// Shared state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// The pipeline; safe for concurrent use by independent requests.
    pub pipeline: Arc<RagPipeline>,
    /// Runtime settings.
    pub settings: Arc<Settings>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/v1/ingest", post(ingest))
        .route("/api/v1/query", post(query))
        .route("/api/v1/process-batch", post(process_batch))
        .with_state(state)
}

/// An HTTP error with a JSON `{"detail": ...}` body.
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn not_found(detail: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, detail: detail.into() }
    }

    fn bad_request(detail: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, detail: detail.into() }
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, detail: detail.into() }
    }
}

impl From<RagError> for ApiError {
    fn from(e: RagError) -> Self {
        error!(error = %e, "pipeline operation failed");
        Self::internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "ragpipe document Q&A API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Request body for `/api/v1/query`.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// The question to answer.
    pub query: String,
    /// Optional query identifier.
    #[serde(default = "default_query_id")]
    pub query_id: String,
    /// Number of candidates to retrieve; pipeline default when omitted.
    pub top_k: Option<usize>,
    /// Number of candidates kept after reranking; pipeline default when omitted.
    pub rerank_top_k: Option<usize>,
}

fn default_query_id() -> String {
    "Q1".to_string()
}

async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResult>, ApiError> {
    let config = state.pipeline.config();
    let top_k = request.top_k.unwrap_or(config.top_k);
    let rerank_top_k = request.rerank_top_k.unwrap_or(config.rerank_top_k);

    let result = state
        .pipeline
        .answer_with(
            &state.settings.collection_name,
            &request.query_id,
            &request.query,
            top_k,
            rerank_top_k,
        )
        .await?;

    Ok(Json(result))
}

/// Response body for `/api/v1/ingest`.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: String,
    pub message: String,
    pub chunk_count: usize,
    pub collection: String,
}

async fn ingest(State(state): State<AppState>) -> Result<Json<IngestResponse>, ApiError> {
    let path = &state.settings.document_path;
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::not_found(format!("document not found at: {}", path.display()))
        } else {
            ApiError::bad_request(format!("failed to read document: {e}"))
        }
    })?;

    let file_name =
        path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let id = path
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "doc".to_string());

    let document = Document {
        id,
        text,
        metadata: HashMap::from([("source".to_string(), file_name)]),
        source_uri: Some(path.display().to_string()),
    };

    let collection = state.settings.collection_name.clone();
    let chunks = state.pipeline.ingest(&collection, &document).await?;

    Ok(Json(IngestResponse {
        status: "success".to_string(),
        message: format!("Successfully ingested '{}' using semantic chunking", document.id),
        chunk_count: chunks.len(),
        collection,
    }))
}

async fn process_batch(State(state): State<AppState>) -> Result<Json<BatchSummary>, ApiError> {
    let summary = batch::process_batch(
        &state.pipeline,
        &state.settings.collection_name,
        &state.settings.queries_path,
        &state.settings.answers_path,
    )
    .await
    .map_err(|e| match e {
        BatchError::QueriesNotFound(_) => ApiError::not_found(e.to_string()),
        BatchError::InvalidFormat(_) => ApiError::bad_request(e.to_string()),
        BatchError::Io(_) | BatchError::Encode(_) => ApiError::internal(e.to_string()),
    })?;

    Ok(Json(summary))
}
