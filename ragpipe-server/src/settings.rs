//! Runtime settings loaded from the environment.

use std::path::PathBuf;

use anyhow::Context;

/// Application settings.
///
/// Populated from environment variables (a `.env` file is honored when the
/// binary loads one via `dotenvy`). API keys are required; everything else
/// has a default.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Address the HTTP server binds to (`BIND_ADDR`, default `0.0.0.0:8000`).
    pub bind_addr: String,
    /// Voyage AI API key (`VOYAGE_API_KEY`, required).
    pub voyage_api_key: String,
    /// Anthropic API key (`ANTHROPIC_API_KEY`, required).
    pub anthropic_api_key: String,
    /// Vector store collection name (`COLLECTION_NAME`, default `docs`).
    pub collection_name: String,
    /// Source document ingested by `/api/v1/ingest` (`DOCUMENT_PATH`).
    pub document_path: PathBuf,
    /// Input file for `/api/v1/process-batch` (`QUERIES_PATH`).
    pub queries_path: PathBuf,
    /// Output file for `/api/v1/process-batch` (`ANSWERS_PATH`).
    pub answers_path: PathBuf,
}

impl Settings {
    /// Load settings from the environment.
    ///
    /// # Errors
    ///
    /// Fails with a descriptive error when a required API key is missing.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8000"),
            voyage_api_key: std::env::var("VOYAGE_API_KEY")
                .context("VOYAGE_API_KEY must be set")?,
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .context("ANTHROPIC_API_KEY must be set")?,
            collection_name: env_or("COLLECTION_NAME", "docs"),
            document_path: env_or("DOCUMENT_PATH", "data/input/document.md").into(),
            queries_path: env_or("QUERIES_PATH", "data/input/queries.json").into(),
            answers_path: env_or("ANSWERS_PATH", "data/output/answers.json").into(),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
