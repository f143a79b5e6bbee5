use std::sync::Arc;

use anyhow::Context;
use ragpipe_core::{
    AnthropicGenerator, EmbeddingProvider, InMemoryVectorStore, RagConfig, RagPipeline,
    SemanticChunker, VoyageEmbeddingProvider, VoyageReranker,
};
use ragpipe_server::{AppState, Settings, router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env()?;

    let embedder: Arc<dyn EmbeddingProvider> =
        Arc::new(VoyageEmbeddingProvider::new(settings.voyage_api_key.clone())?);

    let pipeline = RagPipeline::builder()
        .config(RagConfig::default())
        .embedding_provider(embedder.clone())
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .chunker(Arc::new(SemanticChunker::new(embedder)))
        .reranker(Arc::new(VoyageReranker::new(settings.voyage_api_key.clone())?))
        .generation_client(Arc::new(AnthropicGenerator::new(
            settings.anthropic_api_key.clone(),
        )?))
        .build()?;

    // Queries against a not-yet-ingested collection should see an empty
    // result set, not a missing-collection error.
    pipeline.create_collection(&settings.collection_name).await?;

    let bind_addr = settings.bind_addr.clone();
    let state = AppState { pipeline: Arc::new(pipeline), settings: Arc::new(settings) };

    let app = router(state).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "ragpipe server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
